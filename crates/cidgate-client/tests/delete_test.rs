//! Delete: local removal plus best-effort unpin.

mod common;

use cidgate_client::UnpinStatus;
use cidgate_store::KvStore;
use common::*;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GATEWAY: &str = "http://127.0.0.1:1/ipfs";
const CID: &str = "QmDoomed";

#[tokio::test]
async fn delete_removes_cache_and_unpins() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/rm"))
        .and(query_param("arg", CID))
        .and(basic_auth("proj", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Pins": [CID]})))
        .expect(1)
        .mount(&api)
        .await;

    let config = with_credentials(test_config(&[GATEWAY.to_string()], &api.uri()), None);
    let h = harness(config);
    h.client.cache().insert(&cid(CID), b"bytes").unwrap();
    h.client.cache().put_status(&cid(CID), true).unwrap();

    let outcome = h.client.delete(&cid(CID)).await;
    assert!(outcome.removed_from_cache);
    assert!(matches!(outcome.unpin, UnpinStatus::Unpinned));
    assert!(!h.client.cache().contains(&cid(CID)));
    assert!(h.kv.get(&format!("status:{CID}")).unwrap().is_none());
    assert_eq!(h.client.cache().stats().total_bytes, 0);
}

#[tokio::test]
async fn failed_unpin_still_counts_as_deleted() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/rm"))
        .respond_with(ResponseTemplate::new(500).set_body_string("not pinned or pinned indirectly"))
        .mount(&api)
        .await;

    let config = with_credentials(test_config(&[GATEWAY.to_string()], &api.uri()), None);
    let h = harness(config);
    h.client.cache().insert(&cid(CID), b"bytes").unwrap();

    let outcome = h.client.delete(&cid(CID)).await;
    assert!(outcome.removed_from_cache);
    assert!(matches!(outcome.unpin, UnpinStatus::Failed(_)));
}

#[tokio::test]
async fn delete_without_credentials_only_touches_the_cache() {
    let h = harness(test_config(&[GATEWAY.to_string()], "http://127.0.0.1:1"));

    let outcome = h.client.delete(&cid(CID)).await;
    assert!(!outcome.removed_from_cache);
    assert!(matches!(outcome.unpin, UnpinStatus::NotConfigured));
    assert!(h.client.pins().is_none());
}

#[tokio::test]
async fn pin_calls_go_to_the_secondary_api_when_configured() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/ls"))
        .and(query_param("arg", CID))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Keys": {}})))
        .expect(1)
        .mount(&secondary)
        .await;

    let config = with_credentials(
        test_config(&[GATEWAY.to_string()], &primary.uri()),
        Some(&secondary.uri()),
    );
    let h = harness(config);
    let pinned = h.client.pins().unwrap().is_pinned(&cid(CID)).await.unwrap();
    assert!(!pinned);
}
