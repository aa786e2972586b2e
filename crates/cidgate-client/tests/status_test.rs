//! Availability checks and their cached answers.

mod common;

use std::time::Duration;

use common::*;
use wiremock::matchers::{any, basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CID: &str = "QmMaybeThere";

fn cid_path() -> String {
    format!("/ipfs/{CID}")
}

#[tokio::test]
async fn positive_answer_is_cached_within_the_freshness_window() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(probe_path()))
        .respond_with(ResponseTemplate::new(206))
        .expect(1)
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(206))
        .expect(1)
        .mount(&a)
        .await;

    let h = harness(test_config(&gateway_urls(&[&a]), "http://127.0.0.1:1"));
    assert!(h.client.exists(&cid(CID), false).await);
    h.clock.advance(Duration::from_secs(30 * 60));
    assert!(h.client.exists(&cid(CID), false).await);

    let entry = h.client.cache().status(&cid(CID)).unwrap().unwrap();
    assert!(entry.available);
    assert_eq!(entry.checked_at.as_millis(), START_MS);
}

#[tokio::test]
async fn negative_answer_is_cached_after_a_full_sweep() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(404))
        // Preferred check plus the sweep.
        .expect(2)
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&b)
        .await;

    let h = harness(test_config(&gateway_urls(&[&a, &b]), "http://127.0.0.1:1"));
    assert!(!h.client.exists(&cid(CID), false).await);
    assert!(!h.client.exists(&cid(CID), false).await);
    assert!(!h.client.cache().status(&cid(CID)).unwrap().unwrap().available);
}

#[tokio::test]
async fn stale_answer_is_rechecked() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&a)
        .await;

    let h = harness(test_config(&gateway_urls(&[&a]), "http://127.0.0.1:1"));
    assert!(h.client.exists(&cid(CID), false).await);
    h.clock.advance(Duration::from_secs(61 * 60));
    assert!(h.client.exists(&cid(CID), false).await);
}

#[tokio::test]
async fn cached_blob_implies_available_without_network() {
    let a = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&a)
        .await;

    let h = harness(test_config(&gateway_urls(&[&a]), "http://127.0.0.1:1"));
    h.client.cache().insert(&cid(CID), b"here").unwrap();

    assert!(h.client.exists(&cid(CID), false).await);
    assert!(h.client.cache().status(&cid(CID)).unwrap().unwrap().available);
}

#[tokio::test]
async fn skip_cache_goes_to_the_network_and_still_records() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&a)
        .await;

    let h = harness(test_config(&gateway_urls(&[&a]), "http://127.0.0.1:1"));
    h.client.cache().put_status(&cid(CID), true).unwrap();

    assert!(!h.client.exists(&cid(CID), true).await);
    assert!(!h.client.cache().status(&cid(CID)).unwrap().unwrap().available);
}

#[tokio::test]
async fn pin_listing_answers_when_gateways_do_not() {
    let gw = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404))
        .mount(&gw)
        .await;
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/ls"))
        .and(query_param("arg", CID))
        .and(basic_auth("proj", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Keys": { CID: { "Type": "recursive" } }
        })))
        .expect(1)
        .mount(&api)
        .await;

    let config = with_credentials(test_config(&gateway_urls(&[&gw]), &api.uri()), None);
    let h = harness(config);
    assert!(h.client.exists(&cid(CID), false).await);
}

#[tokio::test]
async fn not_pinned_error_falls_through_to_the_sweep() {
    let gw = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&gw)
        .await;
    Mock::given(method("GET"))
        .and(path(cid_path()))
        .respond_with(ResponseTemplate::new(206))
        .mount(&gw)
        .await;
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/ls"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "Message": format!("path '{CID}' is not pinned"),
            "Code": 0,
            "Type": "error"
        })))
        .expect(1)
        .mount(&api)
        .await;

    let config = with_credentials(test_config(&gateway_urls(&[&gw]), &api.uri()), None);
    let h = harness(config);
    assert!(h.client.exists(&cid(CID), false).await);
}
