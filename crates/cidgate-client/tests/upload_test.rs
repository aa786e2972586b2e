//! Upload against mock primary and secondary write APIs.

mod common;

use cidgate_client::{SecondaryAttempt, WriteError};
use cidgate_core::Progress;
use common::*;
use wiremock::matchers::{any, basic_auth, body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GATEWAY: &str = "http://127.0.0.1:1/ipfs";

#[tokio::test]
async fn primary_upload_returns_identifier() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"hello.txt\""))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Name": "hello.txt",
            "Hash": "QmHello",
            "Size": "11"
        })))
        .expect(1)
        .mount(&api)
        .await;

    let h = harness(test_config(&[GATEWAY.to_string()], &api.uri()));
    let (progress, mut rx) = Progress::channel();
    let cid = h
        .client
        .upload(&b"hello world"[..], "hello.txt", &progress)
        .await
        .unwrap();

    assert_eq!(cid.as_str(), "QmHello");
    let seen = rx.drain();
    assert_eq!(seen.first(), Some(&20));
    assert_eq!(seen.last(), Some(&100));
    // Uploads never populate the cache.
    assert_eq!(h.client.cache().stats().entries, 0);
}

#[tokio::test]
async fn primary_failure_without_credentials_skips_secondary() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(500).set_body_string("node exploded"))
        .expect(1)
        .mount(&api)
        .await;
    let secondary = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    // A secondary URL alone is not enough.
    let mut config = test_config(&[GATEWAY.to_string()], &api.uri());
    config.secondary_api_url = Some(format!("{}/api/v0", secondary.uri()).parse().unwrap());
    let h = harness(config);

    let err = h
        .client
        .upload(&b"data"[..], "d.bin", &Progress::silent())
        .await
        .unwrap_err();
    assert!(matches!(err.primary, WriteError::Status { status: 500, .. }));
    assert!(matches!(err.secondary, SecondaryAttempt::NotConfigured));
    assert!(err.to_string().contains("secondary: not configured"));
}

#[tokio::test]
async fn secondary_is_used_with_basic_auth_after_primary_fails() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&api)
        .await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(basic_auth("proj", "s3cret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"cid": {"/": "QmSecondary"}})),
        )
        .expect(1)
        .mount(&secondary)
        .await;

    let config = with_credentials(
        test_config(&[GATEWAY.to_string()], &api.uri()),
        Some(&secondary.uri()),
    );
    let h = harness(config);
    let (progress, mut rx) = Progress::channel();
    let cid = h.client.upload(&b"payload"[..], "p.bin", &progress).await.unwrap();

    assert_eq!(cid.as_str(), "QmSecondary");
    let seen = rx.drain();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn primary_sends_credentials_when_configured() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(basic_auth("proj", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"hash": "QmAuthed"})))
        .expect(1)
        .mount(&api)
        .await;

    let config = with_credentials(test_config(&[GATEWAY.to_string()], &api.uri()), None);
    let h = harness(config);
    let cid = h
        .client
        .upload(&b"x"[..], "x", &Progress::silent())
        .await
        .unwrap();
    assert_eq!(cid.as_str(), "QmAuthed");
}

#[tokio::test]
async fn response_without_identifier_is_an_upload_error() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Name": "x"})))
        .mount(&api)
        .await;

    let h = harness(test_config(&[GATEWAY.to_string()], &api.uri()));
    let err = h
        .client
        .upload(&b"x"[..], "x", &Progress::silent())
        .await
        .unwrap_err();
    assert!(matches!(err.primary, WriteError::MissingIdentifier { .. }));
}

#[tokio::test]
async fn both_paths_failing_reports_both_errors() {
    let api = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;
    let secondary = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid project id"))
        .expect(1)
        .mount(&secondary)
        .await;

    let config = with_credentials(
        test_config(&[GATEWAY.to_string()], &api.uri()),
        Some(&secondary.uri()),
    );
    let h = harness(config);
    let err = h
        .client
        .upload(&b"x"[..], "x", &Progress::silent())
        .await
        .unwrap_err();

    match err.secondary {
        SecondaryAttempt::Failed(WriteError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid project id"));
        }
        other => panic!("unexpected secondary outcome: {other:?}"),
    }
}
