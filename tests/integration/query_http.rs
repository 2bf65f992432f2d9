//! Query controller end to end over HTTP.

use crate::integration::mock_server::{silent_server, MockServerFixture};
use fetch_cache::telemetry::InMemoryEventSink;
use fetch_cache::{CacheKey, FetchClientBuilder, Status};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_success_then_cached() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/users/1")
        .with_status(200)
        .with_body(r#"{"id":1,"name":"A"}"#)
        .expect(1)
        .create_async()
        .await;
    let client = fixture.client();

    let query = client.query();
    query.request("/users/1").await;
    assert_eq!(query.state().status(), Status::Loading);
    let state = query.wait_settled().await.unwrap();
    assert_eq!(state.status(), Status::Success);
    assert_eq!(state.data(), Some(&json!({"id": 1, "name": "A"})));

    // a second consumer sees the cached value without a network call
    let other = client.query();
    other.request("/users/1").await;
    assert!(other.state().is_from_cache());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_publishes_error_once() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/users/1")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let client = fixture.client();

    let query = client.query();
    query.request("/users/1").await;
    let state = query.wait_settled().await.unwrap();

    assert_eq!(state.status(), Status::Error);
    assert_eq!(state.error().and_then(|e| e.status()), Some(500));
    assert!(!client.cache().contains(&CacheKey::from("/users/1")).await);
    // no automatic retry
    tokio::time::sleep(Duration::from_millis(50)).await;
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_error_via_refetch() {
    let mut fixture = MockServerFixture::new().await;
    let failing = fixture.mock_json("/flaky", 503, "").await;
    let client = fixture.client();
    let query = client.query();

    query.request("/flaky").await;
    assert_eq!(query.wait_settled().await.unwrap().status(), Status::Error);
    drop(failing);

    let _ok = fixture.mock_json("/flaky", 200, r#"{"ok":true}"#).await;
    assert!(query.refetch().await);
    let state = query.wait_settled().await.unwrap();
    assert_eq!(state.status(), Status::Success);
    assert_eq!(state.data(), Some(&json!({"ok": true})));
}

#[tokio::test]
async fn test_dropping_query_discards_pending_request() {
    let base = silent_server().await;
    let sink = Arc::new(InMemoryEventSink::default());
    let client = FetchClientBuilder::new()
        .base_url(base)
        .event_sink(sink.clone())
        .build()
        .unwrap();

    let query = client.query();
    query.request("/never").await;
    drop(query);

    // the spawned task observes the cancellation and reports a discard
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.count("discarded") == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("discard should be reported");
    assert!(client.cache().is_empty().await);
}

#[tokio::test]
async fn test_updates_stream_reports_transitions() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("/users/2", 200, r#"{"id":2}"#).await;
    let client = fixture.client();

    let query = client.query();
    let mut updates = Box::pin(query.updates());
    query.request("/users/2").await;

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(state) = updates.next().await {
            if state.is_settled() {
                return Some(state);
            }
        }
        None
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(settled.data(), Some(&json!({"id": 2})));
}
