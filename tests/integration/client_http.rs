//! Client facade against real HTTP.

use crate::integration::mock_server::MockServerFixture;
use fetch_cache::{CacheKey, ErrorKind, FetchClientBuilder, FetchRequest, Invalidation};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/users/1")
        .with_status(200)
        .with_body(r#"{"id":1,"name":"Alice"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = fixture.client();
    let first: User = client.fetch_as("/users/1").await.unwrap();
    let second: User = client.fetch_as("/users/1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name, "Alice");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_mutation_invalidates_collection() {
    let mut fixture = MockServerFixture::new().await;
    let list = fixture
        .server
        .mock("GET", "/users")
        .with_status(200)
        .with_body(r#"[{"id":1,"name":"Alice"}]"#)
        .expect(2)
        .create_async()
        .await;
    let create = fixture
        .mock_method("POST", "/users", 201, r#"{"id":2,"name":"Bob"}"#)
        .await;

    let client = fixture.client();
    client.fetch("/users").await.unwrap();
    client.fetch("/users").await.unwrap();
    client
        .mutate(
            FetchRequest::post("/users", json!({"name": "Bob"})),
            &[Invalidation::Prefix("/users".into())],
        )
        .await
        .unwrap();
    assert!(!client.cache().contains(&CacheKey::from("/users")).await);
    client.fetch("/users").await.unwrap();

    list.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_disabled_cache_always_hits_network() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/ping")
        .with_status(200)
        .with_body("true")
        .expect(2)
        .create_async()
        .await;

    let client = FetchClientBuilder::new()
        .base_url(&fixture.base_url)
        .disable_cache()
        .build()
        .unwrap();
    client.fetch("/ping").await.unwrap();
    client.fetch("/ping").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_reports_kind() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("/users/9", 404, r#"{"message":"gone"}"#).await;

    let err = fixture.client().fetch("/users/9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status(), Some(404));
}
