//! Request executor against real HTTP.

use crate::integration::mock_server::{silent_server, transport_for, MockServerFixture};
use fetch_cache::{CancellationToken, ErrorKind, FetchRequest, Transport};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_success_decodes_json() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json("/users/1", 200, r#"{"id":1,"name":"A"}"#)
        .await;

    let value = fixture
        .transport()
        .execute(&FetchRequest::get("/users/1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(value, json!({"id": 1, "name": "A"}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_statuses_map_to_http_error() {
    let mut fixture = MockServerFixture::new().await;
    let cases = [
        (404u16, "/missing", r#"{"message":"no such user"}"#, "no such user"),
        (500, "/boom", "", "Internal Server Error"),
        (503, "/busy", "<html>down</html>", "Service Unavailable"),
    ];
    let mut mocks = Vec::new();
    for (status, path, body, _) in cases {
        mocks.push(fixture.mock_json(path, status as usize, body).await);
    }

    let transport = fixture.transport();
    for (status, path, _, message) in cases {
        let err = transport
            .execute(&FetchRequest::get(path), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(status));
        assert!(err.to_string().contains(message), "{}", err);
    }
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("/garbled", 200, "{\"id\": 1,").await;

    let err = fixture
        .transport()
        .execute(&FetchRequest::get("/garbled"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_method("DELETE", "/users/1", 204, "").await;

    let value = fixture
        .transport()
        .execute(&FetchRequest::delete("/users/1"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_options_are_sent() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/search")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .match_header("authorization", "Bearer t")
        .match_header("x-request-id", Matcher::Any)
        .match_body(Matcher::Json(json!({"q": "rust"})))
        .with_status(201)
        .with_body(r#"{"hits":[]}"#)
        .create_async()
        .await;

    let req = FetchRequest::post("/search", json!({"q": "rust"}))
        .query("page", "2")
        .header("Authorization", "Bearer t");
    let value = fixture
        .transport()
        .execute(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(value, json!({"hits": []}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let transport = transport_for("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
    let err = transport
        .execute(&FetchRequest::get("/users/1"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let base = silent_server().await;
    let transport = transport_for(&base, Duration::from_millis(200)).unwrap();
    let err = transport
        .execute(&FetchRequest::get("/slow"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_cancellation_abandons_pending_request() {
    let base = silent_server().await;
    let transport = transport_for(&base, Duration::from_secs(30)).unwrap();
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        transport.execute(&FetchRequest::get("/slow"), &token),
    )
    .await
    .expect("cancellation should end the request promptly")
    .unwrap_err();

    canceller.await.unwrap();
    assert!(err.is_cancelled());
    assert!(!err.is_user_visible());
}
