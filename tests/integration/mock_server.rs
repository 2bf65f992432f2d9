//! Mock HTTP server setup for integration tests

use fetch_cache::transport::HttpTransportConfig;
use fetch_cache::{FetchClient, FetchClientBuilder, HttpTransport, Result};
use mockito::{Mock, Server, ServerGuard};
use std::time::Duration;
use tokio::net::TcpListener;

/// Test fixture that owns a mock server.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Client whose relative URLs resolve against the mock server.
    pub fn client(&self) -> FetchClient {
        FetchClientBuilder::new()
            .base_url(&self.base_url)
            .build()
            .expect("client should build")
    }

    pub fn transport(&self) -> HttpTransport {
        transport_for(&self.base_url, Duration::from_secs(30)).expect("transport should build")
    }

    /// Mock a JSON response for `GET path`.
    pub async fn mock_json(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.mock_method("GET", path, status, body).await
    }

    pub async fn mock_method(&mut self, method: &str, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

/// A server that accepts connections and never answers.
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind silent server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

pub fn transport_for(base_url: &str, timeout: Duration) -> Result<HttpTransport> {
    HttpTransport::new(&HttpTransportConfig {
        base_url: Some(base_url.to_string()),
        timeout,
        ..Default::default()
    })
}
