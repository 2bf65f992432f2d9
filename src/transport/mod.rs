//! Request executor: issues one HTTP call and honours a cancellation token.
//!
//! [`Transport`] is the seam between the cache/state layers and the network.
//! [`HttpTransport`] is the reqwest implementation; tests and embedders can
//! inject their own.

mod http;
mod request;

pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{FetchRequest, Method, RequestOptions};

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request` and decode the JSON body.
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) if `cancel` fires
    /// before a result is available. Never touches any cache.
    async fn execute(&self, request: &FetchRequest, cancel: &CancellationToken) -> Result<Value>;

    fn name(&self) -> &'static str {
        "custom"
    }
}
