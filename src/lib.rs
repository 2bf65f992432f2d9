//! # fetch-cache
//!
//! Cache-through async HTTP JSON client with cancellable, observable request
//! state.
//!
//! ## Overview
//!
//! Three pieces cooperate:
//!
//! - **Request executor** ([`transport`]): issues one HTTP call and honours a
//!   cancellation token.
//! - **Cache store** ([`cache`]): key → `{ value, stored_at }`, consulted
//!   before any network call, with lazy TTL expiry.
//! - **State publisher** ([`query`]): `{ status, data, error }` per consumer,
//!   republished on every transition. A superseded request never overwrites
//!   the state of a newer one.
//!
//! Nothing is retried automatically. Every failure is reported once; the
//! consumer decides whether to call [`Query::refetch`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetch_cache::{FetchClientBuilder, Status};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> fetch_cache::Result<()> {
//!     let client = FetchClientBuilder::new()
//!         .base_url("https://api.example.com")
//!         .cache_ttl(Duration::from_secs(300))
//!         .build()?;
//!
//!     let query = client.query();
//!     query.request("/users/1").await;
//!     let state = query.wait_settled().await?;
//!     match state.status() {
//!         Status::Success => println!("{:?}", state.data()),
//!         Status::Error => eprintln!("{:?}", state.error()),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Injectable cache stores and keys |
//! | [`transport`] | Request description and HTTP executor |
//! | [`query`] | Per-consumer state machine |
//! | [`client`] | Client facade and builder |
//! | [`telemetry`] | Lifecycle events and sinks |
//! | [`error_kind`] | Stable error classification |

pub mod cache;
pub mod client;
pub mod error_kind;
pub mod query;
pub mod telemetry;
pub mod transport;

pub use cache::{CacheEntry, CacheKey, CacheStore, MemoryStore, NullStore};
pub use client::{FetchClient, FetchClientBuilder, Invalidation};
pub use error_kind::ErrorKind;
pub use query::{Query, RequestState, Status};
pub use telemetry::{EventSink, FetchEvent};
pub use transport::{FetchRequest, HttpTransport, Method, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

pub use tokio_util::sync::CancellationToken;
