//! Per-consumer request state: the controller a UI layer subscribes to.
//!
//! A [`Query`] owns one [`RequestState`] and moves it through
//! `Idle → Loading → Success | Error`. Issuing a new request while one is in
//! flight cancels the old one; a response that arrives for a superseded
//! request is dropped without touching the state or the cache.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fetch_cache::{FetchClientBuilder, Status};
//!
//! # async fn run() -> fetch_cache::Result<()> {
//! let client = FetchClientBuilder::new()
//!     .base_url("https://api.example.com")
//!     .build()?;
//!
//! let query = client.query();
//! query.request("/users/1").await;
//! let state = query.wait_settled().await?;
//! if state.status() == Status::Error {
//!     // show the error, offer a retry that calls query.refetch()
//! }
//! # Ok(())
//! # }
//! ```

mod controller;
mod state;

pub use controller::Query;
pub use state::{RequestState, Status};
