//! Response cache: the store consulted before any network call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | Trait for injectable stores |
//! | [`MemoryStore`] | In-memory store with lazy TTL expiry and optional LRU bound |
//! | [`NullStore`] | Store that keeps nothing (caching disabled) |
//! | [`CacheKey`] | URL plus canonical request options |
//! | [`CacheEntry`] | Stored JSON value and its write time |
//! | [`CacheStats`] | Hit/miss/set/invalidate counters |
//!
//! ## Example
//!
//! ```rust
//! use fetch_cache::cache::{CacheKey, CacheStore, MemoryStore};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new().with_ttl(Duration::from_secs(300));
//! let key = CacheKey::from("/users/1");
//! store.set(&key, serde_json::json!({"id": 1})).await;
//! assert!(store.get(&key).await.is_some());
//! # }
//! ```

mod backend;
mod key;
mod stats;

pub use backend::{CacheEntry, CacheStore, MemoryStore, NullStore};
pub use key::CacheKey;
pub use stats::CacheStats;
