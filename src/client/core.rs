use crate::cache::{CacheKey, CacheStats, CacheStore};
use crate::query::Query;
use crate::telemetry::{EventSink, FetchEvent};
use crate::transport::{FetchRequest, Transport};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cache entries a successful mutation makes obsolete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(CacheKey),
    /// Every key under this path, e.g. `"/users"` after creating a user.
    /// Matching stops at `/`, `?` or the end of the path, so `"/users"`
    /// leaves `/usernames` alone.
    Prefix(String),
}

impl From<CacheKey> for Invalidation {
    fn from(key: CacheKey) -> Self {
        Invalidation::Key(key)
    }
}

/// Cache-through HTTP JSON client.
///
/// Cheap to clone; clones share the same transport, cache and sink.
#[derive(Clone)]
pub struct FetchClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) events: Arc<dyn EventSink>,
}

impl FetchClient {
    pub fn builder() -> crate::client::FetchClientBuilder {
        crate::client::FetchClientBuilder::new()
    }

    /// A fresh controller bound to this client's transport and cache.
    pub fn query(&self) -> Query {
        Query::new(
            self.transport.clone(),
            self.cache.clone(),
            self.events.clone(),
        )
    }

    /// One-shot cache-through fetch.
    ///
    /// Mutating methods are executed without consulting or filling the cache.
    pub async fn fetch(&self, request: impl Into<FetchRequest>) -> Result<Value> {
        self.fetch_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn fetch_with_cancel(
        &self,
        request: impl Into<FetchRequest>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let request = request.into();
        if request.method().is_mutation() {
            return self.transport.execute(&request, cancel).await;
        }

        let key = request.cache_key();
        if let Some(entry) = self.cache.get(&key).await {
            self.emit(FetchEvent::CacheHit { key }).await;
            return Ok(entry.value);
        }
        self.emit(FetchEvent::CacheMiss { key: key.clone() }).await;

        let value = self.transport.execute(&request, cancel).await?;
        self.cache.set(&key, value.clone()).await;
        Ok(value)
    }

    /// [`fetch`](Self::fetch) and deserialize into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(&self, request: impl Into<FetchRequest>) -> Result<T> {
        let value = self.fetch(request).await?;
        serde_json::from_value(value).map_err(Error::from)
    }

    /// Execute a mutation, then drop the listed cache entries.
    ///
    /// Nothing is invalidated when the mutation fails.
    pub async fn mutate(
        &self,
        request: impl Into<FetchRequest>,
        invalidates: &[Invalidation],
    ) -> Result<Value> {
        let request = request.into();
        let value = self
            .transport
            .execute(&request, &CancellationToken::new())
            .await?;
        for target in invalidates {
            match target {
                Invalidation::Key(key) => {
                    self.invalidate(key.clone()).await;
                }
                Invalidation::Prefix(prefix) => {
                    let removed = self.invalidate_prefix(prefix).await;
                    debug!(prefix = %prefix, removed, "invalidated by mutation");
                }
            }
        }
        Ok(value)
    }

    pub async fn invalidate(&self, key: impl Into<CacheKey>) -> bool {
        let key = key.into();
        let removed = self.cache.invalidate(&key).await;
        if removed {
            self.emit(FetchEvent::Invalidated { key }).await;
        }
        removed
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.cache.invalidate_prefix(prefix).await
    }

    pub async fn clear_cache(&self) {
        info!(store = self.cache.name(), "clearing cache");
        self.cache.clear().await;
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn emit(&self, event: FetchEvent) {
        let _ = self.events.report(event).await;
    }
}
