use crate::cache::{CacheStore, MemoryStore, NullStore};
use crate::client::core::FetchClient;
use crate::telemetry::EventSink;
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Builder for [`FetchClient`].
///
/// Nothing is read from the environment unless [`from_env`](Self::from_env)
/// is called.
pub struct FetchClientBuilder {
    http: HttpTransportConfig,
    cache_ttl: Option<Duration>,
    max_entries: usize,
    cache_enabled: bool,
    cache: Option<Arc<dyn CacheStore>>,
    transport: Option<Arc<dyn Transport>>,
    events: Arc<dyn EventSink>,
}

impl FetchClientBuilder {
    pub fn new() -> Self {
        Self {
            http: HttpTransportConfig::default(),
            cache_ttl: None,
            max_entries: 0,
            cache_enabled: true,
            cache: None,
            transport: None,
            events: crate::telemetry::noop_sink(),
        }
    }

    /// Prefix for relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = Some(base_url.into());
        self
    }

    /// Whole-request timeout. Expiry surfaces as a network error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.http.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.http.pool_max_idle_per_host = n;
        self
    }

    /// Entries older than `ttl` read as absent. Default: never expire.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Bound the default memory store (LRU eviction). Zero means unbounded.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Use [`NullStore`] instead of the default memory store.
    pub fn disable_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Inject a store, e.g. one shared between several clients.
    /// TTL and capacity settings then belong to that store.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Inject a transport. HTTP settings on this builder are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Inject an event sink. Default is a no-op sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Apply overrides from the process environment:
    /// - `FETCH_BASE_URL`
    /// - `FETCH_HTTP_TIMEOUT_SECS` (default 30)
    /// - `FETCH_POOL_MAX_IDLE_PER_HOST` (default 32)
    /// - `FETCH_PROXY_URL`
    /// - `FETCH_CACHE_TTL_SECS` (unset: never expire)
    /// - `FETCH_CACHE_MAX_ENTRIES` (unset or 0: unbounded)
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env(self) -> Self {
        self.apply_env(|name| std::env::var(name).ok())
    }

    pub(crate) fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            name: &str,
        ) -> Option<T> {
            let raw = lookup(name)?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(var = name, value = %raw, "ignoring unparsable environment override");
                    None
                }
            }
        }

        if let Some(url) = lookup("FETCH_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.http.base_url = Some(url);
        }
        if let Some(url) = lookup("FETCH_PROXY_URL").filter(|s| !s.trim().is_empty()) {
            self.http.proxy_url = Some(url);
        }
        if let Some(secs) = parsed::<u64>(&lookup, "FETCH_HTTP_TIMEOUT_SECS") {
            self.http.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = parsed::<usize>(&lookup, "FETCH_POOL_MAX_IDLE_PER_HOST") {
            self.http.pool_max_idle_per_host = n;
        }
        if let Some(secs) = parsed::<u64>(&lookup, "FETCH_CACHE_TTL_SECS") {
            self.cache_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(n) = parsed::<usize>(&lookup, "FETCH_CACHE_MAX_ENTRIES") {
            self.max_entries = n;
        }
        self
    }

    pub fn build(self) -> Result<FetchClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.http)?),
        };

        let cache: Arc<dyn CacheStore> = match (self.cache, self.cache_enabled) {
            (Some(store), _) => store,
            (None, false) => Arc::new(NullStore::new()),
            (None, true) => {
                let mut store = MemoryStore::new().with_capacity(self.max_entries);
                if let Some(ttl) = self.cache_ttl {
                    store = store.with_ttl(ttl);
                }
                Arc::new(store)
            }
        };

        Ok(FetchClient {
            transport,
            cache,
            events: self.events,
        })
    }
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
