//! Fetch lifecycle events delivered to an injected sink.
//!
//! The client never collects anything unless a sink is configured; the
//! default is [`NoopEventSink`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`FetchEvent`] | Typed lifecycle event |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default sink, drops everything |
//! | [`InMemoryEventSink`] | Bounded in-memory sink for tests |
//! | [`TracingEventSink`] | Logs events through `tracing` |
//! | [`CompositeEventSink`] | Fans out to several sinks |

use crate::cache::CacheKey;
use crate::error_kind::ErrorKind;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    CacheHit {
        key: CacheKey,
    },
    CacheMiss {
        key: CacheKey,
    },
    RequestStarted {
        key: CacheKey,
        generation: u64,
    },
    Succeeded {
        key: CacheKey,
        generation: u64,
        elapsed: Duration,
    },
    Failed {
        key: CacheKey,
        generation: u64,
        kind: ErrorKind,
        status: Option<u16>,
    },
    /// A result arrived for a request that had been superseded or cancelled.
    Discarded {
        key: CacheKey,
        generation: u64,
    },
    Invalidated {
        key: CacheKey,
    },
}

impl FetchEvent {
    pub fn key(&self) -> &CacheKey {
        match self {
            FetchEvent::CacheHit { key }
            | FetchEvent::CacheMiss { key }
            | FetchEvent::RequestStarted { key, .. }
            | FetchEvent::Succeeded { key, .. }
            | FetchEvent::Failed { key, .. }
            | FetchEvent::Discarded { key, .. }
            | FetchEvent::Invalidated { key } => key,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FetchEvent::CacheHit { .. } => "cache_hit",
            FetchEvent::CacheMiss { .. } => "cache_miss",
            FetchEvent::RequestStarted { .. } => "request_started",
            FetchEvent::Succeeded { .. } => "succeeded",
            FetchEvent::Failed { .. } => "failed",
            FetchEvent::Discarded { .. } => "discarded",
            FetchEvent::Invalidated { .. } => "invalidated",
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn report(&self, event: FetchEvent) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn report(&self, _event: FetchEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// In-memory sink for testing. Oldest events are dropped past `max_events`.
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<FetchEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            max_events: max.max(1),
        }
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn events_for(&self, key: &CacheKey) -> Vec<FetchEvent> {
        self.lock()
            .iter()
            .filter(|e| e.key() == key)
            .cloned()
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<FetchEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn report(&self, event: FetchEvent) -> Result<()> {
        let mut events = self.lock();
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
        Ok(())
    }
}

/// Logs every event at debug level (failures at warn).
#[derive(Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn report(&self, event: FetchEvent) -> Result<()> {
        match &event {
            FetchEvent::Failed {
                key,
                kind,
                status,
                generation,
            } => tracing::warn!(key = %key, kind = kind.name(), status = ?status, generation, "fetch failed"),
            other => tracing::debug!(key = %other.key(), event = other.name(), "fetch event"),
        }
        Ok(())
    }
}

/// Delivers each event to several sinks, e.g. [`TracingEventSink`] for logs
/// next to an [`InMemoryEventSink`] a test asserts on.
///
/// Every sink sees every event even when an earlier one fails; the first
/// failure is returned once all sinks have been called.
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FromIterator<Arc<dyn EventSink>> for CompositeEventSink {
    fn from_iter<I: IntoIterator<Item = Arc<dyn EventSink>>>(iter: I) -> Self {
        Self {
            sinks: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn report(&self, event: FetchEvent) -> Result<()> {
        let mut first_failure = None;
        for sink in &self.sinks {
            if let Err(e) = sink.report(event.clone()).await {
                tracing::debug!(event = event.name(), error = %e, "event sink rejected event");
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    async fn close(&self) -> Result<()> {
        let mut first_failure = None;
        for sink in &self.sinks {
            if let Err(e) = sink.close().await {
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(key: &str) -> FetchEvent {
        FetchEvent::CacheHit {
            key: CacheKey::from(key),
        }
    }

    #[tokio::test]
    async fn test_in_memory_sink_is_bounded() {
        let sink = InMemoryEventSink::new(2);
        sink.report(hit("/a")).await.unwrap();
        sink.report(hit("/b")).await.unwrap();
        sink.report(hit("/c")).await.unwrap();
        let keys: Vec<_> = sink.events().iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["/b", "/c"]);
    }

    #[tokio::test]
    async fn test_events_for_filters_by_key() {
        let sink = InMemoryEventSink::default();
        sink.report(hit("/a")).await.unwrap();
        sink.report(FetchEvent::Invalidated { key: "/a".into() }).await.unwrap();
        sink.report(hit("/b")).await.unwrap();
        assert_eq!(sink.events_for(&CacheKey::from("/a")).len(), 2);
        assert_eq!(sink.count("cache_hit"), 2);
    }

    struct RejectingSink;

    #[async_trait]
    impl EventSink for RejectingSink {
        async fn report(&self, _event: FetchEvent) -> Result<()> {
            Err(crate::Error::network("collector unreachable"))
        }
    }

    #[tokio::test]
    async fn test_composite_fans_out() {
        let a = Arc::new(InMemoryEventSink::default());
        let b = Arc::new(InMemoryEventSink::default());
        let composite = CompositeEventSink::new().with(a.clone()).with(b.clone());
        composite.report(hit("/x")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[tokio::test]
    async fn test_composite_delivers_past_a_failing_sink() {
        let after = Arc::new(InMemoryEventSink::default());
        let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(RejectingSink), after.clone()];
        let composite: CompositeEventSink = sinks.into_iter().collect();

        let err = composite.report(hit("/x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(after.len(), 1);
        assert_eq!(composite.len(), 2);
    }
}
