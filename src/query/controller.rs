use super::state::RequestState;
use crate::cache::{CacheKey, CacheStore};
use crate::telemetry::{EventSink, FetchEvent};
use crate::transport::{FetchRequest, Transport};
use crate::{Error, Result};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The request currently owned by a [`Query`].
struct Inflight {
    /// Bumped on every `request`; a response only publishes if its
    /// generation is still current.
    generation: u64,
    token: Option<CancellationToken>,
    request: Option<FetchRequest>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    events: Arc<dyn EventSink>,
    state: watch::Sender<RequestState>,
    inflight: Mutex<Inflight>,
}

impl Shared {
    async fn emit(&self, event: FetchEvent) {
        let _ = self.events.report(event).await;
    }
}

/// Cache-through request controller for a single consumer.
///
/// Dropping the `Query` cancels whatever it has in flight.
pub struct Query {
    shared: Arc<Shared>,
    teardown: CancellationToken,
}

impl Query {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let (state, _) = watch::channel(RequestState::idle());
        Self {
            shared: Arc::new(Shared {
                transport,
                cache,
                events,
                state,
                inflight: Mutex::new(Inflight {
                    generation: 0,
                    token: None,
                    request: None,
                }),
            }),
            teardown: CancellationToken::new(),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.shared.state.subscribe()
    }

    /// States published after this call.
    ///
    /// Backed by a watch channel: a slow reader may miss intermediate states
    /// but always sees the latest one.
    pub fn updates(&self) -> impl Stream<Item = RequestState> + Send + 'static {
        futures::stream::unfold(self.subscribe(), |mut rx| async move {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().clone();
            Some((state, rx))
        })
    }

    /// Key of the most recent request, if any.
    pub async fn key(&self) -> Option<CacheKey> {
        self.shared
            .inflight
            .lock()
            .await
            .request
            .as_ref()
            .map(FetchRequest::cache_key)
    }

    /// Start a request, superseding any request still in flight.
    ///
    /// A cache hit publishes `Success` immediately. A miss publishes `Loading`
    /// and runs the fetch on a spawned task; this call returns without
    /// waiting for it. Mutations (POST, PUT, PATCH, DELETE) never read or
    /// write the cache.
    pub async fn request(&self, request: impl Into<FetchRequest>) {
        let request = request.into();
        let read_cache = !request.method().is_mutation();
        self.start(request, read_cache).await;
    }

    async fn start(&self, request: FetchRequest, read_cache: bool) {
        let key = request.cache_key();

        let (generation, token) = {
            let mut inflight = self.shared.inflight.lock().await;
            if let Some(previous) = inflight.token.take() {
                previous.cancel();
            }
            inflight.generation += 1;
            let token = self.teardown.child_token();
            inflight.token = Some(token.clone());
            inflight.request = Some(request.clone());
            (inflight.generation, token)
        };

        let cached = if read_cache {
            self.shared.cache.get(&key).await
        } else {
            None
        };
        if let Some(entry) = cached {
            {
                let inflight = self.shared.inflight.lock().await;
                if inflight.generation == generation {
                    self.shared
                        .state
                        .send_replace(RequestState::success(key.clone(), entry.value, true));
                }
            }
            debug!(key = %key, generation, "served from cache");
            self.shared.emit(FetchEvent::CacheHit { key }).await;
            return;
        }
        if read_cache {
            self.shared
                .emit(FetchEvent::CacheMiss { key: key.clone() })
                .await;
        }

        {
            let inflight = self.shared.inflight.lock().await;
            // superseded while the cache was consulted
            if inflight.generation != generation {
                return;
            }
            self.shared
                .state
                .send_replace(RequestState::loading(key.clone()));
        }
        debug!(key = %key, generation, "request started");
        self.shared
            .emit(FetchEvent::RequestStarted {
                key: key.clone(),
                generation,
            })
            .await;

        let shared = self.shared.clone();
        tokio::spawn(run_request(shared, generation, token, request, key));
    }

    /// Send the last request again without reading the cache.
    ///
    /// The cached entry stays in place until the new response succeeds, so a
    /// failed retry keeps the last good value. Returns `false` when nothing
    /// has been requested yet.
    pub async fn refetch(&self) -> bool {
        let request = self.shared.inflight.lock().await.request.clone();
        let Some(request) = request else {
            return false;
        };
        self.start(request, false).await;
        true
    }

    /// Drop the current key from the cache without refetching.
    pub async fn invalidate(&self) -> bool {
        let Some(key) = self.key().await else {
            return false;
        };
        let removed = self.shared.cache.invalidate(&key).await;
        if removed {
            self.shared.emit(FetchEvent::Invalidated { key }).await;
        }
        removed
    }

    /// Abandon the in-flight request. The published state is left as is.
    pub async fn cancel(&self) {
        if let Some(token) = self.shared.inflight.lock().await.token.take() {
            token.cancel();
        }
    }

    /// Wait until the current request settles.
    ///
    /// Resolves with the current state when nothing is in flight, and with
    /// [`Error::Cancelled`] if the request is cancelled or superseded first.
    pub async fn wait_settled(&self) -> Result<RequestState> {
        let token = self.shared.inflight.lock().await.token.clone();
        let Some(token) = token else {
            return Ok(self.state());
        };
        let mut rx = self.subscribe();
        let settled = async {
            rx.wait_for(RequestState::is_settled)
                .await
                .map(|s| (*s).clone())
                .map_err(|_| Error::Cancelled)
        };
        tokio::select! {
            biased;
            state = settled => state,
            _ = token.cancelled() => Err(Error::Cancelled),
        }
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

async fn run_request(
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
    request: FetchRequest,
    key: CacheKey,
) {
    let started = Instant::now();
    let result = shared.transport.execute(&request, &token).await;

    let event = {
        // Held across the cache write so a newer request cannot interleave
        // between the staleness check and the publish.
        let inflight = shared.inflight.lock().await;
        if inflight.generation != generation || token.is_cancelled() {
            debug!(key = %key, generation, "discarding superseded response");
            FetchEvent::Discarded { key, generation }
        } else {
            match result {
                Ok(value) => {
                    if !request.method().is_mutation() {
                        shared.cache.set(&key, value.clone()).await;
                    }
                    shared
                        .state
                        .send_replace(RequestState::success(key.clone(), value, false));
                    FetchEvent::Succeeded {
                        key,
                        generation,
                        elapsed: started.elapsed(),
                    }
                }
                Err(Error::Cancelled) => FetchEvent::Discarded { key, generation },
                Err(error) => {
                    debug!(key = %key, generation, error = %error, "request failed");
                    let (kind, status) = (error.kind(), error.status());
                    shared
                        .state
                        .send_replace(RequestState::failed(key.clone(), error));
                    FetchEvent::Failed {
                        key,
                        generation,
                        kind,
                        status,
                    }
                }
            }
        }
    };
    shared.emit(event).await;
}
