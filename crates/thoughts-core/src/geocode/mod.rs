//! Asynchronous place-name enrichment.
//!
//! Lookups go through a single FIFO queue drained by one worker task, so at
//! most one request is in flight. Consecutive external requests are spaced by
//! at least the configured interval, measured from when the previous request
//! finished. Results are cached per ~1 km bucket; failures are never cached.

mod cache;
mod nominatim;

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};

use crate::db::{set_json, KeyValueStore};
use crate::models::{Thought, ThoughtId, ThoughtKey};

pub use cache::{bucket_key, GeocodeCache, GEOCODE_CACHE_KEY};
pub use nominatim::{
    GeocodeError, NominatimClient, ReverseGeocoder, GEOCODER_USER_AGENT, NOMINATIM_BASE_URL,
};

/// Key the pending id set is persisted under.
pub const PENDING_GEOCODES_KEY: &str = "pending_geocodes";

/// Minimum spacing between external lookups (stays under 1 req/s).
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(1100);

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct WorkItem {
    id: ThoughtId,
    lat: f64,
    lon: f64,
    reply: oneshot::Sender<Option<String>>,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<WorkItem>,
    pending: HashSet<ThoughtId>,
    processing: bool,
    last_request: Option<Instant>,
}

struct Inner {
    geocoder: Arc<dyn ReverseGeocoder>,
    cache: GeocodeCache,
    kv: Arc<dyn KeyValueStore>,
    interval: Duration,
    state: Mutex<QueueState>,
}

/// Resolves once the lookup for one enqueued thought completes.
pub struct GeocodeTicket {
    pub key: ThoughtKey,
    reply: oneshot::Receiver<Option<String>>,
}

impl GeocodeTicket {
    /// The resolved place name, or `None` if the lookup found nothing
    pub async fn resolved(self) -> Option<String> {
        self.reply.await.ok().flatten()
    }
}

/// Owned enrichment pipeline; clones share the same queue and cache.
#[derive(Clone)]
pub struct GeocodePipeline {
    inner: Arc<Inner>,
}

impl GeocodePipeline {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_interval(geocoder, kv, DEFAULT_RATE_LIMIT)
    }

    /// Queued work does not survive a restart, so any persisted pending set
    /// left by a previous process is discarded here.
    pub fn with_interval(
        geocoder: Arc<dyn ReverseGeocoder>,
        kv: Arc<dyn KeyValueStore>,
        interval: Duration,
    ) -> Self {
        match kv.get(PENDING_GEOCODES_KEY) {
            Ok(Some(stale)) if stale != "[]" => {
                tracing::warn!("Discarding stale pending geocodes: {}", stale);
            }
            Err(error) => tracing::warn!("Failed to read pending geocodes: {}", error),
            _ => {}
        }
        if let Err(error) = kv.remove(PENDING_GEOCODES_KEY) {
            tracing::warn!("Failed to reset pending geocodes: {}", error);
        }

        Self {
            inner: Arc::new(Inner {
                geocoder,
                cache: GeocodeCache::load(Arc::clone(&kv)),
                kv,
                interval,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue a lookup for the thought's coordinates.
    ///
    /// Returns `None` without queueing when the thought has no usable
    /// coordinates or already carries a name. Must be called from within a
    /// tokio runtime; the worker is spawned on demand.
    pub fn enqueue(&self, thought: &Thought) -> Option<GeocodeTicket> {
        let location = thought.location.as_ref()?;
        if !location.has_coordinates() || location.has_name() {
            return None;
        }

        let (reply, receiver) = oneshot::channel();
        let start_worker = {
            let mut state = self.inner.lock();
            state.pending.insert(thought.id);
            self.inner.persist_pending(&state);
            state.queue.push_back(WorkItem {
                id: thought.id,
                lat: location.lat,
                lon: location.lon,
                reply,
            });
            !std::mem::replace(&mut state.processing, true)
        };

        if start_worker {
            tokio::spawn(Arc::clone(&self.inner).process_queue());
        }

        Some(GeocodeTicket {
            key: thought.key(),
            reply: receiver,
        })
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.lock().pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Wait until nothing is pending or `timeout` elapses, whichever comes
    /// first. Callers cannot tell which one happened.
    pub async fn await_drain(&self, timeout: Duration) {
        let started = Instant::now();
        while self.has_pending() {
            if started.elapsed() > timeout {
                tracing::warn!(
                    "Timed out after {:?} waiting for {} pending geocode(s)",
                    timeout,
                    self.pending_count()
                );
                return;
            }
            sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.inner.cache
    }

    /// Forget cached names and the pending set.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        let mut state = self.inner.lock();
        state.pending.clear();
        if let Err(error) = self.inner.kv.remove(PENDING_GEOCODES_KEY) {
            tracing::warn!("Failed to clear pending geocodes: {}", error);
        }
        tracing::info!("Geocode cache cleared");
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The guard is never held across an await or a panic-prone call
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist_pending(&self, state: &QueueState) {
        let mut ids: Vec<ThoughtId> = state.pending.iter().copied().collect();
        ids.sort_unstable();
        if let Err(error) = set_json(self.kv.as_ref(), PENDING_GEOCODES_KEY, &ids) {
            tracing::warn!("Failed to persist pending geocodes: {}", error);
        }
    }

    async fn process_queue(self: Arc<Self>) {
        loop {
            let (item, wait) = {
                let mut state = self.lock();
                let Some(item) = state.queue.pop_front() else {
                    state.processing = false;
                    return;
                };
                let wait = state.last_request.map_or(Duration::ZERO, |last| {
                    self.interval.saturating_sub(last.elapsed())
                });
                (item, wait)
            };

            if !wait.is_zero() {
                sleep(wait).await;
            }

            let name = self.resolve(item.lat, item.lon).await;

            {
                let mut state = self.lock();
                state.pending.remove(&item.id);
                self.persist_pending(&state);
            }

            // The caller may have stopped waiting; that is fine.
            let _ = item.reply.send(name);
        }
    }

    async fn resolve(&self, lat: f64, lon: f64) -> Option<String> {
        let key = bucket_key(lat, lon);
        if let Some(name) = self.cache.get(&key) {
            tracing::debug!("Geocode cache hit: {} -> {}", key, name);
            return Some(name);
        }

        tracing::debug!("Fetching location name for {}, {}", lat, lon);
        let result = self.geocoder.reverse(lat, lon).await;
        self.lock().last_request = Some(Instant::now());

        match result {
            Ok(Some(name)) => {
                self.cache.insert(&key, &name);
                tracing::debug!("Geocode cached: {} -> {}", key, name);
                Some(name)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!("Reverse geocoding failed for {}: {}", key, error);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;

    /// Instant, scripted geocoder that records when each lookup started.
    #[derive(Default)]
    pub struct FakeGeocoder {
        pub answer: Option<String>,
        pub fail: bool,
        pub delay: Duration,
        pub calls: Mutex<Vec<Instant>>,
    }

    impl FakeGeocoder {
        pub fn answering(name: &str) -> Self {
            Self {
                answer: Some(name.to_string()),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<String>, GeocodeError> {
            self.calls.lock().unwrap().push(Instant::now());
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail {
                return Err(GeocodeError::Api(500));
            }
            Ok(self.answer.clone())
        }
    }
}
