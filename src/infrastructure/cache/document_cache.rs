//! Result cache keyed by document fingerprint
//!
//! Storage is an exact LRU bounded by entry count, with a TTL checked on every
//! access and by an optional background sweeper. Concurrent misses for one
//! fingerprint share a single computation through a striped in-flight map.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::document::{Fingerprint, ParsedDocument};
use crate::domain::parser::ParseError;
use crate::infrastructure::observability::metrics as telemetry;

type SharedComputation = Shared<BoxFuture<'static, Result<Arc<ParsedDocument>, ParseError>>>;

/// Configuration for the document cache
#[derive(Debug, Clone)]
pub struct DocumentCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Entries older than this are invalid
    pub ttl: Duration,
    /// Number of in-flight lock stripes
    pub stripes: usize,
}

impl Default for DocumentCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            stripes: 16,
        }
    }
}

impl DocumentCacheConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_stripes(mut self, stripes: usize) -> Self {
        self.stripes = stripes;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Arc<ParsedDocument>,
    created_at: Instant,
    last_accessed_at: Instant,
    size_estimate: usize,
}

impl CacheEntry {
    fn new(document: Arc<ParsedDocument>) -> Self {
        let now = Instant::now();
        let size_estimate = document.size_estimate();

        Self {
            document,
            created_at: now,
            last_accessed_at: now,
            size_estimate,
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.created_at) > ttl
    }
}

/// How a `get_or_compute` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// Served from a stored entry
    Hit,
    /// Joined a computation already in flight for the fingerprint
    Coalesced,
    /// This call ran the computation
    Computed,
}

impl CacheOutcome {
    /// Whether the caller avoided its own parser invocation
    pub fn is_hit(&self) -> bool {
        !matches!(self, CacheOutcome::Computed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub entries: usize,
    pub max_entries: usize,
    pub in_flight: usize,
    pub size_estimate_bytes: usize,
}

/// Bounded, coalescing result cache
pub struct DocumentCache {
    store: Mutex<LruCache<Fingerprint, CacheEntry>>,
    in_flight: Vec<Mutex<HashMap<Fingerprint, SharedComputation>>>,
    config: DocumentCacheConfig,
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl DocumentCache {
    pub fn new(config: DocumentCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        let stripes = config.stripes.max(1);

        Self {
            store: Mutex::new(LruCache::new(capacity)),
            in_flight: (0..stripes).map(|_| Mutex::new(HashMap::new())).collect(),
            config,
        }
    }

    pub fn config(&self) -> &DocumentCacheConfig {
        &self.config
    }

    fn stripe(&self, key: &Fingerprint) -> &Mutex<HashMap<Fingerprint, SharedComputation>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.in_flight.len();
        &self.in_flight[index]
    }

    /// Stored result for a fingerprint; never waits on an in-flight computation
    pub fn lookup(&self, key: &Fingerprint) -> Option<Arc<ParsedDocument>> {
        let mut store = self.store.lock();
        let now = Instant::now();

        match store.get_mut(key) {
            None => return None,
            Some(entry) if !entry.is_expired(self.config.ttl, now) => {
                entry.last_accessed_at = now;
                return Some(entry.document.clone());
            }
            Some(_) => {}
        }

        store.pop(key);
        telemetry::record_cache_eviction("expired");
        telemetry::set_cache_entries(store.len());
        debug!(fingerprint = %key.short(), "Cache entry expired");

        None
    }

    fn store(&self, key: Fingerprint, document: Arc<ParsedDocument>) {
        let mut store = self.store.lock();

        if let Some((evicted, entry)) = store.push(key.clone(), CacheEntry::new(document)) {
            if evicted != key {
                telemetry::record_cache_eviction("capacity");
                debug!(
                    fingerprint = %evicted.short(),
                    idle_ms = entry.last_accessed_at.elapsed().as_millis() as u64,
                    "Evicted least recently used cache entry"
                );
            }
        }

        telemetry::set_cache_entries(store.len());
    }

    /// Return the stored result or compute it, sharing one computation per fingerprint
    ///
    /// The computation runs on its own task, so it completes and populates the
    /// cache even if every waiting caller is dropped. Failures are never stored
    /// and are delivered to every waiter of that computation.
    pub async fn get_or_compute<F, Fut>(
        self: &Arc<Self>,
        key: Fingerprint,
        compute: F,
    ) -> Result<(Arc<ParsedDocument>, CacheOutcome), ParseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ParsedDocument, ParseError>> + Send + 'static,
    {
        if let Some(document) = self.lookup(&key) {
            return Ok((document, CacheOutcome::Hit));
        }

        let (computation, outcome) = {
            let mut in_flight = self.stripe(&key).lock();

            // a computation may have finished between the lookup and taking the stripe lock
            if let Some(document) = self.lookup(&key) {
                return Ok((document, CacheOutcome::Hit));
            }

            match in_flight.get(&key) {
                Some(existing) => (existing.clone(), CacheOutcome::Coalesced),
                None => {
                    let computation = self.spawn_computation(key.clone(), compute());
                    in_flight.insert(key.clone(), computation.clone());
                    (computation, CacheOutcome::Computed)
                }
            }
        };

        let document = computation.await?;

        Ok((document, outcome))
    }

    fn spawn_computation<Fut>(self: &Arc<Self>, key: Fingerprint, work: Fut) -> SharedComputation
    where
        Fut: Future<Output = Result<ParsedDocument, ParseError>> + Send + 'static,
    {
        let cache = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let result = work.await.map(Arc::new);

            match &result {
                Ok(document) => cache.store(key.clone(), document.clone()),
                Err(e) => debug!(fingerprint = %key.short(), error = %e, "Computation failed; not cached"),
            }

            // stored before release, so later callers find the entry
            cache.stripe(&key).lock().remove(&key);

            result
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Cache computation task failed");
                Err(ParseError::internal(format!("Computation task failed: {}", e)))
            })
        }
        .boxed()
        .shared()
    }

    /// Remove one entry; returns whether it was present
    pub fn evict(&self, key: &Fingerprint) -> bool {
        let mut store = self.store.lock();
        let removed = store.pop(key).is_some();

        if removed {
            telemetry::record_cache_eviction("explicit");
            telemetry::set_cache_entries(store.len());
        }

        removed
    }

    /// Remove every stored entry; in-flight computations are unaffected
    pub fn clear(&self) -> usize {
        let mut store = self.store.lock();
        let count = store.len();
        store.clear();
        telemetry::set_cache_entries(0);
        count
    }

    /// Drop all expired entries
    pub fn purge_expired(&self) -> usize {
        let mut store = self.store.lock();
        let now = Instant::now();
        let expired: Vec<Fingerprint> = store
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.config.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.pop(key);
            telemetry::record_cache_eviction("expired");
        }

        telemetry::set_cache_entries(store.len());
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let (entries, size_estimate_bytes) = {
            let store = self.store.lock();
            let size = store.iter().map(|(_, entry)| entry.size_estimate).sum();
            (store.len(), size)
        };

        CacheSnapshot {
            entries,
            max_entries: self.config.max_entries,
            in_flight: self.in_flight.iter().map(|stripe| stripe.lock().len()).sum(),
            size_estimate_bytes,
        }
    }

    /// Periodically purge expired entries until the cache is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped; stopping sweeper");
                    break;
                };

                let purged = cache.purge_expired();

                if purged > 0 {
                    debug!(purged, "Swept expired cache entries");
                }
            }
        })
    }
}
