//! Service-wide counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Running counters for one pipeline instance
///
/// Counters are monotonic between resets and safe under concurrent updates.
#[derive(Debug)]
pub struct ServiceStats {
    documents_processed: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    processing_micros: AtomicU64,
    started: Mutex<(DateTime<Utc>, Instant)>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub documents_processed: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_processing_time_seconds: f64,
    pub average_processing_time_seconds: f64,
    pub cache_hit_rate: f64,
    pub start_time: DateTime<Utc>,
    pub uptime_seconds: u64,
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            documents_processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            processing_micros: AtomicU64::new(0),
            started: Mutex::new((Utc::now(), Instant::now())),
        }
    }

    pub fn record_processed(&self, elapsed: Duration) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.processing_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let documents_processed = self.documents_processed.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let total = self.processing_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let (start_time, started_at) = *self.started.lock();

        let lookups = cache_hits + cache_misses;

        StatsSnapshot {
            documents_processed,
            errors,
            cache_hits,
            cache_misses,
            total_processing_time_seconds: total,
            average_processing_time_seconds: if documents_processed > 0 {
                total / documents_processed as f64
            } else {
                0.0
            },
            cache_hit_rate: if lookups > 0 {
                cache_hits as f64 / lookups as f64
            } else {
                0.0
            },
            start_time,
            uptime_seconds: started_at.elapsed().as_secs(),
        }
    }

    /// Zero every counter and restart the uptime clock
    pub fn reset(&self) {
        self.documents_processed.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.processing_micros.store(0, Ordering::Relaxed);
        *self.started.lock() = (Utc::now(), Instant::now());
    }
}
