//! Cache Statistics Module
//!
//! Tracks hit/miss counters for one engine instance. Counters are atomic
//! because the engine is called through `&self` from concurrent tasks;
//! clones of an engine share one set of counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Interior-mutable hit/miss counters.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsCounters {
    // == Record Hit ==
    /// Increments the hit counter.
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Takes a point-in-time snapshot of the counters.
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

// == Cache Stats ==
/// A point-in-time view of cache performance.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of reads that returned a live value
    pub hits: u64,
    /// Number of reads that found nothing (absent, expired, or failed)
    pub misses: u64,
    /// hits / (hits + misses), or 0.0 if no reads have been made
    pub hit_rate: f64,
}

impl CacheStats {
    fn new(hits: u64, misses: u64) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            hits,
            misses,
            hit_rate,
        }
    }
}
