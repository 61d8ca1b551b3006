//! Cache Engine Module
//!
//! The backend-agnostic cache: TTL expiry on read, dependency cascades on
//! delete, optional lock-protected writes, and hit/miss accounting, all
//! over whichever [`RecordStore`] is plugged in.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::stats::StatsCounters;
use crate::cache::{CacheEntry, CacheOptions, CacheStats};
use crate::error::Result;
use crate::lock::LockProvider;
use crate::store::RecordStore;

// == Cache ==
/// Backend-agnostic cache engine.
///
/// Reads miss on absent or expired records and never propagate backend
/// failures; writes carry TTL, dependency, and priority metadata and may
/// be serialized through a lock provider; deletes walk the dependency
/// graph. Cloning is cheap and clones share the store, the lock provider,
/// and the statistics counters.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn RecordStore>,
    lock: Option<Arc<dyn LockProvider>>,
    counters: Arc<StatsCounters>,
}

impl Cache {
    // == Constructor ==
    /// Creates an engine over the given store, with no lock provider.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            lock: None,
            counters: Arc::new(StatsCounters::default()),
        }
    }

    /// Attaches a lock provider, enabling lock-protected writes.
    ///
    /// Until one is attached, `set` ignores `lock_timeout` entirely.
    pub fn set_lock_provider(&mut self, lock: Arc<dyn LockProvider>) {
        self.lock = Some(lock);
    }

    /// Chaining variant of [`set_lock_provider`](Self::set_lock_provider).
    pub fn with_lock_provider(mut self, lock: Arc<dyn LockProvider>) -> Self {
        self.lock = Some(lock);
        self
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Absent records, expired records, and backend read failures all come
    /// back as `None` and count as misses; read failures are logged, never
    /// propagated. A live record counts as a hit and is returned as-is.
    /// The record is not touched: expiry is lazy and there is no sliding
    /// TTL.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entry = match self.store.read(key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!("cache read failed for key '{}': {}; treating as miss", key, err);
                self.counters.record_miss();
                return None;
            }
        };

        match entry {
            Some(entry) if !entry.is_expired() => {
                self.counters.record_hit();
                Some(entry.value)
            }
            _ => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Get As ==
    /// Like [`get`](Self::get), deserializing the payload into `T`.
    ///
    /// A live record whose payload does not fit `T` still counts as the
    /// hit it was; only the conversion yields `None`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!("cached payload for key '{}' did not deserialize: {}", key, err);
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` with the given options.
    ///
    /// With `options.lock_timeout` set and a lock provider attached, the
    /// write first acquires the key's lock. A lock that cannot be obtained
    /// within the budget skips the write without error: under contention,
    /// not writing is the safe outcome, and lock-backend failures are
    /// treated the same way. The acquired lease is not released here; it
    /// ages out on its own, which is what spaces out competing writers.
    ///
    /// Storage failures on the write itself are returned.
    pub async fn set(
        &self,
        key: &str,
        value: &impl Serialize,
        options: CacheOptions,
    ) -> Result<()> {
        let payload = serde_json::to_value(value)?;
        let mut entry = CacheEntry::new(payload, &options);

        if let (Some(timeout), Some(lock)) = (options.lock_timeout, self.lock.as_ref()) {
            match lock.acquire(key, timeout).await {
                Ok(true) => entry.locked = true,
                Ok(false) => {
                    debug!("write lock on '{}' not acquired within {:?}; skipping set", key, timeout);
                    return Ok(());
                }
                Err(err) => {
                    debug!("lock backend failed for '{}': {}; skipping set", key, err);
                    return Ok(());
                }
            }
        }

        self.store.write(key, &entry).await
    }

    // == Delete ==
    /// Removes `key` and, transitively, every record that depends on it.
    ///
    /// The dependent closure is collected breadth-first over the reverse
    /// dependency relation with a visited set, so cycles terminate.
    /// Dependents are deleted before the root. Missing keys are not an
    /// error. A backend failure mid-cascade is returned and leaves the
    /// remainder in place; dependents can be re-derived, so re-running the
    /// delete finishes the job.
    pub async fn del(&self, key: &str) -> Result<()> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut dependents = Vec::new();

        visited.insert(key.to_string());
        queue.push_back(key.to_string());

        while let Some(current) = queue.pop_front() {
            for dependent in self.store.dependents_of(&current).await? {
                if visited.insert(dependent.clone()) {
                    dependents.push(dependent.clone());
                    queue.push_back(dependent);
                }
            }
        }

        if !dependents.is_empty() {
            debug!("delete of '{}' cascades to {} dependent(s)", key, dependents.len());
        }

        for dependent in &dependents {
            self.store.delete(dependent).await?;
        }
        self.store.delete(key).await
    }

    // == Clear ==
    /// Removes every record.
    ///
    /// Statistics are monotonic and survive a clear.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete_all().await
    }

    // == Stats ==
    /// Point-in-time hit/miss snapshot for this engine instance.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    // == Dependent Keys ==
    /// Keys whose records directly list `key` as a dependency.
    pub async fn dependent_keys(&self, key: &str) -> Result<Vec<String>> {
        self.store.dependents_of(key).await
    }
}
