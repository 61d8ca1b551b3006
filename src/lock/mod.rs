//! Lock Module
//!
//! Cooperative write locks with expiring leases. A lock is a lease on a
//! key: claimed when free or expired, held until released or the lease
//! runs out. Acquisition is a polling loop, so contention resolves by
//! retry and expiry, never by queueing; a crashed holder only stalls
//! others until its lease ages out.
//!
//! Leases live beside cache records on the same media but in their own
//! namespace (separate directory, separate key prefix), so locking a key
//! never clobbers its record.

mod fs;
mod memory;
mod redis;

pub use fs::FileLockProvider;
pub use memory::MemoryLockProvider;
pub use redis::RedisLockProvider;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;

use crate::error::Result;

// == Lock Settings ==
/// Construction-time tuning for a lock provider.
#[derive(Debug, Clone, Copy)]
pub struct LockSettings {
    /// How long an acquired lease lasts before others may reclaim it
    pub lease: Duration,
    /// How often [`LockProvider::acquire`] re-attempts while waiting
    pub poll_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
        }
    }
}

// == Lock Provider Trait ==
/// Mutual-exclusion contract over a shared backing store.
///
/// `try_acquire` must be atomic against concurrent acquirers sharing the
/// backing store: check-and-create in two separate steps lets two callers
/// both see "free" and both claim. Each adapter gets atomicity from its
/// medium (one mutex critical section, O_EXCL file creation, SET NX).
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Single non-blocking attempt: claims the lease when it is free or
    /// expired, returns `false` while someone else holds it.
    async fn try_acquire(&self, key: &str) -> Result<bool>;

    /// Releases the lease. Releasing an unheld lock is a no-op.
    async fn release(&self, key: &str) -> Result<()>;

    /// Drops every lease unconditionally.
    async fn clear_locks(&self) -> Result<()>;

    /// How often [`acquire`](Self::acquire) polls.
    fn poll_interval(&self) -> Duration;

    /// Polls [`try_acquire`](Self::try_acquire) until it succeeds or the
    /// `timeout` budget is spent, returning whether the lock was obtained.
    ///
    /// A zero timeout makes exactly one attempt and never sleeps. A budget
    /// too large to land on a representable deadline (`Duration::MAX` and
    /// friends) waits for as long as it takes.
    async fn acquire(&self, key: &str, timeout: Duration) -> Result<bool> {
        // Overflowing budgets get no deadline rather than a panic.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.try_acquire(key).await? {
                return Ok(true);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }
}

// == Lock Configuration ==
/// Selects and parameterizes a lock provider backend.
#[derive(Clone)]
pub enum LockConfig {
    /// In-process lease table
    Memory { settings: LockSettings },
    /// One lease file per key inside `dir`
    Filesystem { dir: PathBuf, settings: LockSettings },
    /// Leases in Redis over a caller-owned connection; `namespace` is
    /// prepended to every lease key
    Redis {
        conn: MultiplexedConnection,
        namespace: Option<String>,
        settings: LockSettings,
    },
}

// == Open Lock ==
/// Opens the configured lock provider.
///
/// Like [`open_store`](crate::store::open_store), validation is eager: the
/// filesystem variant creates its directory here.
pub fn open_lock(config: LockConfig) -> Result<Arc<dyn LockProvider>> {
    match config {
        LockConfig::Memory { settings } => Ok(Arc::new(MemoryLockProvider::new(settings))),
        LockConfig::Filesystem { dir, settings } => {
            Ok(Arc::new(FileLockProvider::new(dir, settings)?))
        }
        LockConfig::Redis {
            conn,
            namespace,
            settings,
        } => Ok(Arc::new(RedisLockProvider::new(conn, namespace, settings))),
    }
}
