//! In-Memory Lock Provider
//!
//! Lease table in a mutex-guarded map. The mutex critical section is what
//! makes check-and-create atomic: no other acquirer runs between seeing an
//! expired lease and replacing it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::lock::{LockProvider, LockSettings};

// == Memory Lock Provider ==
/// In-process lock provider; a lease is an expiry timestamp in a map.
#[derive(Debug, Default)]
pub struct MemoryLockProvider {
    leases: Mutex<HashMap<String, u64>>,
    settings: LockSettings,
}

impl MemoryLockProvider {
    // == Constructor ==
    /// Creates a provider with the given lease and polling settings.
    pub fn new(settings: LockSettings) -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
            settings,
        }
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let now = current_timestamp_ms();
        let mut leases = self.leases.lock().await;
        match leases.get(key) {
            Some(&expires_at) if now < expires_at => Ok(false),
            _ => {
                // Free, or an abandoned lease past its expiry.
                let lease_ms = self.settings.lease.as_millis() as u64;
                leases.insert(key.to_string(), now.saturating_add(lease_ms));
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.leases.lock().await.remove(key);
        Ok(())
    }

    async fn clear_locks(&self) -> Result<()> {
        self.leases.lock().await.clear();
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn provider(lease_ms: u64, poll_ms: u64) -> MemoryLockProvider {
        MemoryLockProvider::new(LockSettings {
            lease: Duration::from_millis(lease_ms),
            poll_interval: Duration::from_millis(poll_ms),
        })
    }

    #[tokio::test]
    async fn test_try_acquire_free_lock() {
        let lock = MemoryLockProvider::default();
        assert!(lock.try_acquire("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_try_acquire_held_lock_fails() {
        let lock = MemoryLockProvider::default();
        assert!(lock.try_acquire("job:1").await.unwrap());
        assert!(!lock.try_acquire("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_frees_lock() {
        let lock = MemoryLockProvider::default();
        assert!(lock.try_acquire("job:1").await.unwrap());

        lock.release("job:1").await.unwrap();
        assert!(lock.try_acquire("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_unheld_is_noop() {
        let lock = MemoryLockProvider::default();
        lock.release("never-held").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimable() {
        let lock = provider(50, 10);
        assert!(lock.try_acquire("job:1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;

        // The holder never released, but the lease aged out.
        assert!(lock.try_acquire("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_locks_are_per_key() {
        let lock = MemoryLockProvider::default();
        assert!(lock.try_acquire("a").await.unwrap());
        assert!(lock.try_acquire("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_locks_frees_everything() {
        let lock = MemoryLockProvider::default();
        assert!(lock.try_acquire("a").await.unwrap());
        assert!(lock.try_acquire("b").await.unwrap());

        lock.clear_locks().await.unwrap();

        assert!(lock.try_acquire("a").await.unwrap());
        assert!(lock.try_acquire("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_acquire_waits_out_contention() {
        let lock = provider(60, 5);
        assert!(lock.try_acquire("job:1").await.unwrap());

        // The lease expires after 60ms, well inside the 500ms budget.
        let acquired = lock.acquire("job:1", Duration::from_millis(500)).await.unwrap();
        assert!(acquired);
    }

    #[tokio::test]
    async fn test_acquire_times_out_under_contention() {
        let lock = provider(10_000, 5);
        assert!(lock.try_acquire("job:1").await.unwrap());

        let acquired = lock.acquire("job:1", Duration::from_millis(50)).await.unwrap();
        assert!(!acquired);
    }

    #[tokio::test]
    async fn test_concurrent_acquires_have_one_winner() {
        use std::sync::Arc;

        let lock = Arc::new(provider(10_000, 5));

        let first = tokio::spawn({
            let lock = lock.clone();
            async move { lock.acquire("job:1", Duration::from_millis(100)).await.unwrap() }
        });
        let second = tokio::spawn({
            let lock = lock.clone();
            async move { lock.acquire("job:1", Duration::from_millis(100)).await.unwrap() }
        });

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        assert!(first ^ second, "exactly one concurrent acquirer must win");
    }

    #[tokio::test]
    async fn test_zero_timeout_is_single_attempt() {
        // With a 5s poll interval, any sleep would blow the elapsed bound.
        let lock = provider(10_000, 5_000);
        assert!(lock.try_acquire("job:1").await.unwrap());

        let started = Instant::now();
        let acquired = lock.acquire("job:1", Duration::ZERO).await.unwrap();

        assert!(!acquired);
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "zero-timeout acquire must not sleep"
        );
    }

    #[tokio::test]
    async fn test_unbounded_timeout_acquires_free_lock() {
        // A budget with no representable deadline must not trip the
        // deadline arithmetic; the first attempt wins immediately.
        let lock = MemoryLockProvider::new(LockSettings::default());

        assert!(lock.acquire("job:1", Duration::MAX).await.unwrap());
    }

    #[tokio::test]
    async fn test_unbounded_timeout_waits_out_contention() {
        let lock = provider(60, 5);
        assert!(lock.try_acquire("job:1").await.unwrap());

        // There is no deadline to hit; the lease expiring at 60ms is
        // what frees the key.
        assert!(lock.acquire("job:1", Duration::MAX).await.unwrap());
    }
}
