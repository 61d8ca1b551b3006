//! Redis Lock Provider
//!
//! Leases are `lock:`-prefixed keys claimed with SET NX PX, which is both
//! the atomic check-and-create and the expiry in one command: the server
//! drops the lease when it ages out, so reclaiming needs no client-side
//! sweep at all.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use async_trait::async_trait;

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::lock::{LockProvider, LockSettings};

// == Key Layout ==
/// Lease prefix for a namespace; the `lock:` family differs from the
/// record store's prefixes before any key begins, so locking a key never
/// touches its record.
fn lock_prefix(namespace: Option<String>) -> String {
    format!("{}lock:", namespace.unwrap_or_default())
}

// == Redis Lock Provider ==
/// Redis-backed lock provider.
#[derive(Clone)]
pub struct RedisLockProvider {
    conn: MultiplexedConnection,
    prefix: String,
    settings: LockSettings,
}

impl RedisLockProvider {
    // == Constructor ==
    /// Creates a provider over a caller-owned connection.
    ///
    /// `namespace` is prepended to the `lock:` prefix, matching the record
    /// store's namespacing so one tenant's locks stay out of another's.
    pub fn new(
        conn: MultiplexedConnection,
        namespace: Option<String>,
        settings: LockSettings,
    ) -> Self {
        Self {
            prefix: lock_prefix(namespace),
            conn,
            settings,
        }
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let lease_ms = self.settings.lease.as_millis() as u64;
        let expires_at = current_timestamp_ms().saturating_add(lease_ms);

        // NX claims only when absent, PX expires the lease server-side.
        // The stored expiry is informational; PX is what frees the lock.
        let mut conn = self.conn.clone();
        let claimed: Option<String> = redis::cmd("SET")
            .arg(self.lock_key(key))
            .arg(expires_at)
            .arg("NX")
            .arg("PX")
            .arg(lease_ms.max(1))
            .query_async(&mut conn)
            .await?;

        Ok(claimed.is_some())
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.lock_key(key)).await?;
        Ok(())
    }

    async fn clear_locks(&self) -> Result<()> {
        let pattern = format!("{}*", self.prefix);

        let mut scan_conn = self.conn.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = scan_conn.scan_match(&pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if !keys.is_empty() {
            let mut conn = self.conn.clone();
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }
}
