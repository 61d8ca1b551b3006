//! Redis Record Store
//!
//! Records are JSON strings under `cache:`-prefixed keys with a server-side
//! PX expiry mirroring the record's own deadline. The reverse dependency
//! relation is kept incrementally: for every declared dependency `d`, the
//! set `dep:d` holds the keys depending on `d`, maintained on write and
//! delete so lookups cost one SMEMBERS instead of a full keyspace walk.
//! PX expiry removes records behind the index's back, so lookups prune as
//! they read: memberships whose records are gone are SREM'd on the spot.
//!
//! The connection is owned by the caller and cloned per operation;
//! multiplexed connections are built for exactly that. Bulk removal scans
//! this store's own prefixes and never touches the rest of the database.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::Result;
use crate::store::RecordStore;

// == Key Layout ==
/// Record and reverse-index prefixes for a namespace. The two families
/// differ before any logical key begins, so no key can make a record
/// collide with a dep set.
fn key_prefixes(namespace: Option<String>) -> (String, String) {
    let ns = namespace.unwrap_or_default();
    (format!("{ns}cache:"), format!("{ns}dep:"))
}

// == Redis Store ==
/// Redis-backed record store.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    record_prefix: String,
    dep_prefix: String,
}

impl RedisStore {
    // == Constructor ==
    /// Creates a store over a caller-owned connection.
    ///
    /// `namespace` is prepended to both key families, letting several
    /// tenants share one database ("app1:cache:...", "app1:dep:...").
    pub fn new(conn: MultiplexedConnection, namespace: Option<String>) -> Self {
        let (record_prefix, dep_prefix) = key_prefixes(namespace);
        Self {
            record_prefix,
            dep_prefix,
            conn,
        }
    }

    fn record_key(&self, key: &str) -> String {
        format!("{}{}", self.record_prefix, key)
    }

    fn dep_key(&self, key: &str) -> String {
        format!("{}{}", self.dep_prefix, key)
    }

    /// Collects every key matching `pattern` via cursor-based SCAN.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<()> {
        let keys = self.scan_keys(pattern).await?;
        if !keys.is_empty() {
            let mut conn = self.conn.clone();
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.record_key(key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        // PX rejects zero; a dead-on-arrival record lives one millisecond
        // and reads as expired either way.
        let px = entry.ttl_remaining_ms().max(1);

        // An overwrite may drop dependencies, so the old memberships go
        // before the new ones land.
        let previous = self.read(key).await?;

        let mut pipe = redis::pipe();
        if let Some(old) = previous {
            for dep in &old.dependencies {
                pipe.srem(self.dep_key(dep), key).ignore();
            }
        }
        pipe.cmd("SET")
            .arg(self.record_key(key))
            .arg(json)
            .arg("PX")
            .arg(px)
            .ignore();
        for dep in &entry.dependencies {
            pipe.sadd(self.dep_key(dep), key).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // The record's index memberships die with it. Its own dep set is
        // left alone: it mirrors what other records declare, and the
        // SREMs from their deletes and from lookup pruning empty it out,
        // at which point Redis drops the set on its own.
        let record = self.read(key).await?;

        let mut pipe = redis::pipe();
        if let Some(entry) = &record {
            for dep in &entry.dependencies {
                pipe.srem(self.dep_key(dep), key).ignore();
            }
        }
        pipe.del(self.record_key(key)).ignore();

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        // Scoped to this store's prefixes; FLUSHDB would take co-tenant
        // data with it.
        self.delete_matching(&format!("{}*", self.record_prefix))
            .await?;
        self.delete_matching(&format!("{}*", self.dep_prefix)).await
    }

    async fn dependents_of(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(self.dep_key(key)).await?;
        if members.is_empty() {
            return Ok(members);
        }

        // A member whose record aged out via PX never got its SREM; keep
        // only members whose records still exist and evict the rest, so
        // the set only ever names stored records and cannot grow without
        // bound under churn.
        let mut pipe = redis::pipe();
        for member in &members {
            pipe.exists(self.record_key(member));
        }
        let stored: Vec<bool> = pipe.query_async(&mut conn).await?;

        let mut live = Vec::with_capacity(members.len());
        let mut dead = Vec::new();
        for (member, exists) in members.into_iter().zip(stored) {
            if exists {
                live.push(member);
            } else {
                dead.push(member);
            }
        }
        if !dead.is_empty() {
            let _: () = conn.srem(self.dep_key(key), dead).await?;
        }
        Ok(live)
    }

    // purge_expired is not overridden: PX makes the server drop dead
    // records on its own.
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    // Key layout checks only; everything that needs a live server lives in
    // tests/redis_backend_tests.rs.

    #[test]
    fn test_key_prefixes_without_namespace() {
        let (records, deps) = key_prefixes(None);
        assert_eq!(records, "cache:");
        assert_eq!(deps, "dep:");
    }

    #[test]
    fn test_key_prefixes_carry_namespace() {
        let (records, deps) = key_prefixes(Some("app1:".to_string()));
        assert_eq!(records, "app1:cache:");
        assert_eq!(deps, "app1:dep:");
    }

    #[test]
    fn test_record_and_dep_spaces_disjoint() {
        // Even a key crafted to imitate the other family cannot collide:
        // the prefixes differ before the key begins.
        let (records, deps) = key_prefixes(None);
        let record_key = format!("{records}dep:x");
        let dep_key = format!("{deps}x");
        assert_ne!(record_key, dep_key);
    }
}
