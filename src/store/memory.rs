//! In-Memory Record Store
//!
//! HashMap storage behind an async RwLock. Records stay until deleted or
//! purged; there is no capacity bound, TTL plus explicit deletion are the
//! only things that shrink the map.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::CacheEntry;
use crate::error::Result;
use crate::store::RecordStore;

// == Memory Store ==
/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Current record count, expired records included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn dependents_of(&self, key: &str) -> Result<Vec<String>> {
        // Full scan. The map is in-process and modest, so a reverse index
        // is not worth the bookkeeping it would add to every write.
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.dependencies.iter().any(|dep| dep == key))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        Ok(before - entries.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use serde_json::json;
    use std::time::Duration;

    fn entry(value: serde_json::Value, deps: &[&str]) -> CacheEntry {
        let options = CacheOptions {
            ttl: Duration::from_secs(60),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..CacheOptions::default()
        };
        CacheEntry::new(value, &options)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = MemoryStore::new();

        store.write("key1", &entry(json!("value1"), &[])).await.unwrap();
        let read = store.read("key1").await.unwrap().unwrap();

        assert_eq!(read.value, json!("value1"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_read_absent_is_none() {
        let store = MemoryStore::new();
        assert!(store.read("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();

        store.write("key1", &entry(json!(1), &[])).await.unwrap();
        store.delete("key1").await.unwrap();
        store.delete("key1").await.unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let store = MemoryStore::new();

        store.write("a", &entry(json!(1), &[])).await.unwrap();
        store.write("b", &entry(json!(2), &[])).await.unwrap();
        store.delete_all().await.unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_dependents_of_scans_declared_dependencies() {
        let store = MemoryStore::new();

        store.write("user:1", &entry(json!("u"), &[])).await.unwrap();
        store
            .write("profile:1", &entry(json!("p"), &["user:1"]))
            .await
            .unwrap();
        store
            .write("feed:1", &entry(json!("f"), &["user:1", "profile:1"]))
            .await
            .unwrap();

        let mut dependents = store.dependents_of("user:1").await.unwrap();
        dependents.sort();
        assert_eq!(dependents, vec!["feed:1".to_string(), "profile:1".to_string()]);

        assert_eq!(store.dependents_of("feed:1").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_records() {
        let store = MemoryStore::new();

        let dead = CacheEntry::new(json!("old"), &CacheOptions::default());
        store.write("dead", &dead).await.unwrap();
        store.write("live", &entry(json!("new"), &[])).await.unwrap();

        let removed = store.purge_expired().await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.read("dead").await.unwrap().is_none());
        assert!(store.read("live").await.unwrap().is_some());
    }
}
