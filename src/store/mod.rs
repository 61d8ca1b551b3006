//! Record Store Module
//!
//! The storage contract every cache backend implements, plus the
//! configuration used to open one. The engine never sees a concrete
//! backend; it talks to `Arc<dyn RecordStore>`.

mod fs;
mod memory;
mod redis;

pub use fs::FileStore;
pub use memory::MemoryStore;
pub use redis::RedisStore;

pub(crate) use fs::hash_key;

use std::path::PathBuf;
use std::sync::Arc;

use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::Result;

// == Record Store Trait ==
/// Storage adapter contract.
///
/// Implementations store whole [`CacheEntry`] records keyed by
/// caller-supplied strings. They never interpret expiry: a read returns
/// the record whether it is live or dead, and the engine decides. Backends
/// with naming restrictions must canonicalize keys without collisions;
/// distinct logical keys must never share a storage location.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads the record for `key`, expired or not. `None` when absent.
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Writes the record for `key`, replacing any previous one.
    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()>;

    /// Removes the record for `key`. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every record this store holds.
    async fn delete_all(&self) -> Result<()>;

    /// Returns the keys whose records list `key` as a dependency.
    async fn dependents_of(&self, key: &str) -> Result<Vec<String>>;

    /// Removes expired records, returning how many were dropped.
    ///
    /// Optional hook for the background sweeper. Reads already treat
    /// expired records as absent, so correctness never depends on this.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

// == Store Configuration ==
/// Selects and parameterizes a record store backend.
#[derive(Clone)]
pub enum StoreConfig {
    /// In-process hash map
    Memory,
    /// One JSON file per record inside `dir`
    Filesystem { dir: PathBuf },
    /// Records in Redis over a caller-owned connection; `namespace` is
    /// prepended to every key the store touches
    Redis {
        conn: MultiplexedConnection,
        namespace: Option<String>,
    },
}

// == Open Store ==
/// Opens the configured backend.
///
/// Validation happens here, not at first use: the filesystem variant
/// creates its directory up front.
pub fn open_store(config: StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::Filesystem { dir } => Ok(Arc::new(FileStore::new(dir)?)),
        StoreConfig::Redis { conn, namespace } => Ok(Arc::new(RedisStore::new(conn, namespace))),
    }
}
