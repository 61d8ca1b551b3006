//! Polycache - a backend-agnostic caching library
//!
//! One caching contract over interchangeable storage backends: TTL expiry,
//! dependency-driven cascading invalidation, priority metadata, and
//! optional lock-protected writes behave the same whether records live in
//! memory, on disk, or in Redis.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use polycache::{Cache, CacheOptions, MemoryStore};
//!
//! # tokio_test::block_on(async {
//! let cache = Cache::new(Arc::new(MemoryStore::new()));
//!
//! cache
//!     .set("greeting", &"hello", CacheOptions::with_ttl(Duration::from_secs(60)))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(cache.get("greeting").await, Some("hello".into()));
//! # });
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod lock;
pub mod store;
pub mod tasks;

pub use cache::{Cache, CacheEntry, CacheOptions, CacheStats};
pub use config::BackendKind;
pub use error::{CacheError, Result};
pub use lock::{
    open_lock, FileLockProvider, LockConfig, LockProvider, LockSettings, MemoryLockProvider,
    RedisLockProvider,
};
pub use store::{
    open_store, FileStore, MemoryStore, RecordStore, RedisStore, StoreConfig,
};
pub use tasks::spawn_sweeper_task;
