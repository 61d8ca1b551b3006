//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache and lock operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record or payload could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A Redis command failed
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend selector did not name a known backend
    #[error("unknown backend kind: {0}")]
    UnknownBackend(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
