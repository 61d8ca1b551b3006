//! Configuration Module
//!
//! Backend selection for stores and lock providers. The selector is a
//! closed set: a string naming an unknown backend is rejected when parsed,
//! never deferred to first use.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

// == Backend Kind ==
/// The backends this crate ships adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process hash map
    Memory,
    /// One JSON file per record in a directory
    Filesystem,
    /// Records in Redis over a caller-owned connection
    Redis,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "fs" => Ok(Self::Filesystem),
            "redis" => Ok(Self::Redis),
            other => Err(CacheError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Filesystem => "fs",
            Self::Redis => "redis",
        };
        f.write_str(name)
    }
}
