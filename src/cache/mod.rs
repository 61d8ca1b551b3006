//! Cache Module
//!
//! The engine and its record, options, and statistics types.

mod engine;
mod entry;
mod stats;


// Re-export public types
pub use engine::Cache;
pub use entry::{current_timestamp_ms, CacheEntry, CacheOptions};
pub use stats::CacheStats;
