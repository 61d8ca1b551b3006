//! Cache Entry Module
//!
//! Defines the record stored for each cached key: the JSON payload plus
//! expiration, dependency, priority, and lock metadata. Every backend
//! persists this shape, so all fields round-trip through serde.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cache record as persisted by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds); the record is dead once
    /// the current time reaches it
    pub expires_at: u64,
    /// Keys this record depends on; deleting any of them deletes this record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Caller-supplied priority hint, stored but never acted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Whether the record was written under an acquired write lock
    #[serde(default)]
    pub locked: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a record expiring `options.ttl` from now.
    ///
    /// The default options carry a zero TTL, which yields a record that is
    /// already dead; callers who want the value cached must pass a positive
    /// TTL.
    pub fn new(value: Value, options: &CacheOptions) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            expires_at: now.saturating_add(options.ttl.as_millis() as u64),
            dependencies: options.dependencies.clone(),
            priority: options.priority,
            locked: false,
        }
    }

    // == Is Expired ==
    /// Checks if the record has expired.
    ///
    /// Boundary condition: a record is expired once the current time is
    /// greater than or equal to the expiration time, so a zero-TTL record
    /// is dead on arrival.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 if expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Cache Options ==
/// Per-write options accepted by [`Cache::set`](crate::cache::Cache::set).
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Time-to-live; defaults to zero, which expires the record immediately
    pub ttl: Duration,
    /// Keys the new record depends on
    pub dependencies: Vec<String>,
    /// Priority hint stored alongside the record
    pub priority: Option<i64>,
    /// When set and a lock provider is attached, the write first acquires
    /// the key's lock within this budget or is skipped
    pub lock_timeout: Option<Duration>,
}

impl CacheOptions {
    /// Options with the given TTL and everything else defaulted.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_entry_with_ttl_is_live() {
        let options = CacheOptions::with_ttl(Duration::from_secs(60));
        let entry = CacheEntry::new(json!("test_value"), &options);

        assert_eq!(entry.value, json!("test_value"));
        assert!(!entry.is_expired());
        assert!(!entry.locked);
    }

    #[test]
    fn test_entry_default_options_dead_on_arrival() {
        // Zero TTL means the record expires the instant it is created.
        let entry = CacheEntry::new(json!(1), &CacheOptions::default());

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_entry_expiration() {
        let options = CacheOptions::with_ttl(Duration::from_millis(50));
        let entry = CacheEntry::new(json!("test_value"), &options);

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let options = CacheOptions::with_ttl(Duration::from_secs(10));
        let entry = CacheEntry::new(json!("test_value"), &options);

        let remaining = entry.ttl_remaining_ms();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        // An entry expiring exactly now must already count as dead.
        let entry = CacheEntry {
            value: json!("test"),
            expires_at: current_timestamp_ms(),
            dependencies: Vec::new(),
            priority: None,
            locked: false,
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_entry_metadata_from_options() {
        let options = CacheOptions {
            ttl: Duration::from_secs(30),
            dependencies: vec!["user:1".to_string()],
            priority: Some(7),
            lock_timeout: None,
        };
        let entry = CacheEntry::new(json!({"name": "ada"}), &options);

        assert_eq!(entry.dependencies, vec!["user:1".to_string()]);
        assert_eq!(entry.priority, Some(7));
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let options = CacheOptions {
            ttl: Duration::from_secs(60),
            dependencies: vec!["a".to_string(), "b".to_string()],
            priority: Some(-3),
            lock_timeout: None,
        };
        let entry = CacheEntry::new(json!({"n": 42}), &options);

        let encoded = serde_json::to_string(&entry).unwrap();
        let decoded: CacheEntry = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.value, entry.value);
        assert_eq!(decoded.expires_at, entry.expires_at);
        assert_eq!(decoded.dependencies, entry.dependencies);
        assert_eq!(decoded.priority, entry.priority);
        assert_eq!(decoded.locked, entry.locked);
    }

    #[test]
    fn test_entry_serde_omits_empty_metadata() {
        let options = CacheOptions::with_ttl(Duration::from_secs(60));
        let entry = CacheEntry::new(json!("v"), &options);

        let encoded = serde_json::to_string(&entry).unwrap();

        assert!(!encoded.contains("dependencies"));
        assert!(!encoded.contains("priority"));

        // Omitted fields come back as their defaults.
        let decoded: CacheEntry = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.dependencies.is_empty());
        assert!(decoded.priority.is_none());
    }
}
