//! Expiry Sweeper Task
//!
//! Background task that periodically purges expired records from a store.
//! Reads already treat expired records as absent, so the cache is correct
//! without it; sweeping reclaims the space dead records occupy.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::RecordStore;

/// Spawns a background task that periodically purges expired records.
///
/// The task runs in an infinite loop, sleeping for `interval` between
/// sweeps. A failed sweep is logged and the loop keeps going.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
/// let sweeper_handle = spawn_sweeper_task(store.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper_handle.abort();
/// ```
pub fn spawn_sweeper_task(store: Arc<dyn RecordStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            match store.purge_expired().await {
                Ok(0) => debug!("Expiry sweep: no expired records found"),
                Ok(removed) => info!("Expiry sweep: purged {} expired records", removed),
                Err(err) => warn!("Expiry sweep failed: {}", err),
            }
        }
    })
}
