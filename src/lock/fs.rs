//! Filesystem Lock Provider
//!
//! One lease file per key in the provider's own directory, named by the
//! same SHA-256 canonicalization the record store uses and holding the
//! lease expiry as epoch-millisecond text. The atomic claim is the O_EXCL
//! file creation; reclaiming an expired lease is unlink-then-recreate,
//! which leaves a small window where two reclaimers race. That window is
//! accepted: this is cooperative single-host locking, and the loser of the
//! race simply sees the winner's fresh lease.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::lock::{LockProvider, LockSettings};
use crate::store::hash_key;

/// Claim retries inside one `try_acquire`, covering the unlink/recreate
/// window. Waiting beyond that is the polling loop's job.
const CLAIM_ATTEMPTS: u32 = 3;

// == File Lock Provider ==
/// Directory-backed lock provider.
#[derive(Debug, Clone)]
pub struct FileLockProvider {
    dir: PathBuf,
    settings: LockSettings,
}

impl FileLockProvider {
    // == Constructor ==
    /// Opens a provider rooted at `dir`, creating the directory if needed.
    ///
    /// Use a directory separate from any record store's; leases and
    /// records must not share files.
    pub fn new(dir: impl Into<PathBuf>, settings: LockSettings) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, settings })
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", hash_key(key)))
    }
}

/// Whether the lease file at `path` holds an unexpired lease. A file that
/// vanished or does not parse counts as dead.
async fn lease_is_live(path: &Path) -> Result<bool> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents
            .trim()
            .parse::<u64>()
            .map_or(false, |expires_at| current_timestamp_ms() < expires_at)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl LockProvider for FileLockProvider {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let path = self.lock_path(key);

        for _ in 0..CLAIM_ATTEMPTS {
            let lease_ms = self.settings.lease.as_millis() as u64;
            let expires_at = current_timestamp_ms().saturating_add(lease_ms);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(expires_at.to_string().as_bytes()).await?;
                    return Ok(true);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if lease_is_live(&path).await? {
                        return Ok(false);
                    }
                    // Stale lease: unlink and retry the atomic claim.
                    // Another reclaimer may win; the next pass sees its
                    // fresh lease and backs off.
                    remove_if_present(&path).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(false)
    }

    async fn release(&self, key: &str) -> Result<()> {
        remove_if_present(&self.lock_path(key)).await
    }

    async fn clear_locks(&self) -> Result<()> {
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(dirent) = dir.next_entry().await? {
            let path = dirent.path();
            if path.extension().is_some_and(|ext| ext == "lock") {
                remove_if_present(&path).await?;
            }
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }
}
