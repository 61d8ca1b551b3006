//! Filesystem Record Store
//!
//! One JSON file per record inside a caller-supplied directory. File names
//! are the hex SHA-256 of the logical key, so any key maps to a valid file
//! name and distinct keys never share a path. The logical key is written
//! into the file alongside the entry, which is how directory scans get it
//! back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::cache::CacheEntry;
use crate::error::Result;
use crate::store::RecordStore;

// == Stored Record ==
/// On-disk envelope: the entry plus its logical key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    key: String,
    entry: CacheEntry,
}

// == Key Canonicalization ==
/// Hex SHA-256 of a logical key, used as the file stem.
pub(crate) fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

// == File Store ==
/// Directory-backed record store.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    // == Constructor ==
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Canonical path of the record file for a logical key.
    pub(crate) fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }

    /// All record files currently in the directory.
    async fn record_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(dirent) = dir.next_entry().await? {
            let path = dirent.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    async fn read_record(path: &Path) -> Result<StoredRecord> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        match fs::read(self.record_path(key)).await {
            Ok(bytes) => {
                let record: StoredRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record.entry))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let record = StoredRecord {
            key: key.to_string(),
            entry: entry.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;
        fs::write(self.record_path(key), bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_all(&self) -> Result<()> {
        // Only record files; the directory may hold other people's files.
        for path in self.record_files().await? {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn dependents_of(&self, key: &str) -> Result<Vec<String>> {
        // Dependents are not indexed on disk; this reads every record.
        let mut dependents = Vec::new();
        for path in self.record_files().await? {
            let record = Self::read_record(&path).await?;
            if record.entry.dependencies.iter().any(|dep| dep == key) {
                dependents.push(record.key);
            }
        }
        Ok(dependents)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.record_files().await? {
            let record = Self::read_record(&path).await?;
            if record.entry.is_expired() {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
