//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Watcher configuration
//! ├── seen_notices.json     # Dedup snapshot: site -> identifiers
//! └── stats.json            # Summary of the last run
//! ```
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so an interrupted write leaves the previous file untouched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::RunSummary;
use crate::storage::{SeenMap, SeenStorage, SeenStore};

const STATS_KEY: &str = "stats.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    seen_key: String,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, seen_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            seen_key: seen_file.into(),
        }
    }

    /// Location of the dedup snapshot.
    pub fn seen_path(&self) -> PathBuf {
        self.path(&self.seen_key)
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    ///
    /// On failure the temporary file is removed and the error returned.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = tmp_path(&path);
        let result = Self::write_then_rename(&tmp, &path, bytes).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove partial file {}: {}", tmp.display(), e);
                }
            }
        }
        result
    }

    async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// `seen_notices.json` -> `seen_notices.json.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl SeenStorage for LocalStorage {
    async fn load_seen(&self, max_entries: usize) -> Result<SeenStore> {
        let Some(bytes) = self.read_bytes(&self.seen_key).await? else {
            log::info!("No seen file at {}, starting fresh", self.seen_path().display());
            return Ok(SeenStore::new(max_entries));
        };

        match serde_json::from_slice::<SeenMap>(&bytes) {
            Ok(map) => {
                let store = SeenStore::from_map(map, max_entries);
                log::debug!(
                    "Loaded seen notices for {} sites from {}",
                    store.as_map().len(),
                    self.seen_path().display()
                );
                Ok(store)
            }
            Err(e) => {
                log::warn!(
                    "Error loading seen file {}: {}. Starting fresh.",
                    self.seen_path().display(),
                    e
                );
                Ok(SeenStore::new(max_entries))
            }
        }
    }

    async fn save_seen(&self, store: &SeenStore) -> Result<()> {
        self.write_json(&self.seen_key, store.as_map()).await
    }

    async fn save_stats(&self, summary: &RunSummary) -> Result<()> {
        self.write_json(STATS_KEY, summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path(), "seen_notices.json")
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp).load_seen(1000).await.unwrap();
        assert!(store.as_map().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("seen_notices.json"), b"{\"site\": [\"a\",").unwrap();

        let store = storage(&tmp).load_seen(1000).await.unwrap();
        assert!(store.as_map().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        let mut store = SeenStore::new(1000);
        store.mark_seen("kawasotimun", "https://kawasotimun.gov.np/notice/1");
        store.mark_seen("gaindakotmun", "https://gaindakotmun.gov.np/सूचना/2");
        storage.save_seen(&store).await.unwrap();

        let loaded = storage.load_seen(1000).await.unwrap();
        assert_eq!(loaded.as_map(), store.as_map());

        // Non-ASCII is written as-is, not escaped.
        let raw = std::fs::read_to_string(storage.seen_path()).unwrap();
        assert!(raw.contains("सूचना"));
    }

    #[tokio::test]
    async fn test_interrupted_write_keeps_committed_file() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        let mut store = SeenStore::new(1000);
        store.mark_seen("site", "https://site.gov.np/notice/1");
        storage.save_seen(&store).await.unwrap();

        // A crash between writing the temp file and renaming it.
        std::fs::write(tmp_path(&storage.seen_path()), b"{\"site\": [\"half").unwrap();

        let loaded = storage.load_seen(1000).await.unwrap();
        assert!(loaded.contains("site", "https://site.gov.np/notice/1"));
    }

    #[tokio::test]
    async fn test_failed_write_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        // A non-empty directory where the snapshot should go makes the rename fail.
        let target = storage.seen_path();
        std::fs::create_dir_all(target.join("blocker")).unwrap();

        let mut store = SeenStore::new(1000);
        store.mark_seen("site", "https://site.gov.np/notice/1");

        assert!(storage.save_seen(&store).await.is_err());
        assert!(!tmp_path(&target).exists());
        // In-memory state is untouched.
        assert!(store.contains("site", "https://site.gov.np/notice/1"));
    }

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("/data/seen_notices.json")),
            PathBuf::from("/data/seen_notices.json.tmp")
        );
    }
}
