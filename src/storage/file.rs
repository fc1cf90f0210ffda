// SPDX-License-Identifier: Apache-2.0

//! File Store
//!
//! Keeps entries in a single JSON object on disk. Reads always go back to the
//! file so that writes from other processes sharing the directory are seen on
//! the next read. There is no cross-process locking: last writer wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};
use crate::metrics;

pub const STORE_FILE: &str = "entitlements.json";

pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `<dir>/entitlements.json`. The directory is
    /// created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(STORE_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file that is not a JSON object of strings is logged and read as
    /// empty, so the next write replaces it instead of failing forever.
    fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::io(format!("Failed to read store file: {}", e)))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Discarding unreadable store file {:?}: {}", self.path, e);
                metrics::record_corrupt_purge();
                Ok(BTreeMap::new())
            }
        }
    }

    /// Writes a sibling temp file and renames it over the store, so readers
    /// in other processes see either the old map or the new one.
    fn save(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| StoreError::io(format!("Failed to create store directory: {}", e)))?;

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::serialization(format!("Failed to serialize store: {}", e)))?;

        let tmp_path = dir.join(format!("{}.{}.tmp", STORE_FILE, Uuid::new_v4().simple()));
        fs::write(&tmp_path, content)
            .map_err(|e| StoreError::io(format!("Failed to write store file: {}", e)))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io(format!("Failed to replace store file: {}", e)));
        }

        debug!("Saved {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_get_remove_roundtrip() -> StoreResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested"));

        assert_eq!(store.get("testPaid")?, None);
        assert!(!store.path().exists());

        store.set("testPaid", "true")?;
        store.set("paymentMethod", "credit_card")?;
        assert_eq!(store.get("testPaid")?.as_deref(), Some("true"));

        store.remove("testPaid")?;
        assert_eq!(store.get("testPaid")?, None);
        assert_eq!(store.get("paymentMethod")?.as_deref(), Some("credit_card"));
        Ok(())
    }

    #[test]
    fn writes_from_another_handle_are_visible() -> StoreResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let tab_a = FileStore::new(temp_dir.path());
        let tab_b = FileStore::new(temp_dir.path());

        tab_a.set("allQuizzesUnlocked", "true")?;
        assert_eq!(tab_b.get("allQuizzesUnlocked")?.as_deref(), Some("true"));

        tab_b.remove("allQuizzesUnlocked")?;
        assert_eq!(tab_a.get("allQuizzesUnlocked")?, None);
        Ok(())
    }

    #[test]
    fn corrupt_file_reads_empty_and_is_replaced_on_write() -> StoreResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        fs::write(store.path(), "{truncated").unwrap();

        assert_eq!(store.get("testPaid")?, None);
        store.set("testPaid", "true")?;
        store.set("allQuizzesUnlocked", "true")?;
        assert_eq!(store.get("testPaid")?.as_deref(), Some("true"));

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
        Ok(())
    }

    #[test]
    fn writes_leave_no_temp_files_behind() -> StoreResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let tab_a = FileStore::new(temp_dir.path());
        let tab_b = FileStore::new(temp_dir.path());

        for i in 0..10 {
            tab_a.set("paymentDate", &format!("2024-06-{:02}", i + 1))?;
            tab_b.set("paymentMethod", "pix")?;
        }
        tab_b.remove("paymentMethod")?;

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![STORE_FILE.to_string()]);
        assert_eq!(tab_b.get("paymentDate")?.as_deref(), Some("2024-06-10"));
        Ok(())
    }

    #[test]
    fn empty_file_reads_as_empty_store() -> StoreResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        fs::write(store.path(), "").unwrap();

        assert_eq!(store.get("testPaid")?, None);
        store.set("testPaid", "true")?;
        assert_eq!(store.get("testPaid")?.as_deref(), Some("true"));
        Ok(())
    }
}
