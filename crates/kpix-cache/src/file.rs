//! File-per-key cache backend.
//!
//! Each key maps to `<cache_dir>/<sha256(key)>.json` holding the value and
//! the unix timestamp it was stored at.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

fn hex_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn io_err(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::FileIo {
        path: path.display().to_string(),
        source,
    }
}

impl FileStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex_digest(key)))
    }

    /// Read an entry, enforcing TTL; expired files are removed.
    pub fn get(&self, key: &str, ttl: Duration) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let stored: serde_json::Value = serde_json::from_str(&raw)?;

        let stored_at = stored
            .get("timestamp")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if now.saturating_sub(stored_at) > ttl.as_secs() {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            return Ok(None);
        }

        Ok(stored.get("value").cloned())
    }

    pub fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let path = self.entry_path(key);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let entry = serde_json::json!({ "value": value, "timestamp": now });
        std::fs::write(&path, entry.to_string()).map_err(|e| io_err(&path, e))
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
        Ok(())
    }

    /// Remove every `.json` entry in the cache directory.
    pub fn clear(&self) -> Result<(), CacheError> {
        if !self.dir.exists() {
            return Ok(());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_is_stable_and_filename_safe() {
        let a = hex_digest("youtube:followers:https://youtube.com/@MrBeast");
        let b = hex_digest("youtube:followers:https://youtube.com/@MrBeast");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn set_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        let value = json!({"followers": 42});

        store.set("k1", &value).unwrap();
        assert_eq!(
            store.get("k1", Duration::from_secs(60)).unwrap(),
            Some(value)
        );

        store.delete("k1").unwrap();
        assert_eq!(store.get("k1", Duration::from_secs(60)).unwrap(), None);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert_eq!(store.get("absent", Duration::from_secs(60)).unwrap(), None);
    }

    #[test]
    fn clear_removes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.set("a", &json!(1)).unwrap();
        store.set("b", &json!(2)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get("a", Duration::from_secs(60)).unwrap(), None);
        assert_eq!(store.get("b", Duration::from_secs(60)).unwrap(), None);
    }
}
