use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::Mutex;

use kpix_core::{AppConfig, CacheBackendKind, Platform};

use crate::file::FileStore;
use crate::redis_backend::RedisStore;

/// Builds the canonical cache key for an extraction result.
#[must_use]
pub fn cache_key(platform: Platform, operation: &str, target: &str) -> String {
    format!("{platform}:{operation}:{target}")
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub ttl_secs: u64,
    pub cache_dir: PathBuf,
    pub redis_url: String,
}

impl CacheConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            backend: config.cache_backend,
            ttl_secs: config.cache_ttl_secs,
            cache_dir: config.cache_dir.clone(),
            redis_url: config.redis_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    stored_at: u64,
}

enum Backend {
    /// Memory tier only; nothing beyond the in-process map.
    Memory,
    File(FileStore),
    Redis(RedisStore),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Two-tier cache: the in-process map is always consulted first, then the
/// configured backend. Writes go through to both tiers; TTL is enforced
/// lazily on read.
pub struct CacheManager {
    enabled: bool,
    ttl: Duration,
    memory: Mutex<HashMap<String, MemoryEntry>>,
    backend: Backend,
}

impl CacheManager {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let backend = match config.backend {
            CacheBackendKind::Memory => Backend::Memory,
            CacheBackendKind::File => Backend::File(FileStore::new(config.cache_dir.clone())),
            CacheBackendKind::Redis => {
                Backend::Redis(RedisStore::new(config.redis_url.clone(), config.ttl_secs))
            }
        };
        Self {
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_secs),
            memory: Mutex::new(HashMap::new()),
            backend,
        }
    }

    /// A memory-only cache with the given TTL. Convenient for tests and for
    /// callers that never configure a backend.
    #[must_use]
    pub fn memory_only(ttl_secs: u64) -> Self {
        Self::new(CacheConfig {
            enabled: true,
            backend: CacheBackendKind::Memory,
            ttl_secs,
            cache_dir: PathBuf::from(".cache"),
            redis_url: String::new(),
        })
    }

    /// Fetch a cached value, or `None` on miss, expiry, or backend failure.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        if let Some(value) = self.get_from_memory(key).await {
            tracing::debug!(key, "cache hit (memory)");
            return Some(value);
        }

        let backend_value = match &self.backend {
            Backend::Memory => None,
            Backend::File(store) => match store.get(key, self.ttl) {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!(key, error = %err, "file cache read failed; treating as miss");
                    None
                }
            },
            Backend::Redis(store) => match store.get(key).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!(key, error = %err, "redis cache read failed; treating as miss");
                    None
                }
            },
        };

        if let Some(value) = backend_value {
            tracing::debug!(key, "cache hit (backend)");
            self.memory.lock().await.insert(
                key.to_owned(),
                MemoryEntry {
                    value: value.clone(),
                    stored_at: unix_now(),
                },
            );
            return Some(value);
        }

        tracing::debug!(key, "cache miss");
        None
    }

    /// Store a value in both tiers. Backend failures are logged and ignored.
    pub async fn set(&self, key: &str, value: &Value) {
        if !self.enabled {
            return;
        }

        self.memory.lock().await.insert(
            key.to_owned(),
            MemoryEntry {
                value: value.clone(),
                stored_at: unix_now(),
            },
        );

        match &self.backend {
            Backend::Memory => {}
            Backend::File(store) => {
                if let Err(err) = store.set(key, value) {
                    tracing::error!(key, error = %err, "file cache write failed");
                }
            }
            Backend::Redis(store) => {
                if let Err(err) = store.set(key, value).await {
                    tracing::error!(key, error = %err, "redis cache write failed");
                }
            }
        }
    }

    /// Remove one key from both tiers.
    pub async fn delete(&self, key: &str) {
        if !self.enabled {
            return;
        }

        self.memory.lock().await.remove(key);

        match &self.backend {
            Backend::Memory => {}
            Backend::File(store) => {
                if let Err(err) = store.delete(key) {
                    tracing::error!(key, error = %err, "file cache delete failed");
                }
            }
            Backend::Redis(store) => {
                if let Err(err) = store.delete(key).await {
                    tracing::error!(key, error = %err, "redis cache delete failed");
                }
            }
        }
    }

    /// Drop every cached value from both tiers.
    pub async fn clear(&self) {
        if !self.enabled {
            return;
        }

        self.memory.lock().await.clear();

        match &self.backend {
            Backend::Memory => {}
            Backend::File(store) => {
                if let Err(err) = store.clear() {
                    tracing::error!(error = %err, "file cache clear failed");
                }
            }
            Backend::Redis(store) => {
                if let Err(err) = store.clear().await {
                    tracing::error!(error = %err, "redis cache clear failed");
                }
            }
        }
        tracing::info!("cache cleared");
    }

    async fn get_from_memory(&self, key: &str) -> Option<Value> {
        let mut memory = self.memory.lock().await;
        let entry = memory.get(key)?;
        let age = unix_now().saturating_sub(entry.stored_at);
        if age > self.ttl.as_secs() {
            memory.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_format() {
        assert_eq!(
            cache_key(Platform::Youtube, "followers", "https://youtube.com/@MrBeast"),
            "youtube:followers:https://youtube.com/@MrBeast"
        );
    }

    #[tokio::test]
    async fn memory_set_then_get_returns_identical_value() {
        let cache = CacheManager::memory_only(60);
        let value = json!({"followers": 30300});
        cache.set("youtube:followers:x", &value).await;
        assert_eq!(cache.get("youtube:followers:x").await, Some(value));
    }

    #[tokio::test]
    async fn memory_get_after_ttl_returns_none() {
        let cache = CacheManager::memory_only(0);
        cache.set("k", &json!(1)).await;
        // With ttl=0 anything older than the current second is expired.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = CacheManager::memory_only(60);
        cache.set("k", &json!("v")).await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let cache = CacheManager::memory_only(60);
        cache.set("a", &json!(1)).await;
        cache.set("b", &json!(2)).await;
        cache.clear().await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, None);
    }

    #[tokio::test]
    async fn disabled_cache_is_a_no_op() {
        let cache = CacheManager::new(CacheConfig {
            enabled: false,
            backend: CacheBackendKind::Memory,
            ttl_secs: 60,
            cache_dir: PathBuf::from(".cache"),
            redis_url: String::new(),
        });
        cache.set("k", &json!("v")).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn file_backend_round_trips_and_survives_memory_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            enabled: true,
            backend: CacheBackendKind::File,
            ttl_secs: 60,
            cache_dir: dir.path().to_path_buf(),
            redis_url: String::new(),
        };
        let writer = CacheManager::new(config.clone());
        let value = json!({"followers": 12345});
        writer.set("instagram:followers:nike", &value).await;

        // A fresh manager has an empty memory tier, so this exercises the
        // backend read path and the memory promotion on hit.
        let reader = CacheManager::new(config);
        assert_eq!(reader.get("instagram:followers:nike").await, Some(value));
    }

    #[tokio::test]
    async fn file_backend_expires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            enabled: true,
            backend: CacheBackendKind::File,
            ttl_secs: 0,
            cache_dir: dir.path().to_path_buf(),
            redis_url: String::new(),
        };
        let writer = CacheManager::new(config.clone());
        writer.set("k", &json!(1)).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let reader = CacheManager::new(config);
        assert_eq!(reader.get("k").await, None);
    }

    #[tokio::test]
    async fn unreadable_cache_dir_degrades_to_miss() {
        let config = CacheConfig {
            enabled: true,
            backend: CacheBackendKind::File,
            ttl_secs: 60,
            cache_dir: PathBuf::from("/nonexistent/kpix-cache-test"),
            redis_url: String::new(),
        };
        let cache = CacheManager::new(config);
        // The write fails (logged) and the read is a plain miss, not an error.
        cache.set("k", &json!(1)).await;
        // Memory tier still works even when the backend directory is bad.
        assert_eq!(cache.get("k").await, Some(json!(1)));
    }
}
