//! Redis cache backend with per-key expiry.
//!
//! The connection manager is created lazily on first use so a configured but
//! unreachable redis instance only costs a logged error per operation, never
//! a startup failure.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::CacheError;

pub struct RedisStore {
    url: String,
    ttl_secs: u64,
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    #[must_use]
    pub fn new(url: String, ttl_secs: u64) -> Self {
        Self {
            url,
            ttl_secs,
            connection: Mutex::new(None),
        }
    }

    async fn manager(&self) -> Result<ConnectionManager, CacheError> {
        let mut guard = self.connection.lock().await;
        if let Some(manager) = guard.as_ref() {
            return Ok(manager.clone());
        }
        let client = redis::Client::open(self.url.as_str())?;
        let manager = client.get_connection_manager().await?;
        *guard = Some(manager.clone());
        Ok(manager)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.manager().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        let mut conn = self.manager().await?;
        let payload = value.to_string();
        // SETEX gives redis-native expiry on top of the lazy TTL check.
        let () = conn.set_ex(key, payload, self.ttl_secs.max(1)).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager().await?;
        let () = conn.del(key).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.manager().await?;
        let () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
