use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O for {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry deserialization: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
