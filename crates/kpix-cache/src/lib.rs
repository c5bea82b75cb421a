//! Two-tier result cache: an in-process map backed by an optional
//! file-per-key or redis store.
//!
//! The cache is a performance optimization, never a correctness dependency:
//! backend failures are logged and degrade to a miss, and a disabled cache
//! turns every operation into a no-op.

pub mod error;
pub mod file;
pub mod manager;
pub mod redis_backend;

pub use error::CacheError;
pub use manager::{cache_key, CacheConfig, CacheManager};
