//! Cache-through adapter for the job scheduler.
//!
//! This crate provides the pluggable `CacheBackend` (in-memory via moka or
//! Redis via deadpool-redis) and the thin `Cache` wrapper `tempo-store` uses
//! to implement cache-then-primary lookups for Job and Schedule records.
//! Key construction lives in `key::keys` and is the single place either
//! entity's cache key is built, closing the gap where writes and reads used
//! to disagree on the key prefix.

pub mod backend;
pub mod cache;
pub mod key;

pub use backend::{CacheBackend, NullBackend};
pub use cache::Cache;
pub use key::{keys, CacheKey};

#[cfg(feature = "memory")]
pub use backend::MemoryBackend;

#[cfg(feature = "redis-backend")]
pub use backend::RedisBackend;
