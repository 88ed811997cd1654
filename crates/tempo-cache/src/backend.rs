//! Cache backend implementations.

use crate::key::CacheKey;
use async_trait::async_trait;
use std::time::Duration;
use tempo_core::error::{Error, Result};

/// Schedule entries expire after an hour; Job entries never expire on their
/// own (only explicit invalidation removes them).
const SCHEDULE_ENTRY_TTL: Duration = Duration::from_secs(3600);

/// Cache backend trait. `Cache` (in `cache.rs`) is the cache-through layer
/// built on top of this; backends themselves know nothing about Job or
/// Schedule.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    async fn exists(&self, key: &CacheKey) -> Result<bool>;

    /// Remaining TTL for a key, if the backend tracks one.
    async fn ttl(&self, key: &CacheKey) -> Result<Option<Duration>>;

    /// Increment a numeric counter, creating it at `delta` if absent. Used
    /// by the admission API's rate limiter.
    async fn increment(&self, key: &CacheKey, delta: i64, ttl: Option<Duration>) -> Result<i64>;

    async fn health_check(&self) -> Result<()>;
}

/// In-memory cache backend using moka. The default for a single-node
/// deployment or tests.
///
/// Moka's per-entry TTL is a build-time property of a cache instance, not a
/// per-insert argument, so a `set` call whose `ttl` is `Some` is routed into
/// a second cache instance built with that fixed time-to-live (today this is
/// exactly `SCHEDULE_ENTRY_TTL`, the only caller that ever passes a `ttl`);
/// a `None` ttl goes into the unbounded-lifetime cache instead. `get`/
/// `exists`/`delete` check both, since a key only ever lives in whichever one
/// it was written to.
#[cfg(feature = "memory")]
pub struct MemoryBackend {
    cache: moka::future::Cache<String, Vec<u8>>,
    ttl_cache: moka::future::Cache<String, Vec<u8>>,
}

#[cfg(feature = "memory")]
impl MemoryBackend {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: moka::future::Cache::builder()
                .max_capacity(max_capacity)
                .build(),
            ttl_cache: moka::future::Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(SCHEDULE_ENTRY_TTL)
                .build(),
        }
    }
}

#[cfg(feature = "memory")]
#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.ttl_cache.get(&key.as_str()).await {
            return Ok(Some(value));
        }
        Ok(self.cache.get(&key.as_str()).await)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        match ttl {
            Some(_) => self.ttl_cache.insert(key.as_str(), value).await,
            None => self.cache.insert(key.as_str(), value).await,
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let existed = self.cache.contains_key(&key.as_str()) || self.ttl_cache.contains_key(&key.as_str());
        self.cache.remove(&key.as_str()).await;
        self.ttl_cache.remove(&key.as_str()).await;
        Ok(existed)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.cache.contains_key(&key.as_str()) || self.ttl_cache.contains_key(&key.as_str()))
    }

    async fn ttl(&self, key: &CacheKey) -> Result<Option<Duration>> {
        // Moka tracks per-entry expiry internally but doesn't expose the
        // remaining duration; we can only report which bucket a key is in.
        if self.ttl_cache.contains_key(&key.as_str()) {
            return Ok(Some(SCHEDULE_ENTRY_TTL));
        }
        Ok(None)
    }

    async fn increment(&self, key: &CacheKey, delta: i64, ttl: Option<Duration>) -> Result<i64> {
        let current = self
            .get(key)
            .await?
            .and_then(|v| String::from_utf8(v).ok())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let new_value = current + delta;
        self.set(key, new_value.to_string().into_bytes(), ttl).await?;
        Ok(new_value)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis cache backend, for multi-node deployments where the cache must be
/// shared across Scheduler/Executor/admission-API processes.
#[cfg(feature = "redis-backend")]
pub struct RedisBackend {
    pool: deadpool_redis::Pool,
}

#[cfg(feature = "redis-backend")]
impl RedisBackend {
    pub fn new(url: &str) -> Result<Self> {
        let cfg = deadpool_redis::Config::from_url(url);
        let pool = cfg
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| Error::cache_unreachable(format!("failed to create redis pool: {e}")))?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::cache_unreachable(format!("failed to get redis connection: {e}")))
    }
}

#[cfg(feature = "redis-backend")]
#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        conn.get(key.as_str())
            .await
            .map_err(|e| Error::Cache { message: format!("GET failed: {e}") })
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => conn
                .set_ex(key.as_str(), value, ttl.as_secs())
                .await
                .map_err(|e| Error::Cache { message: format!("SETEX failed: {e}") }),
            None => conn
                .set(key.as_str(), value)
                .await
                .map_err(|e| Error::Cache { message: format!("SET failed: {e}") }),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        let deleted: i64 = conn
            .del(key.as_str())
            .await
            .map_err(|e| Error::Cache { message: format!("DEL failed: {e}") })?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        conn.exists(key.as_str())
            .await
            .map_err(|e| Error::Cache { message: format!("EXISTS failed: {e}") })
    }

    async fn ttl(&self, key: &CacheKey) -> Result<Option<Duration>> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        let ttl: i64 = conn
            .ttl(key.as_str())
            .await
            .map_err(|e| Error::Cache { message: format!("TTL failed: {e}") })?;
        Ok(if ttl < 0 { None } else { Some(Duration::from_secs(ttl as u64)) })
    }

    async fn increment(&self, key: &CacheKey, delta: i64, ttl: Option<Duration>) -> Result<i64> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        let value: i64 = conn
            .incr(key.as_str(), delta)
            .await
            .map_err(|e| Error::Cache { message: format!("INCRBY failed: {e}") })?;
        if let Some(ttl) = ttl {
            let _: () = conn
                .expire(key.as_str(), ttl.as_secs() as i64)
                .await
                .map_err(|e| Error::Cache { message: format!("EXPIRE failed: {e}") })?;
        }
        Ok(value)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::cache_unreachable(format!("PING failed: {e}")))?;
        Ok(())
    }
}

/// No-op backend. Used when the admission API runs with caching disabled;
/// every lookup falls through to the primary store.
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &CacheKey, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &CacheKey) -> Result<bool> {
        Ok(false)
    }

    async fn ttl(&self, _key: &CacheKey) -> Result<Option<Duration>> {
        Ok(None)
    }

    async fn increment(&self, _key: &CacheKey, delta: i64, _ttl: Option<Duration>) -> Result<i64> {
        Ok(delta)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn memory_backend_set_get_delete() {
        let backend = MemoryBackend::new(1000);
        let key = CacheKey::new("test");
        backend.set(&key, b"hello".to_vec(), None).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), Some(b"hello".to_vec()));
        assert!(backend.exists(&key).await.unwrap());
        assert!(backend.delete(&key).await.unwrap());
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn memory_backend_honors_per_insert_ttl() {
        let backend = MemoryBackend::new(1000);
        let job_key = CacheKey::new("job:1");
        let schedule_key = CacheKey::new("schedule:1");

        backend.set(&job_key, b"job".to_vec(), None).await.unwrap();
        backend.set(&schedule_key, b"sched".to_vec(), Some(SCHEDULE_ENTRY_TTL)).await.unwrap();

        assert_eq!(backend.ttl(&job_key).await.unwrap(), None);
        assert_eq!(backend.ttl(&schedule_key).await.unwrap(), Some(SCHEDULE_ENTRY_TTL));
        assert_eq!(backend.get(&schedule_key).await.unwrap(), Some(b"sched".to_vec()));
    }

    #[tokio::test]
    async fn null_backend_never_retains_anything() {
        let backend = NullBackend;
        let key = CacheKey::new("test");
        backend.set(&key, b"value".to_vec(), None).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), None);
        assert!(!backend.exists(&key).await.unwrap());
    }
}
