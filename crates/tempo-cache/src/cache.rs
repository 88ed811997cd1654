//! High-level cache API built on top of a `CacheBackend`.

use crate::backend::CacheBackend;
use crate::key::CacheKey;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tempo_core::error::{Error, Result};

/// High-level cache interface. Entity-specific lookup logic (cache-through
/// for Job/Schedule) lives one layer up, in `tempo-store`'s repositories;
/// this type only knows how to serialize, store, and retrieve bytes.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> Result<Option<T>> {
        let key = key.into();
        match self.backend.get(&key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::Cache { message: format!("deserialization failed: {e}") })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        key: impl Into<CacheKey>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into();
        let bytes = serde_json::to_vec(value)
            .map_err(|e| Error::Cache { message: format!("serialization failed: {e}") })?;
        self.backend.set(&key, bytes, ttl).await
    }

    pub async fn delete(&self, key: impl Into<CacheKey>) -> Result<bool> {
        self.backend.delete(&key.into()).await
    }

    pub async fn exists(&self, key: impl Into<CacheKey>) -> Result<bool> {
        self.backend.exists(&key.into()).await
    }

    pub async fn ttl(&self, key: impl Into<CacheKey>) -> Result<Option<Duration>> {
        self.backend.ttl(&key.into()).await
    }

    /// Increment a counter key, applying `ttl` only on creation-equivalent
    /// calls where the backend supports it (Redis `EXPIRE` after `INCRBY`;
    /// the in-memory backend treats every `set` as a fresh TTL).
    pub async fn increment(
        &self,
        key: impl Into<CacheKey>,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64> {
        self.backend.increment(&key.into(), delta, ttl).await
    }

    pub async fn health_check(&self) -> Result<()> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn test_cache() -> Cache {
        Cache::new(Arc::new(MemoryBackend::new(1000)))
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = test_cache();
        cache.set("test_key", &"hello world", None).await.unwrap();
        let value: String = cache.get("test_key").await.unwrap().unwrap();
        assert_eq!(value, "hello world");
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let cache = test_cache();
        let value: Option<String> = cache.get("absent").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn delete_makes_a_key_absent() {
        let cache = test_cache();
        cache.set("key", &"value", None).await.unwrap();
        assert!(cache.exists("key").await.unwrap());
        cache.delete("key").await.unwrap();
        assert!(!cache.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn increment_accumulates_for_rate_limiting() {
        let cache = test_cache();
        assert_eq!(cache.increment("counter", 1, None).await.unwrap(), 1);
        assert_eq!(cache.increment("counter", 1, None).await.unwrap(), 2);
    }
}
