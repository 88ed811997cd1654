//! Cache key generation and management.
//!
//! Every entity gets exactly one key-constructor function. The original
//! system wrote schedule entries under `JobSchedule:<id>` but read them back
//! under `Schedule:<id>`, so a write-then-read never hit. There is a single
//! prefix per entity kind here and nothing else is allowed to build one.

use std::fmt;

/// A cache key with namespace support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Option<String>,
    key: String,
}

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            namespace: None,
            key: key.into(),
        }
    }

    pub fn with_namespace(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            key: key.into(),
        }
    }

    pub fn as_str(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.key),
            None => self.key.clone(),
        }
    }

    pub fn prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            key: format!("{}:{}", prefix.into(), self.key),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Entity-keyed cache key constructors. `Job` and `Schedule` each have
/// exactly one constructor; nothing else in this crate is allowed to build
/// a key string for them by hand.
pub mod keys {
    use super::*;

    pub fn job(job_id: &str) -> CacheKey {
        CacheKey::new(format!("job:{}", job_id))
    }

    pub fn schedule(job_id: &str) -> CacheKey {
        CacheKey::new(format!("schedule:{}", job_id))
    }

    pub fn rate_limit(identifier: &str) -> CacheKey {
        CacheKey::new(format!("rate_limit:{}", identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_round_trips_through_display() {
        let key = CacheKey::new("test");
        assert_eq!(key.as_str(), "test");
        assert_eq!(key.to_string(), "test");
    }

    #[test]
    fn cache_key_with_namespace_prefixes() {
        let key = CacheKey::with_namespace("ns", "test");
        assert_eq!(key.as_str(), "ns:test");
    }

    #[test]
    fn job_and_schedule_keys_for_the_same_id_never_collide() {
        let job_key = keys::job("abc123");
        let schedule_key = keys::schedule("abc123");
        assert_ne!(job_key.as_str(), schedule_key.as_str());
    }

    #[test]
    fn schedule_key_is_the_only_prefix_used_for_schedules() {
        // A write and a read both go through `keys::schedule`, so there is
        // no way for them to diverge the way `JobSchedule:` vs `Schedule:`
        // once did.
        let written = keys::schedule("job-1").as_str();
        let read = keys::schedule("job-1").as_str();
        assert_eq!(written, read);
        assert!(written.starts_with("schedule:"));
    }
}
