//! Configuration system for the scheduler, using config-rs.
//!
//! Supports TOML file configuration layered with environment variable
//! overrides, matching the `DB_*` / `REDIS_*` / `SCHEDULE_DB_MAX_RETRIES`
//! variable names a deployer already expects.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub executor: ExecutorConfig,
    pub worker_pool: WorkerPoolConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            executor: ExecutorConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment
    /// variable overrides. A missing file is not an error: defaults apply.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default()).map_err(|e| {
                Error::config(format!("failed to seed default configuration: {e}"))
            })?);

        if let Some(path) = path {
            if std::path::Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        let mut cfg: AppConfig = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| Error::config(format!("failed to parse configuration: {e}")))?;

        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Apply the documented `DB_*` / `REDIS_*` / `SCHEDULE_DB_MAX_RETRIES`
    /// environment variables over whatever the TOML file (or defaults) set.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("DB_HOST") {
            self.database.host = host;
        }
        if let Ok(port) = std::env::var("DB_PORT") {
            self.database.port = port
                .parse()
                .map_err(|_| Error::config("DB_PORT must be a valid port number"))?;
        }
        if let Ok(user) = std::env::var("DB_USER") {
            self.database.user = user;
        }
        if let Ok(password) = std::env::var("DB_PASSWORD") {
            self.database.password = password;
        }
        if let Ok(name) = std::env::var("DB_NAME") {
            self.database.name = name;
        }
        if let Ok(ssl) = std::env::var("DB_SSL") {
            self.database.ssl = matches!(ssl.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(host) = std::env::var("REDIS_HOST") {
            self.cache.redis_host = host;
        }
        if let Ok(port) = std::env::var("REDIS_PORT") {
            self.cache.redis_port = port
                .parse()
                .map_err(|_| Error::config("REDIS_PORT must be a valid port number"))?;
        }
        if let Ok(retries) = std::env::var("SCHEDULE_DB_MAX_RETRIES") {
            self.executor.schedule_db_max_retries = retries
                .parse()
                .map_err(|_| Error::config("SCHEDULE_DB_MAX_RETRIES must be an integer"))?;
        }
        Ok(())
    }
}

/// Admission API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_size: usize,
    pub shutdown_timeout_secs: u64,
    /// Directory uploaded job scripts are written under.
    pub scripts_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024,
            shutdown_timeout_secs: 30,
            scripts_dir: "scripts".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Primary store (Postgres) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl: bool,
    pub pool_min: u32,
    pub pool_max: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "tempo".to_string(),
            password: String::new(),
            name: "tempo".to_string(),
            ssl: false,
            pool_min: 2,
            pool_max: 10,
            connect_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        let sslmode = if self.ssl { "require" } else { "disable" };
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.name, sslmode
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Cache-through store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_host: String,
    pub redis_port: u16,
    /// TTL applied to Schedule cache entries. Job entries never expire.
    pub schedule_ttl_secs: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            schedule_ttl_secs: 3600,
            key_prefix: "tempo".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    pub fn schedule_ttl(&self) -> Duration {
        Duration::from_secs(self.schedule_ttl_secs)
    }
}

/// Logging configuration, consumed by `tracing-subscriber`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "tempo=info,sqlx=warn".
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tempo=info,tower_http=info,sqlx=warn".to_string(),
            json: false,
        }
    }
}

/// Scheduler scan-loop configuration (Job store -> Schedule store projection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub scan_interval_secs: u64,
    pub page_size: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 3,
            page_size: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// Executor due-poll and backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub poll_interval_secs: u64,
    pub schedule_db_max_retries: u32,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            schedule_db_max_retries: 6,
            backoff_base_secs: 1,
            backoff_cap_secs: 60,
        }
    }
}

impl ExecutorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// One priority lane's token bucket parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    pub capacity: u32,
    pub refill_ms: u64,
}

/// Worker pool sizing and per-lane rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    pub max_workers: usize,
    pub high: LaneConfig,
    pub mid: LaneConfig,
    pub low: LaneConfig,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 9,
            high: LaneConfig {
                capacity: 70,
                refill_ms: 70,
            },
            mid: LaneConfig {
                capacity: 20,
                refill_ms: 20,
            },
            low: LaneConfig {
                capacity: 10,
                refill_ms: 10,
            },
        }
    }
}

/// Admission API rate limiting (global token bucket, per spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scheduler.scan_interval_secs, 3);
        assert_eq!(cfg.executor.poll_interval_secs, 60);
        assert_eq!(cfg.worker_pool.max_workers, 9);
        assert_eq!(cfg.worker_pool.high.capacity, 70);
        assert_eq!(cfg.worker_pool.mid.refill_ms, 20);
        assert_eq!(cfg.worker_pool.low.capacity, 10);
    }

    #[test]
    fn database_url_reflects_ssl_mode() {
        let mut cfg = DatabaseConfig::default();
        assert!(cfg.connection_url().ends_with("sslmode=disable"));
        cfg.ssl = true;
        assert!(cfg.connection_url().ends_with("sslmode=require"));
    }

    #[test]
    fn load_without_file_returns_defaults_with_env_overrides() {
        std::env::remove_var("SCHEDULE_DB_MAX_RETRIES");
        let cfg = AppConfig::load(None).expect("defaults must load");
        assert_eq!(cfg.executor.schedule_db_max_retries, 6);
    }
}
