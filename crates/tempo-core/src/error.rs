//! Unified error types for the scheduling core, using thiserror.
//!
//! Provides consistent error handling across Scheduler, Executor, Worker Pool,
//! cache-through store adapter and the admission API.

use thiserror::Error;

/// The unified error type for tempo operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("primary store unreachable: {message}")]
    StoreUnreachable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cache unreachable: {message}")]
    CacheUnreachable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("duplicate {entity_type}: {id}")]
    Duplicate { entity_type: String, id: String },

    #[error("execution failed: {message}")]
    ExecutionFailure { message: String },

    #[error("rate limited: token unavailable on lane {lane}")]
    RateLimitedShed { lane: String },

    #[error("backoff exhausted after {attempts} attempts: {message}")]
    BackoffExhausted { attempts: u32, message: String },

    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("shutdown in progress")]
    ShutdownInProgress,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn store_unreachable(message: impl Into<String>) -> Self {
        Error::StoreUnreachable {
            message: message.into(),
            source: None,
        }
    }

    pub fn store_unreachable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::StoreUnreachable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn cache_unreachable(message: impl Into<String>) -> Self {
        Error::CacheUnreachable {
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_cron(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidCron {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Error::InvalidSchedule {
            reason: reason.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Error::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Error::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn database_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the operation that produced this error is meaningful.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StoreUnreachable { .. } | Error::CacheUnreachable { .. } | Error::Database { .. }
        )
    }

    /// HTTP status code for the admission API.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Duplicate { .. } => 409,
            Error::InvalidCron { .. } | Error::InvalidSchedule { .. } | Error::InvalidInput { .. } => {
                400
            }
            Error::RateLimitedShed { .. } => 429,
            Error::ShutdownInProgress => 503,
            _ => 500,
        }
    }

    /// Stable error code for API responses and log correlation.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "CONFIG_ERROR",
            Error::StoreUnreachable { .. } => "STORE_UNREACHABLE",
            Error::CacheUnreachable { .. } => "CACHE_UNREACHABLE",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::InvalidCron { .. } => "INVALID_CRON",
            Error::InvalidSchedule { .. } => "INVALID_SCHEDULE",
            Error::Duplicate { .. } => "DUPLICATE",
            Error::ExecutionFailure { .. } => "EXECUTION_FAILURE",
            Error::RateLimitedShed { .. } => "RATE_LIMITED_SHED",
            Error::BackoffExhausted { .. } => "BACKOFF_EXHAUSTED",
            Error::Database { .. } => "DATABASE_ERROR",
            Error::Cache { .. } => "CACHE_ERROR",
            Error::InvalidInput { .. } => "INVALID_INPUT",
            Error::Internal { .. } => "INTERNAL_ERROR",
            Error::ShutdownInProgress => "SHUTDOWN",
            Error::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

/// Result type alias for tempo operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(Error::not_found("Job", "abc").status_code(), 404);
        assert_eq!(Error::duplicate("Job", "abc").status_code(), 409);
        assert_eq!(
            Error::invalid_cron("* * *", "wrong field count").status_code(),
            400
        );
        assert_eq!(
            Error::RateLimitedShed {
                lane: "high".into()
            }
            .status_code(),
            429
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(Error::store_unreachable("connection refused").is_retryable());
        assert!(!Error::not_found("Job", "abc").is_retryable());
        assert!(!Error::InvalidCron {
            expr: "x".into(),
            reason: "y".into()
        }
        .is_retryable());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::config("bad").error_code(), "CONFIG_ERROR");
        assert_eq!(
            Error::BackoffExhausted {
                attempts: 5,
                message: "db down".into()
            }
            .error_code(),
            "BACKOFF_EXHAUSTED"
        );
    }
}
