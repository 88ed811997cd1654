//! Error handling for HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tempo_core::error::Error as CoreError;

/// Body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

/// An HTTP-status-carrying error, constructed either directly or via
/// `From<tempo_core::error::Error>`.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub body: ApiError,
}

impl HttpError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiError {
                code,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Every core error already knows its own status code and stable error
/// code; this conversion just plugs those into an axum response.
impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.error_code(), err.to_string())
    }
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err: HttpError = CoreError::not_found("Job", "abc").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.code, "NOT_FOUND");
    }

    #[test]
    fn invalid_cron_maps_to_400() {
        let err: HttpError = CoreError::invalid_cron("* * *", "bad").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let err: HttpError = CoreError::RateLimitedShed { lane: "high".into() }.into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
