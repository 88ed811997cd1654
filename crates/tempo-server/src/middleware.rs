//! HTTP middleware implementations.

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Request ID middleware - adds unique ID to each request
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    response.headers_mut().insert(
        "x-request-id",
        request_id.parse().unwrap_or_else(|_| "unknown".parse().unwrap()),
    );

    response
}

/// Request ID wrapper
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Request logging middleware
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = {
        let _guard = span.enter();
        next.run(request).await
    };

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "request completed with error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "request completed"
        );
    }

    response
}

/// Token-bucket-style rate limiting backed by the cache's atomic counter,
/// keyed per client IP.
pub async fn rate_limit(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let rate_limit = &state.config.rate_limit;
    if !rate_limit.enabled {
        return next.run(request).await;
    }

    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let cache_key = format!("rate_limit:{client_ip}");
    let window = Duration::from_secs(rate_limit.window_secs);
    let count = state.cache.increment(cache_key.as_str(), 1, Some(window)).await.unwrap_or(1);

    if count as u32 > rate_limit.requests_per_window {
        let mut response = Response::new(Body::from("too many requests"));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
            .headers_mut()
            .insert("retry-after", rate_limit.window_secs.to_string().parse().unwrap());
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("x-ratelimit-limit", rate_limit.requests_per_window.to_string().parse().unwrap());
    response.headers_mut().insert(
        "x-ratelimit-remaining",
        (rate_limit.requests_per_window as i64 - count).max(0).to_string().parse().unwrap(),
    );

    response
}

/// Permissive CORS for the admission API.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, "x-request-id".parse().unwrap()])
        .expose_headers([
            "x-request-id".parse().unwrap(),
            "x-ratelimit-limit".parse().unwrap(),
            "x-ratelimit-remaining".parse().unwrap(),
        ])
        .max_age(Duration::from_secs(3600))
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", "nosniff".parse().unwrap());
    headers.insert("x-frame-options", "SAMEORIGIN".parse().unwrap());
    headers.insert("referrer-policy", "strict-origin-when-cross-origin".parse().unwrap());
    headers.insert(
        "strict-transport-security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );
    headers.insert("cross-origin-opener-policy", "same-origin".parse().unwrap());
    headers.insert("cross-origin-resource-policy", "same-origin".parse().unwrap());

    response
}

/// Request body size limit, sourced from configuration rather than a fixed
/// constant.
pub async fn body_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let max = state.config.server.max_body_size as u64;

    if let Some(content_length) = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        if content_length > max {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_wrapper() {
        let id = RequestId("test-123".to_string());
        assert_eq!(id.0, "test-123");
    }
}
