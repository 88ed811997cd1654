//! Main application struct and server setup.

use axum::{middleware as axum_middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{body_limit, cors_layer, rate_limit, request_id, request_logging, security_headers};
use crate::routes;
use crate::shutdown::{graceful_shutdown, listen_for_shutdown_signals, ShutdownController};
use crate::state::AppState;

/// The admission API process: owns the router and the shutdown controller
/// the background pipeline tasks also subscribe to.
pub struct App {
    state: AppState,
    shutdown_controller: ShutdownController,
}

impl App {
    pub fn new(state: AppState, shutdown_controller: ShutdownController) -> Self {
        Self {
            state,
            shutdown_controller,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown_controller
    }

    /// Build the router with the full middleware stack. Ordering follows
    /// the teacher's layering convention: the outermost `.layer()` call
    /// runs first on the way in and last on the way out.
    pub fn build_router(&self) -> Router {
        routes::router()
            .with_state(self.state.clone())
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .layer(axum_middleware::from_fn(request_id))
            .layer(axum_middleware::from_fn(request_logging))
            .layer(axum_middleware::from_fn(security_headers))
            .layer(cors_layer())
            .layer(axum_middleware::from_fn_with_state(self.state.clone(), body_limit))
            .layer(axum_middleware::from_fn_with_state(self.state.clone(), rate_limit))
    }

    pub async fn run(self, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
        let router = self.build_router();

        info!("starting admission API on {}", addr);
        let listener = TcpListener::bind(addr).await?;

        let shutdown_controller = self.shutdown_controller.clone();
        tokio::spawn(listen_for_shutdown_signals(shutdown_controller.clone()));

        axum::serve(listener, router)
            .with_graceful_shutdown(graceful_shutdown(shutdown_controller))
            .await?;

        info!("admission API shutdown complete");
        Ok(())
    }

    pub async fn run_from_config(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = SocketAddr::new(self.state.config.server.host.parse()?, self.state.config.server.port);
        self.run(addr).await
    }
}

/// Server configuration builder, mirroring the fluent style used
/// elsewhere in the crate for `AppConfig`.
pub struct ServerBuilder {
    state: Option<AppState>,
    shutdown_controller: Option<ShutdownController>,
    host: String,
    port: u16,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            state: None,
            shutdown_controller: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }

    pub fn state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn shutdown_controller(mut self, controller: ShutdownController) -> Self {
        self.shutdown_controller = Some(controller);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let state = self.state.ok_or("AppState is required")?;
        let shutdown_controller = self.shutdown_controller.unwrap_or_default();
        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;

        App::new(state, shutdown_controller).run(addr).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_builder_tracks_host_and_port() {
        let builder = ServerBuilder::new().host("0.0.0.0").port(9090);
        assert_eq!(builder.host, "0.0.0.0");
        assert_eq!(builder.port, 9090);
    }
}
