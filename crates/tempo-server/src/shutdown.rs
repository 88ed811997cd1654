//! Process-layer shutdown handling. The coordination primitives
//! (`ShutdownController`/`ShutdownReceiver`) live in `tempo_core::shutdown`
//! so the pipeline crate can observe shutdown without depending on this
//! crate; this module only adds the OS-signal listening that belongs at the
//! process boundary.

pub use tempo_core::shutdown::{has_fired, ShutdownController, ShutdownReceiver};

use tokio::signal;
use tracing::info;

/// Waits for SIGINT/SIGTERM and fires `controller.shutdown()` once received.
pub async fn listen_for_shutdown_signals(controller: ShutdownController) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received sigterm"),
    }

    controller.shutdown();
}

/// Blocks until shutdown fires, for use as axum's `with_graceful_shutdown`
/// future.
pub async fn graceful_shutdown(controller: ShutdownController) {
    let mut receiver = controller.subscribe();
    let _ = receiver.recv().await;
    info!("starting graceful shutdown sequence");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn graceful_shutdown_returns_once_signaled() {
        let controller = ShutdownController::with_default_timeout();
        let waiter = tokio::spawn(graceful_shutdown(controller.clone()));
        tokio::task::yield_now().await;
        controller.shutdown();
        waiter.await.unwrap();
    }
}
