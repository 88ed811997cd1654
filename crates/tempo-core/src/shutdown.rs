//! Graceful shutdown coordination shared by every long-lived task: the
//! Scheduler's scan loop, the Executor's poll loop, each Worker's lane
//! select, and the admission API's HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;

/// Shutdown signal receiver. Each long-lived task holds its own clone via
/// `ShutdownController::subscribe`.
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// A controller constructed once in `main` and shared with every task that
/// needs to observe shutdown. Recv on the broadcast channel never carries a
/// payload; the channel closing (or firing) is the signal.
#[derive(Clone)]
pub struct ShutdownController {
    sender: broadcast::Sender<()>,
    is_shutting_down: Arc<AtomicBool>,
    timeout: Duration,
}

impl ShutdownController {
    pub fn new(timeout: Duration) -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    pub fn with_default_timeout() -> Self {
        Self::new(Duration::from_secs(30))
    }

    pub fn subscribe(&self) -> ShutdownReceiver {
        self.sender.subscribe()
    }

    /// Fire the shutdown signal. Idempotent: only the first call logs and
    /// sends.
    pub fn shutdown(&self) {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("initiating graceful shutdown");
            let _ = self.sender.send(());
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::with_default_timeout()
    }
}

/// True once `receiver` has observed a shutdown signal or its sender was
/// dropped. Non-blocking: used as a guard at the top of a loop iteration.
pub fn has_fired(receiver: &mut ShutdownReceiver) -> bool {
    matches!(
        receiver.try_recv(),
        Ok(()) | Err(broadcast::error::TryRecvError::Closed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_a_single_shutdown_call() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let mut a = controller.subscribe();
        let mut b = controller.subscribe();

        assert!(!has_fired(&mut a));
        controller.shutdown();
        controller.shutdown();

        a.recv().await.unwrap();
        b.recv().await.unwrap();
        assert!(controller.is_shutting_down());
    }

    #[test]
    fn has_fired_is_false_before_any_signal() {
        let controller = ShutdownController::with_default_timeout();
        let mut rx = controller.subscribe();
        assert!(!has_fired(&mut rx));
    }
}
