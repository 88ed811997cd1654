//! Per-lane rate limiting. A bucket holds up to `capacity` tokens and gains
//! one every `refill` interval while below capacity. `take` is atomic and
//! never blocks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempo_core::shutdown::ShutdownReceiver;

struct State {
    tokens: u32,
    capacity: u32,
}

/// Shareable rate limiter for one dispatch lane.
#[derive(Clone)]
pub struct TokenBucket {
    state: Arc<Mutex<State>>,
    refill: Duration,
}

impl TokenBucket {
    /// Starts full: `capacity` tokens available immediately.
    pub fn new(capacity: u32, refill: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                tokens: capacity,
                capacity,
            })),
            refill,
        }
    }

    /// Decrements and returns `true` if a token is available, else `false`
    /// without blocking.
    pub fn take(&self) -> bool {
        let mut state = self.state.lock();
        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn add_token(&self) {
        let mut state = self.state.lock();
        if state.tokens < state.capacity {
            state.tokens += 1;
        }
    }

    /// Runs the refill timer until shutdown fires. Spawned once per lane.
    pub async fn run_refiller(self, mut shutdown: ShutdownReceiver) {
        let mut interval = tokio::time::interval(self.refill);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = interval.tick() => self.add_token(),
                _ = shutdown.recv() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_starts_full() {
        let bucket = TokenBucket::new(3, Duration::from_millis(10));
        assert!(bucket.take());
        assert!(bucket.take());
        assert!(bucket.take());
        assert!(!bucket.take());
    }

    #[tokio::test(start_paused = true)]
    async fn refiller_adds_tokens_without_exceeding_capacity() {
        let bucket = TokenBucket::new(1, Duration::from_millis(10));
        assert!(bucket.take());
        assert!(!bucket.take());

        let controller = tempo_core::shutdown::ShutdownController::with_default_timeout();
        let rx = controller.subscribe();
        tokio::spawn(bucket.clone().run_refiller(rx));
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;

        assert!(bucket.take());
        assert!(!bucket.take());
    }
}
