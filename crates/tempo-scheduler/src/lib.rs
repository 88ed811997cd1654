//! Job store -> Scheduler -> Schedule store -> Executor -> priority lanes ->
//! Worker Pool -> Execution store: the cron-to-dispatch pipeline.

pub mod cron;
pub mod executor;
pub mod priority;
pub mod scheduler;
pub mod token_bucket;
pub mod worker;

pub use executor::Executor;
pub use scheduler::Scheduler;
pub use worker::{Worker, WorkerPool};

use tokio::sync::mpsc;

/// Unbuffered lane channels: the Executor's sending halves paired with the
/// Worker Pool's receiving halves.
pub fn lane_channels() -> (executor::Lanes, worker::LaneReceivers) {
    let (high_tx, high_rx) = mpsc::channel(1);
    let (mid_tx, mid_rx) = mpsc::channel(1);
    let (low_tx, low_rx) = mpsc::channel(1);

    (
        executor::Lanes {
            high: high_tx,
            mid: mid_tx,
            low: low_tx,
        },
        worker::LaneReceivers {
            high: high_rx,
            mid: mid_rx,
            low: low_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lane_channels_pair_senders_with_receivers() {
        let (lanes, mut receivers) = lane_channels();
        lanes.high.send("job-1".to_string()).await.unwrap();
        assert_eq!(receivers.high.recv().await.unwrap(), "job-1");
    }
}
