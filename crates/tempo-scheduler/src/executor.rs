//! Polls the Schedule store for due rows and fans them out across the three
//! dispatch lanes in descending priority order.

use chrono::Utc;
use tempo_core::error::{Error, Result};
use tempo_core::shutdown::{has_fired, ShutdownReceiver};
use tempo_core::AppConfig;
use tempo_store::ScheduleRepository;
use tokio::sync::mpsc;

use crate::priority;

/// A Schedule's JobID as handed from the Executor to a lane's workers.
pub type Dispatch = String;

/// Sending halves of the three lane channels. Unbuffered (capacity 1) so a
/// send blocks until a worker is ready to receive, which is the mechanism
/// for backpressure.
pub struct Lanes {
    pub high: mpsc::Sender<Dispatch>,
    pub mid: mpsc::Sender<Dispatch>,
    pub low: mpsc::Sender<Dispatch>,
}

pub struct Executor {
    schedules: ScheduleRepository,
    poll_interval: std::time::Duration,
    backoff_base: std::time::Duration,
    backoff_cap: std::time::Duration,
    max_retries: u32,
}

impl Executor {
    pub fn new(schedules: ScheduleRepository, config: &AppConfig) -> Self {
        Self {
            schedules,
            poll_interval: config.executor.poll_interval(),
            backoff_base: std::time::Duration::from_secs(config.executor.backoff_base_secs),
            backoff_cap: std::time::Duration::from_secs(config.executor.backoff_cap_secs),
            max_retries: config.executor.schedule_db_max_retries,
        }
    }

    /// Runs the poll loop until `shutdown` fires. A backoff-exhausted fetch
    /// is fatal to this task (not the process); the caller decides whether
    /// to escalate.
    pub async fn run(&self, lanes: Lanes, mut shutdown: ShutdownReceiver) -> Result<()> {
        tracing::info!("executor poll loop started");

        loop {
            if has_fired(&mut shutdown) {
                break;
            }

            let due = self.fetch_due_with_backoff().await?;
            if !due.is_empty() {
                self.dispatch(due, &lanes).await;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("executor poll loop stopped");
        Ok(())
    }

    async fn fetch_due_with_backoff(&self) -> Result<Vec<tempo_core::model::Schedule>> {
        let mut delay = self.backoff_base;
        let mut attempt = 0;

        loop {
            match self.schedules.list_due(Utc::now()).await {
                Ok(due) => return Ok(due),
                Err(e) if attempt + 1 >= self.max_retries => {
                    return Err(Error::BackoffExhausted {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "due-schedule fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.backoff_cap);
                    attempt += 1;
                }
            }
        }
    }

    async fn dispatch(&self, due: Vec<tempo_core::model::Schedule>, lanes: &Lanes) {
        let partitioned = priority::partition(due);
        let now = Utc::now();

        for schedule in partitioned.high {
            self.dispatch_one(schedule, &lanes.high, "high", now).await;
        }
        for schedule in partitioned.mid {
            self.dispatch_one(schedule, &lanes.mid, "mid", now).await;
        }
        for schedule in partitioned.low {
            self.dispatch_one(schedule, &lanes.low, "low", now).await;
        }
    }

    /// Sends a due Schedule's JobID onto its lane and records the dispatch
    /// via `last_run_time`. The Executor only ever reads Schedule rows plus
    /// this one update on dispatch; it never writes anything else.
    async fn dispatch_one(
        &self,
        schedule: tempo_core::model::Schedule,
        lane: &mpsc::Sender<Dispatch>,
        lane_name: &str,
        now: chrono::DateTime<Utc>,
    ) {
        let job_id = schedule.job_id;

        if let Err(e) = lane.send(job_id.clone()).await {
            tracing::error!(job_id = %job_id, lane = lane_name, error = %e, "lane closed, dispatch dropped");
            return;
        }

        if let Err(e) = self.schedules.mark_dispatched(&job_id, now).await {
            tracing::warn!(job_id = %job_id, error = %e, "failed to record dispatch on schedule");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = std::time::Duration::from_secs(1);
        let cap = std::time::Duration::from_secs(60);
        let mut delay = base;
        for _ in 0..10 {
            delay = std::cmp::min(delay * 2, cap);
        }
        assert_eq!(delay, cap);
    }
}
