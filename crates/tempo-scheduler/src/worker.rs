//! Fixed pool of worker units consuming the three lane channels under
//! per-lane token-bucket rate limits, executing the referenced scripts and
//! recording `JobExecution` outcomes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempo_core::model::{ExecutionStatus, JobExecution};
use tempo_core::shutdown::{has_fired, ShutdownReceiver};
use tempo_core::AppConfig;
use tempo_store::{JobExecutionRepository, ScheduleRepository};
use tokio::process::Command;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::executor::Dispatch;
use crate::token_bucket::TokenBucket;

const SELECT_IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Receiving halves of the three lane channels, shared across worker units
/// behind a mutex so any unit may serve any lane.
pub struct LaneReceivers {
    pub high: mpsc::Receiver<Dispatch>,
    pub mid: mpsc::Receiver<Dispatch>,
    pub low: mpsc::Receiver<Dispatch>,
}

/// A reusable execution unit. `id` is reassigned on every checkout so each
/// dispatch is recorded against a fresh `WorkerID` even though the
/// underlying slot is recycled.
pub struct Worker {
    pub id: String,
}

impl Worker {
    fn unassigned() -> Self {
        Self { id: String::new() }
    }
}

/// Fixed-size, thread-safe pool of `Worker` units. Checkout and return are
/// each a single lock-guarded `Vec` operation, so both are atomic with
/// respect to every other unit's checkout/return.
struct WorkerObjectPool {
    free: tokio::sync::Mutex<Vec<Worker>>,
}

impl WorkerObjectPool {
    fn new(size: usize) -> Self {
        let free = (0..size).map(|_| Worker::unassigned()).collect();
        Self {
            free: tokio::sync::Mutex::new(free),
        }
    }

    /// Removes a `Worker` from the free list and mints it a fresh
    /// identifier. Every unit is in flight at most once, so a pool sized to
    /// `max_workers` never blocks here longer than an in-flight execution.
    async fn checkout(&self) -> Worker {
        loop {
            {
                let mut free = self.free.lock().await;
                if let Some(mut worker) = free.pop() {
                    worker.id = Uuid::new_v4().to_string();
                    return worker;
                }
            }
            tokio::time::sleep(SELECT_IDLE_SLEEP).await;
        }
    }

    async fn checkin(&self, worker: Worker) {
        self.free.lock().await.push(worker);
    }
}

struct Buckets {
    high: TokenBucket,
    mid: TokenBucket,
    low: TokenBucket,
}

enum Lane {
    High,
    Mid,
    Low,
}

impl Lane {
    fn as_str(&self) -> &'static str {
        match self {
            Lane::High => "high",
            Lane::Mid => "mid",
            Lane::Low => "low",
        }
    }
}

/// Runs the three token-bucket refillers and `max_workers` worker units.
pub struct WorkerPool {
    schedules: ScheduleRepository,
    executions: JobExecutionRepository,
    max_workers: usize,
    scripts_dir: String,
    buckets: Buckets,
    pool: WorkerObjectPool,
}

impl WorkerPool {
    pub fn new(schedules: ScheduleRepository, executions: JobExecutionRepository, config: &AppConfig) -> Self {
        let wp = &config.worker_pool;
        Self {
            schedules,
            executions,
            max_workers: wp.max_workers,
            scripts_dir: config.server.scripts_dir.clone(),
            buckets: Buckets {
                high: TokenBucket::new(wp.high.capacity, Duration::from_millis(wp.high.refill_ms)),
                mid: TokenBucket::new(wp.mid.capacity, Duration::from_millis(wp.mid.refill_ms)),
                low: TokenBucket::new(wp.low.capacity, Duration::from_millis(wp.low.refill_ms)),
            },
            pool: WorkerObjectPool::new(wp.max_workers),
        }
    }

    /// Spawns the refillers and worker units, then blocks until `shutdown`
    /// fires and every spawned task has exited.
    pub async fn run(self, lanes: LaneReceivers, shutdown: ShutdownReceiver) {
        tracing::info!(max_workers = self.max_workers, "worker pool starting");

        let pool = Arc::new(self);
        let mut tasks = tokio::task::JoinSet::new();

        tasks.spawn(pool.buckets.high.clone().run_refiller(shutdown.resubscribe()));
        tasks.spawn(pool.buckets.mid.clone().run_refiller(shutdown.resubscribe()));
        tasks.spawn(pool.buckets.low.clone().run_refiller(shutdown.resubscribe()));

        let lanes = Arc::new(tokio::sync::Mutex::new(lanes));
        for _ in 0..pool.max_workers {
            let pool = pool.clone();
            let lanes = lanes.clone();
            let shutdown = shutdown.resubscribe();
            tasks.spawn(async move { pool.run_worker(lanes, shutdown).await });
        }

        while tasks.join_next().await.is_some() {}
        tracing::info!("worker pool stopped");
    }

    async fn run_worker(&self, lanes: Arc<tokio::sync::Mutex<LaneReceivers>>, mut shutdown: ShutdownReceiver) {
        loop {
            if has_fired(&mut shutdown) {
                return;
            }

            let received = {
                let mut lanes = lanes.lock().await;
                let LaneReceivers { high, mid, low } = &mut *lanes;
                tokio::select! {
                    Some(job_id) = high.recv() => Some((Lane::High, job_id)),
                    Some(job_id) = mid.recv() => Some((Lane::Mid, job_id)),
                    Some(job_id) = low.recv() => Some((Lane::Low, job_id)),
                    _ = tokio::time::sleep(SELECT_IDLE_SLEEP) => None,
                }
            };

            let Some((lane, job_id)) = received else {
                continue;
            };

            let bucket = match lane {
                Lane::High => &self.buckets.high,
                Lane::Mid => &self.buckets.mid,
                Lane::Low => &self.buckets.low,
            };

            if !bucket.take() {
                tracing::debug!(job_id = %job_id, lane = lane.as_str(), "rate-limited-shed");
                continue;
            }

            self.execute(&job_id).await;
        }
    }

    /// Checks out a `Worker` from the pool, resolves the script, runs it,
    /// persists a `JobExecution`, and returns the `Worker` to the pool. A
    /// dispatched JobID whose Schedule has vanished mid-flight is recorded
    /// as `failed` with `schedule-missing`.
    async fn execute(&self, job_id: &str) {
        let worker = self.pool.checkout().await;
        let start_time = Utc::now();

        let schedule = match self.schedules.get(job_id).await {
            Ok(s) => s,
            Err(_) => {
                self.record(job_id, &worker.id, start_time, ExecutionStatus::Failed, Some("schedule-missing".into()))
                    .await;
                self.pool.checkin(worker).await;
                return;
            }
        };

        let (status, error) = self.run_script(&schedule.payload).await;
        self.record(job_id, &worker.id, start_time, status, error).await;
        self.pool.checkin(worker).await;
    }

    async fn run_script(&self, payload: &str) -> (ExecutionStatus, Option<String>) {
        let script_path = Path::new(&self.scripts_dir).join(payload);
        let dir = script_path.parent().unwrap_or(Path::new(&self.scripts_dir));
        let filename = script_path.file_name().map(|f| f.to_string_lossy().into_owned());

        let Some(filename) = filename else {
            return (ExecutionStatus::Failed, Some("execution-failure: empty script path".into()));
        };

        let output = Command::new("python")
            .arg(&filename)
            .current_dir(dir)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => (ExecutionStatus::Completed, None),
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                (ExecutionStatus::Failed, Some(combined))
            }
            Err(e) => (ExecutionStatus::Failed, Some(e.to_string())),
        }
    }

    async fn record(
        &self,
        job_id: &str,
        worker_id: &str,
        start_time: chrono::DateTime<Utc>,
        status: ExecutionStatus,
        error: Option<String>,
    ) {
        let end_time = Utc::now();
        let process_id = JobExecution::compute_id(job_id, worker_id, start_time);
        let execution = JobExecution {
            process_id,
            job_id: job_id.to_string(),
            worker_id: worker_id.to_string(),
            start_time,
            end_time,
            status,
            error,
        };

        if let Err(e) = self.executions.create(&execution).await {
            tracing::error!(job_id = %job_id, error = %e, "failed to persist job execution");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_path_splits_into_directory_and_filename() {
        let path = Path::new("scripts").join("reports/a.py");
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "a.py");
        assert_eq!(path.parent().unwrap(), Path::new("scripts/reports"));
    }

    #[test]
    fn lane_names_match_config_sections() {
        assert_eq!(Lane::High.as_str(), "high");
        assert_eq!(Lane::Mid.as_str(), "mid");
        assert_eq!(Lane::Low.as_str(), "low");
    }

    #[tokio::test]
    async fn checkout_assigns_a_fresh_id_and_checkin_recycles_the_slot() {
        let pool = WorkerObjectPool::new(1);

        let first = pool.checkout().await;
        assert!(!first.id.is_empty());
        let first_id = first.id.clone();
        pool.checkin(first).await;

        let second = pool.checkout().await;
        assert_ne!(second.id, first_id);
    }

    #[tokio::test]
    async fn checkout_blocks_until_a_slot_is_returned() {
        let pool = std::sync::Arc::new(WorkerObjectPool::new(1));
        let held = pool.checkout().await;

        let waiter_pool = pool.clone();
        let waiter = tokio::spawn(async move { waiter_pool.checkout().await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        pool.checkin(held).await;
        let second = waiter.await.unwrap();
        assert!(!second.id.is_empty());
    }
}
