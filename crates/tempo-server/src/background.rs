//! Background task initialization: spawns the Scheduler, Executor and
//! Worker Pool that together form the cron-to-dispatch pipeline. The
//! admission API served by `app.rs` runs alongside these, independently.

use tempo_core::shutdown::ShutdownController;
use tempo_core::AppConfig;
use tempo_scheduler::{lane_channels, Executor, Scheduler, WorkerPool};
use tempo_store::{JobExecutionRepository, JobRepository, ScheduleRepository};
use tokio::task::JoinHandle;

/// Handles for the three long-lived pipeline tasks, so `main` can await
/// their exit during shutdown.
pub struct PipelineTasks {
    pub scheduler: JoinHandle<()>,
    pub executor: JoinHandle<()>,
    pub worker_pool: JoinHandle<()>,
}

pub fn init_background_tasks(
    config: &AppConfig,
    jobs: JobRepository,
    schedules: ScheduleRepository,
    executions: JobExecutionRepository,
    shutdown: &ShutdownController,
) -> PipelineTasks {
    let (lanes, lane_receivers) = lane_channels();

    let scheduler = Scheduler::new(jobs, schedules.clone(), config);
    let scheduler_shutdown = shutdown.subscribe();
    let scheduler = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let executor = Executor::new(schedules.clone(), config);
    let executor_shutdown = shutdown.subscribe();
    let executor = tokio::spawn(async move {
        if let Err(e) = executor.run(lanes, executor_shutdown).await {
            tracing::error!(error = %e, "executor task exited with an error");
        }
    });

    let worker_pool = WorkerPool::new(schedules, executions, config);
    let worker_pool_shutdown = shutdown.subscribe();
    let worker_pool = tokio::spawn(async move {
        worker_pool.run(lane_receivers, worker_pool_shutdown).await;
    });

    PipelineTasks {
        scheduler,
        executor,
        worker_pool,
    }
}
