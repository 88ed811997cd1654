//! Shared application state for the admission API.

use std::sync::Arc;

use tempo_cache::Cache;
use tempo_core::shutdown::ShutdownController;
use tempo_core::AppConfig;
use tempo_store::{JobExecutionRepository, JobRepository, ScheduleRepository};

/// Everything a request handler needs: configuration, the three
/// repositories, the raw cache handle for rate limiting, and a way to ask
/// the process to shut down.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<Cache>,
    pub jobs: JobRepository,
    pub schedules: ScheduleRepository,
    pub executions: JobExecutionRepository,
    pub shutdown: ShutdownController,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        cache: Arc<Cache>,
        jobs: JobRepository,
        schedules: ScheduleRepository,
        executions: JobExecutionRepository,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            config,
            cache,
            jobs,
            schedules,
            executions,
            shutdown,
        }
    }
}
