//! Row types for the four persisted tables: Job, Schedule, JobExecution,
//! Worker. Each row converts to/from its domain type (`tempo_core::model`)
//! at the repository boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempo_core::model::{ExecutionStatus, Job, JobExecution, Schedule};

/// A user-declared recurring task definition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRow {
    pub job_id: String,
    pub user_id: String,
    pub job_type: String,
    pub cron_expr: String,
    pub priority: i32,
    pub payload: String,
    pub max_retries: i32,
    pub rcre_time: DateTime<Utc>,
    pub trigger_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
}

/// The scheduler's projection of a Job into an executable plan.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleRow {
    pub job_id: String,
    pub priority: i32,
    pub payload: String,
    pub max_retries: i32,
    pub retry_count: i32,
    pub exec_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub rcre_time: DateTime<Utc>,
    pub next_run_time: DateTime<Utc>,
    pub last_run_time: Option<DateTime<Utc>>,
}

/// One record per dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobExecutionRow {
    pub process_id: String,
    pub job_id: String,
    pub worker_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub error: Option<String>,
}

/// A worker pool unit, recorded only for observability; the dispatch core
/// treats workers as transient and never blocks on this table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkerRow {
    pub worker_id: String,
    pub lane: String,
    pub checked_out_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            job_id: row.job_id,
            user_id: row.user_id,
            job_type: row.job_type,
            cron_expr: row.cron_expr,
            priority: row.priority,
            payload: row.payload,
            max_retries: row.max_retries.max(0) as u32,
            rcre_time: row.rcre_time,
            trigger_at: row.trigger_at,
            finish_at: row.finish_at,
        }
    }
}

impl From<Job> for JobRow {
    fn from(job: Job) -> Self {
        JobRow {
            job_id: job.job_id,
            user_id: job.user_id,
            job_type: job.job_type,
            cron_expr: job.cron_expr,
            priority: job.priority,
            payload: job.payload,
            max_retries: job.max_retries as i32,
            rcre_time: job.rcre_time,
            trigger_at: job.trigger_at,
            finish_at: job.finish_at,
        }
    }
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            job_id: row.job_id,
            priority: row.priority,
            payload: row.payload,
            max_retries: row.max_retries.max(0) as u32,
            retry_count: row.retry_count.max(0) as u32,
            exec_time: row.exec_time,
            duration_ms: row.duration_ms,
            rcre_time: row.rcre_time,
            next_run_time: row.next_run_time,
            last_run_time: row.last_run_time,
        }
    }
}

impl From<Schedule> for ScheduleRow {
    fn from(schedule: Schedule) -> Self {
        ScheduleRow {
            job_id: schedule.job_id,
            priority: schedule.priority,
            payload: schedule.payload,
            max_retries: schedule.max_retries as i32,
            retry_count: schedule.retry_count as i32,
            exec_time: schedule.exec_time,
            duration_ms: schedule.duration_ms,
            rcre_time: schedule.rcre_time,
            next_run_time: schedule.next_run_time,
            last_run_time: schedule.last_run_time,
        }
    }
}

impl From<JobExecution> for JobExecutionRow {
    fn from(exec: JobExecution) -> Self {
        JobExecutionRow {
            process_id: exec.process_id,
            job_id: exec.job_id,
            worker_id: exec.worker_id,
            start_time: exec.start_time,
            end_time: exec.end_time,
            status: exec.status.as_str().to_string(),
            error: exec.error,
        }
    }
}

impl TryFrom<JobExecutionRow> for JobExecution {
    type Error = tempo_core::Error;

    fn try_from(row: JobExecutionRow) -> Result<Self, Self::Error> {
        let status = ExecutionStatus::parse(&row.status)
            .ok_or_else(|| tempo_core::Error::internal(format!("unknown execution status: {}", row.status)))?;
        Ok(JobExecution {
            process_id: row.process_id,
            job_id: row.job_id,
            worker_id: row.worker_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            error: row.error,
        })
    }
}
