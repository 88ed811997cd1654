//! Domain types shared between the primary store, the cache-through
//! adapter, and the dispatch pipeline (Scheduler, Executor, Worker Pool).
//! Living here — rather than in either consumer — is what lets
//! `tempo-store` and `tempo-scheduler` depend on the same `Job`/`Schedule`
//! shape without depending on each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::hash_fields;

/// A user-declared recurring task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub user_id: String,
    pub job_type: String,
    pub cron_expr: String,
    pub priority: i32,
    pub payload: String,
    pub max_retries: u32,
    pub rcre_time: DateTime<Utc>,
    pub trigger_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
}

impl Job {
    /// Content-hash identifier over the fields that define a Job's identity.
    /// The order is part of the on-disk identity contract: changing it
    /// changes every existing `JobID`.
    pub fn compute_id(
        user_id: &str,
        job_type: &str,
        cron_expr: &str,
        payload: &str,
        trigger_at: DateTime<Utc>,
        finish_at: DateTime<Utc>,
    ) -> String {
        hash_fields(&[
            user_id,
            job_type,
            cron_expr,
            payload,
            &trigger_at.to_rfc3339(),
            &finish_at.to_rfc3339(),
        ])
    }
}

/// The scheduler's projection of a Job into an executable plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub job_id: String,
    pub priority: i32,
    pub payload: String,
    pub max_retries: u32,
    pub retry_count: u32,
    pub exec_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub rcre_time: DateTime<Utc>,
    pub next_run_time: DateTime<Utc>,
    pub last_run_time: Option<DateTime<Utc>>,
}

impl Schedule {
    /// A fresh projection for a Job that has just become eligible.
    pub fn project(job: &Job, next_run_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            priority: job.priority,
            payload: job.payload.clone(),
            max_retries: job.max_retries,
            retry_count: 0,
            exec_time: None,
            duration_ms: None,
            rcre_time: now,
            next_run_time,
            last_run_time: None,
        }
    }
}

/// The outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ExecutionStatus::Pending),
            "running" => Some(ExecutionStatus::Running),
            "completed" => Some(ExecutionStatus::Completed),
            "failed" => Some(ExecutionStatus::Failed),
            "cancelled" => Some(ExecutionStatus::Cancelled),
            _ => None,
        }
    }
}

/// One record per dispatch attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub process_id: String,
    pub job_id: String,
    pub worker_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub error: Option<String>,
}

impl JobExecution {
    pub fn compute_id(job_id: &str, worker_id: &str, start_time: DateTime<Utc>) -> String {
        hash_fields(&[job_id, worker_id, &start_time.to_rfc3339()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn job_id_is_stable_for_identical_fields() {
        let now = Utc::now();
        let a = Job::compute_id("u1", "shell", "*/5 * * * *", "scripts/a.py", now, now + Duration::hours(1));
        let b = Job::compute_id("u1", "shell", "*/5 * * * *", "scripts/a.py", now, now + Duration::hours(1));
        assert_eq!(a, b);
    }

    #[test]
    fn schedule_project_copies_job_fields() {
        let now = Utc::now();
        let job = Job {
            job_id: "abc".into(),
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "*/5 * * * *".into(),
            priority: 50,
            payload: "scripts/a.py".into(),
            max_retries: 3,
            rcre_time: now,
            trigger_at: now,
            finish_at: now + Duration::hours(1),
        };
        let next_run = now + Duration::minutes(5);
        let schedule = Schedule::project(&job, next_run, now);
        assert_eq!(schedule.job_id, job.job_id);
        assert_eq!(schedule.priority, job.priority);
        assert_eq!(schedule.next_run_time, next_run);
        assert_eq!(schedule.retry_count, 0);
    }

    #[test]
    fn execution_status_round_trips_through_str() {
        for s in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(ExecutionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ExecutionStatus::parse("bogus"), None);
    }
}
