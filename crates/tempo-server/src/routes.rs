//! Admission API: create, inspect, update and delete Jobs, and upload the
//! scripts they reference. This is the one HTTP surface in the whole
//! pipeline; the Scheduler/Executor/Worker Pool never see it.

use std::path::Path;

use axum::extract::{Path as AxumPath, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempo_core::error::Error as CoreError;
use tempo_core::model::Job;

use crate::error::{HttpError, HttpResult};
use crate::response::{paginated, Created, NoContent, PaginatedResponse, SuccessResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/job", post(create_job).put(update_job))
        .route("/api/v1/job/:id", get(get_job).delete(delete_job))
        .route("/api/v1/job-script", post(upload_script))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> HttpResult<PaginatedResponse<Job>> {
    let jobs = state.jobs.list(query.limit, query.offset).await?;
    Ok(paginated(jobs, query.limit, query.offset))
}

async fn get_job(State(state): State<AppState>, AxumPath(id): AxumPath<String>) -> HttpResult<SuccessResponse<Job>> {
    let job = state.jobs.get(&id).await?;
    Ok(SuccessResponse(job))
}

async fn delete_job(State(state): State<AppState>, AxumPath(id): AxumPath<String>) -> HttpResult<NoContent> {
    state.jobs.delete(&id).await?;
    let _ = state.schedules.delete(&id).await;
    Ok(NoContent)
}

/// The fields a caller supplies; `job_id` and `rcre_time` are derived.
#[derive(Debug, Deserialize)]
pub struct JobInput {
    pub user_id: String,
    pub job_type: String,
    pub cron_expr: String,
    #[serde(default)]
    pub priority: i32,
    pub payload: String,
    #[serde(default)]
    pub max_retries: u32,
    pub trigger_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
}

impl JobInput {
    /// A `trigger_at` already in the past is coerced forward to `now` rather
    /// than rejected; only a closed `finish_at` window is an error.
    fn coerce_trigger_at(&mut self, now: DateTime<Utc>) {
        if self.trigger_at < now {
            self.trigger_at = now;
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.finish_at <= self.trigger_at {
            return Err(CoreError::invalid_schedule(
                "finish_at must be strictly after trigger_at",
            ));
        }
        tempo_scheduler::cron::next_run_time(&self.cron_expr, self.trigger_at).map(|_| ())
    }

    fn into_job(self, now: DateTime<Utc>) -> Job {
        let job_id = Job::compute_id(
            &self.user_id,
            &self.job_type,
            &self.cron_expr,
            &self.payload,
            self.trigger_at,
            self.finish_at,
        );
        Job {
            job_id,
            user_id: self.user_id,
            job_type: self.job_type,
            cron_expr: self.cron_expr,
            priority: self.priority,
            payload: self.payload,
            max_retries: self.max_retries,
            rcre_time: now,
            trigger_at: self.trigger_at,
            finish_at: self.finish_at,
        }
    }
}

async fn create_job(State(state): State<AppState>, Json(mut input): Json<JobInput>) -> HttpResult<Created<Job>> {
    let now = Utc::now();
    input.coerce_trigger_at(now);
    input.validate()?;
    let job = input.into_job(now);
    state.jobs.create(&job).await?;
    Ok(Created(job))
}

#[derive(Debug, Deserialize)]
pub struct JobUpdate {
    pub job_id: String,
    pub user_id: String,
    pub job_type: String,
    pub cron_expr: String,
    pub priority: i32,
    pub payload: String,
    pub max_retries: u32,
    pub trigger_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
}

async fn update_job(State(state): State<AppState>, Json(input): Json<JobUpdate>) -> HttpResult<SuccessResponse<Job>> {
    if input.finish_at <= input.trigger_at {
        return Err(CoreError::invalid_schedule("finish_at must be strictly after trigger_at").into());
    }
    tempo_scheduler::cron::next_run_time(&input.cron_expr, input.trigger_at)?;

    let existing = state.jobs.get(&input.job_id).await?;
    let job = Job {
        job_id: input.job_id,
        user_id: input.user_id,
        job_type: input.job_type,
        cron_expr: input.cron_expr,
        priority: input.priority,
        payload: input.payload,
        max_retries: input.max_retries,
        rcre_time: existing.rcre_time,
        trigger_at: input.trigger_at,
        finish_at: input.finish_at,
    };
    state.jobs.update(&job).await?;
    Ok(SuccessResponse(job))
}

#[derive(Debug, Deserialize)]
pub struct ScriptUpload {
    pub filename: String,
    pub contents: String,
}

#[derive(Debug, Serialize)]
pub struct ScriptUploaded {
    pub path: String,
}

/// Writes an uploaded script under the configured scripts directory and
/// hands back the relative path a Job's `payload` field should reference.
async fn upload_script(
    State(state): State<AppState>,
    Json(upload): Json<ScriptUpload>,
) -> HttpResult<Created<ScriptUploaded>> {
    if upload.filename.contains("..") || upload.filename.contains('/') {
        return Err(HttpError::bad_request("filename must not contain path separators"));
    }

    let dir = Path::new(&state.config.server.scripts_dir);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| HttpError::internal_error(format!("failed to create scripts directory: {e}")))?;

    let path = dir.join(&upload.filename);
    tokio::fs::write(&path, upload.contents)
        .await
        .map_err(|e| HttpError::internal_error(format!("failed to write script: {e}")))?;

    Ok(Created(ScriptUploaded {
        path: upload.filename,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_input_rejects_finish_at_before_trigger_at() {
        let now = Utc::now();
        let input = JobInput {
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "*/5 * * * *".into(),
            priority: 50,
            payload: "a.py".into(),
            max_retries: 0,
            trigger_at: now,
            finish_at: now - chrono::Duration::hours(1),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn past_trigger_at_is_coerced_to_now() {
        let now = Utc::now();
        let mut input = JobInput {
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "*/5 * * * *".into(),
            priority: 50,
            payload: "a.py".into(),
            max_retries: 0,
            trigger_at: now - chrono::Duration::hours(1),
            finish_at: now + chrono::Duration::hours(1),
        };
        input.coerce_trigger_at(now);
        assert!(input.trigger_at >= now);
    }

    #[test]
    fn job_input_rejects_malformed_cron() {
        let now = Utc::now();
        let input = JobInput {
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "not a cron".into(),
            priority: 50,
            payload: "a.py".into(),
            max_retries: 0,
            trigger_at: now,
            finish_at: now + chrono::Duration::hours(1),
        };
        assert!(input.validate().is_err());
    }
}
