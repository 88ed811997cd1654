//! Cache-through repositories for Job and Schedule, plus a plain
//! write-only repository for JobExecution.
//!
//! `GetJob`/`GetSchedule` check the cache first, fall back to the primary
//! store on a miss, and populate the cache before returning. Writes go to
//! the primary store first, then the cache; a cache-write failure fails the
//! whole operation, since the cache is treated as authoritative for reads.
//! Deletes remove from the primary store first, then invalidate the cache,
//! so a successful delete can never leave a stale cache hit behind.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tempo_cache::{keys, Cache};
use tempo_core::error::{Error, Result};
use tempo_core::model::{Job, JobExecution, Schedule};

use crate::models::{JobExecutionRow, JobRow, ScheduleRow};

const SCHEDULE_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Cache-through repository for Job rows.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
    cache: Arc<Cache>,
}

impl JobRepository {
    pub fn new(pool: PgPool, cache: Arc<Cache>) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, job: &Job) -> Result<()> {
        if self.cache.exists(keys::job(&job.job_id)).await? {
            return Err(Error::duplicate("Job", job.job_id.clone()));
        }

        let row: JobRow = job.clone().into();
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, user_id, job_type, cron_expr, priority, payload, max_retries, rcre_time, trigger_at, finish_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&row.job_id)
        .bind(&row.user_id)
        .bind(&row.job_type)
        .bind(&row.cron_expr)
        .bind(row.priority)
        .bind(&row.payload)
        .bind(row.max_retries)
        .bind(row.rcre_time)
        .bind(row.trigger_at)
        .bind(row.finish_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("failed to insert job", e))?;

        self.cache.set(keys::job(&job.job_id), job, None).await?;
        Ok(())
    }

    pub async fn update(&self, job: &Job) -> Result<()> {
        let row: JobRow = job.clone().into();
        let result = sqlx::query(
            r#"
            UPDATE jobs SET user_id = $2, job_type = $3, cron_expr = $4, priority = $5,
                payload = $6, max_retries = $7, trigger_at = $8, finish_at = $9
            WHERE job_id = $1
            "#,
        )
        .bind(&row.job_id)
        .bind(&row.user_id)
        .bind(&row.job_type)
        .bind(&row.cron_expr)
        .bind(row.priority)
        .bind(&row.payload)
        .bind(row.max_retries)
        .bind(row.trigger_at)
        .bind(row.finish_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("failed to update job", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Job", job.job_id.clone()));
        }

        self.cache.set(keys::job(&job.job_id), job, None).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> Result<Job> {
        if let Some(job) = self.cache.get::<Job>(keys::job(job_id)).await? {
            return Ok(job);
        }

        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to fetch job", e))?;

        match row {
            Some(row) => {
                let job: Job = row.into();
                self.cache.set(keys::job(job_id), &job, None).await?;
                Ok(job)
            }
            None => Err(Error::not_found("Job", job_id)),
        }
    }

    pub async fn delete(&self, job_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to delete job", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Job", job_id));
        }

        self.cache.delete(keys::job(job_id)).await?;
        Ok(())
    }

    /// Page through Jobs ordered by primary key; used by the Scheduler's
    /// scan loop. `limit`/`offset` pages until exhaustion, at which point
    /// the caller resets `offset` to zero rather than continuing to grow it
    /// unboundedly.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs ORDER BY job_id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to list jobs", e))?;

        Ok(rows.into_iter().map(Job::from).collect())
    }
}

/// Cache-through repository for Schedule rows.
#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
    cache: Arc<Cache>,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool, cache: Arc<Cache>) -> Self {
        Self { pool, cache }
    }

    /// Insert or refresh the Schedule projection for a Job.
    pub async fn upsert(&self, schedule: &Schedule) -> Result<()> {
        let row: ScheduleRow = schedule.clone().into();
        sqlx::query(
            r#"
            INSERT INTO schedules (job_id, priority, payload, max_retries, retry_count, exec_time, duration_ms, rcre_time, next_run_time, last_run_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (job_id) DO UPDATE SET
                priority = EXCLUDED.priority,
                payload = EXCLUDED.payload,
                max_retries = EXCLUDED.max_retries,
                next_run_time = EXCLUDED.next_run_time
            "#,
        )
        .bind(&row.job_id)
        .bind(row.priority)
        .bind(&row.payload)
        .bind(row.max_retries)
        .bind(row.retry_count)
        .bind(row.exec_time)
        .bind(row.duration_ms)
        .bind(row.rcre_time)
        .bind(row.next_run_time)
        .bind(row.last_run_time)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("failed to upsert schedule", e))?;

        self.cache
            .set(keys::schedule(&schedule.job_id), schedule, Some(SCHEDULE_CACHE_TTL))
            .await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> Result<Schedule> {
        if let Some(schedule) = self.cache.get::<Schedule>(keys::schedule(job_id)).await? {
            return Ok(schedule);
        }

        let row: Option<ScheduleRow> = sqlx::query_as("SELECT * FROM schedules WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to fetch schedule", e))?;

        match row {
            Some(row) => {
                let schedule: Schedule = row.into();
                self.cache
                    .set(keys::schedule(job_id), &schedule, Some(SCHEDULE_CACHE_TTL))
                    .await?;
                Ok(schedule)
            }
            None => Err(Error::not_found("Schedule", job_id)),
        }
    }

    pub async fn delete(&self, job_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM schedules WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to delete schedule", e))?;

        self.cache.delete(keys::schedule(job_id)).await?;
        Ok(())
    }

    /// Fetch due Schedules: `next_run_time <= now`. Called by the Executor
    /// at each poll interval.
    pub async fn list_due(&self, now: chrono::DateTime<chrono::Utc>) -> Result<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> =
            sqlx::query_as("SELECT * FROM schedules WHERE next_run_time <= $1")
                .bind(now)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::database_with_source("failed to fetch due schedules", e))?;

        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    /// Record a dispatch: advances `last_run_time`. Does not touch
    /// `next_run_time`, which only the Scheduler's projection updates.
    pub async fn mark_dispatched(&self, job_id: &str, at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        sqlx::query("UPDATE schedules SET last_run_time = $2 WHERE job_id = $1")
            .bind(job_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("failed to record dispatch", e))?;

        self.cache.delete(keys::schedule(job_id)).await?;
        Ok(())
    }
}

/// Write-only repository for JobExecution records. There is no cache layer
/// here: executions are written once and never re-read by the dispatch
/// core.
#[derive(Clone)]
pub struct JobExecutionRepository {
    pool: PgPool,
}

impl JobExecutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, execution: &JobExecution) -> Result<()> {
        let row: JobExecutionRow = execution.clone().into();
        sqlx::query(
            r#"
            INSERT INTO job_executions (process_id, job_id, worker_id, start_time, end_time, status, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&row.process_id)
        .bind(&row.job_id)
        .bind(&row.worker_id)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(&row.status)
        .bind(&row.error)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("failed to record job execution", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_cache::backend::MemoryBackend;

    fn memory_cache() -> Arc<Cache> {
        Arc::new(Cache::new(Arc::new(MemoryBackend::new(1000))))
    }

    #[tokio::test]
    async fn job_and_schedule_caches_never_collide_on_the_same_id() {
        let cache = memory_cache();
        let now = chrono::Utc::now();
        let job = Job {
            job_id: "shared-id".into(),
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "*/5 * * * *".into(),
            priority: 50,
            payload: "scripts/a.py".into(),
            max_retries: 3,
            rcre_time: now,
            trigger_at: now,
            finish_at: now + chrono::Duration::hours(1),
        };
        cache.set(keys::job(&job.job_id), &job, None).await.unwrap();

        let schedule = Schedule::project(&job, now + chrono::Duration::minutes(5), now);
        cache
            .set(keys::schedule(&schedule.job_id), &schedule, None)
            .await
            .unwrap();

        let cached_job: Job = cache.get(keys::job("shared-id")).await.unwrap().unwrap();
        let cached_schedule: Schedule = cache.get(keys::schedule("shared-id")).await.unwrap().unwrap();
        assert_eq!(cached_job.job_id, "shared-id");
        assert_eq!(cached_schedule.job_id, "shared-id");
    }
}
