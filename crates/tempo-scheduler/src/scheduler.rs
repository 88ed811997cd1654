//! Owns the Job-to-Schedule projection: scans the Job store, evaluates each
//! Job's cron expression against its trigger/finish window, and upserts the
//! resulting `Schedule` row.

use chrono::Utc;
use tempo_core::error::Result;
use tempo_core::shutdown::{has_fired, ShutdownReceiver};
use tempo_core::AppConfig;
use tempo_store::{JobRepository, ScheduleRepository};

use crate::cron;

/// Scans Jobs in pages and keeps their Schedule projections current.
pub struct Scheduler {
    jobs: JobRepository,
    schedules: ScheduleRepository,
    scan_interval: std::time::Duration,
    page_size: i64,
}

impl Scheduler {
    pub fn new(jobs: JobRepository, schedules: ScheduleRepository, config: &AppConfig) -> Self {
        Self {
            jobs,
            schedules,
            scan_interval: config.scheduler.scan_interval(),
            page_size: config.scheduler.page_size as i64,
        }
    }

    /// Runs the scan loop until `shutdown` fires. Each iteration completes
    /// before the shutdown signal is re-checked, so in-flight projection
    /// work is never abandoned mid-page.
    pub async fn run(&self, mut shutdown: ShutdownReceiver) {
        tracing::info!("scheduler scan loop started");
        let mut offset: i64 = 0;

        loop {
            if has_fired(&mut shutdown) {
                break;
            }

            match self.scan_page(offset).await {
                Ok(fetched) => {
                    offset = if fetched < self.page_size {
                        0
                    } else {
                        offset + self.page_size
                    };
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler page read failed, retrying next cycle");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.scan_interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("scheduler scan loop stopped");
    }

    /// Reads one page of Jobs and projects each eligible one. Returns the
    /// number of Jobs read, so the caller can detect page exhaustion and
    /// reset its cursor rather than paging past the end of the table
    /// forever.
    async fn scan_page(&self, offset: i64) -> Result<i64> {
        let jobs = self.jobs.list(self.page_size, offset).await?;
        let fetched = jobs.len() as i64;
        let now = Utc::now();

        for job in jobs {
            if job.trigger_at > now {
                continue;
            }
            if job.finish_at <= now {
                continue;
            }

            let next_run_time = match cron::next_run_time(&job.cron_expr, now) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(job_id = %job.job_id, error = %e, "cron-eval: skipping job");
                    continue;
                }
            };

            let schedule = tempo_core::model::Schedule::project(&job, next_run_time, now);
            if let Err(e) = self.schedules.upsert(&schedule).await {
                tracing::error!(job_id = %job.job_id, error = %e, "failed to upsert schedule");
            }
        }

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempo_core::model::Job;

    fn sample_job(id: &str, trigger_offset: Duration, finish_offset: Duration) -> Job {
        let now = Utc::now();
        Job {
            job_id: id.into(),
            user_id: "u1".into(),
            job_type: "shell".into(),
            cron_expr: "*/5 * * * *".into(),
            priority: 50,
            payload: "scripts/a.py".into(),
            max_retries: 3,
            rcre_time: now,
            trigger_at: now + trigger_offset,
            finish_at: now + finish_offset,
        }
    }

    #[test]
    fn window_closed_job_is_skipped() {
        let job = sample_job("closed", Duration::minutes(-10), Duration::seconds(-1));
        let now = Utc::now();
        assert!(job.finish_at <= now);
    }

    #[test]
    fn not_yet_eligible_job_is_skipped() {
        let job = sample_job("future", Duration::hours(1), Duration::hours(2));
        let now = Utc::now();
        assert!(job.trigger_at > now);
    }

    #[test]
    fn projection_produces_a_schedule_with_a_future_next_run_time() {
        let job = sample_job("eligible", Duration::minutes(-1), Duration::hours(1));
        let now = Utc::now();
        let next_run = cron::next_run_time(&job.cron_expr, now).unwrap();
        let schedule = tempo_core::model::Schedule::project(&job, next_run, now);
        assert_eq!(schedule.job_id, job.job_id);
        assert!(schedule.next_run_time > now);
    }
}
