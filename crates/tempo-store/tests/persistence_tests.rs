//! Integration tests for the cache-through repository contract that don't
//! require a live Postgres instance: key-prefix behavior, TTL assignment by
//! entity kind. Tests that exercise the primary store (`JobRepository`,
//! `ScheduleRepository`) against real SQL run separately against a
//! provisioned database and are not included here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tempo_cache::backend::MemoryBackend;
use tempo_cache::{keys, Cache};
use tempo_core::model::{Job, Schedule};

fn memory_cache() -> Cache {
    Cache::new(Arc::new(MemoryBackend::new(1000)))
}

fn sample_job(job_id: &str) -> Job {
    let now = Utc::now();
    Job {
        job_id: job_id.to_string(),
        user_id: "user-1".to_string(),
        job_type: "shell".to_string(),
        cron_expr: "*/5 * * * *".to_string(),
        priority: 50,
        payload: "scripts/report.py".to_string(),
        max_retries: 3,
        rcre_time: now,
        trigger_at: now - ChronoDuration::minutes(1),
        finish_at: now + ChronoDuration::hours(1),
    }
}

#[tokio::test]
async fn job_cache_entry_has_no_ttl() {
    let cache = memory_cache();
    let job = sample_job("job-1");

    cache.set(keys::job(&job.job_id), &job, None).await.unwrap();

    let fetched: Job = cache.get(keys::job("job-1")).await.unwrap().unwrap();
    assert_eq!(fetched.job_id, "job-1");
    assert_eq!(cache.ttl(keys::job("job-1")).await.unwrap(), None);
}

#[tokio::test]
async fn schedule_cache_entry_carries_a_ttl_argument_distinct_from_job() {
    let cache = memory_cache();
    let job = sample_job("job-2");
    let schedule = Schedule::project(&job, Utc::now() + ChronoDuration::minutes(5), Utc::now());

    cache
        .set(keys::schedule(&schedule.job_id), &schedule, Some(Duration::from_secs(3600)))
        .await
        .unwrap();

    let fetched: Schedule = cache.get(keys::schedule("job-2")).await.unwrap().unwrap();
    assert_eq!(fetched.job_id, "job-2");
}

#[tokio::test]
async fn deleting_a_job_removes_it_from_cache_for_subsequent_reads() {
    let cache = memory_cache();
    let job = sample_job("job-3");
    cache.set(keys::job(&job.job_id), &job, None).await.unwrap();
    assert!(cache.exists(keys::job("job-3")).await.unwrap());

    cache.delete(keys::job("job-3")).await.unwrap();

    let fetched: Option<Job> = cache.get(keys::job("job-3")).await.unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn job_and_schedule_keys_for_the_same_id_read_independently() {
    let cache = memory_cache();
    let job = sample_job("job-4");
    let schedule = Schedule::project(&job, Utc::now() + ChronoDuration::minutes(5), Utc::now());

    cache.set(keys::job(&job.job_id), &job, None).await.unwrap();
    cache
        .set(keys::schedule(&schedule.job_id), &schedule, None)
        .await
        .unwrap();

    cache.delete(keys::job("job-4")).await.unwrap();

    // Deleting the Job cache entry must not disturb the Schedule entry
    // under the same id.
    let fetched_schedule: Schedule = cache.get(keys::schedule("job-4")).await.unwrap().unwrap();
    assert_eq!(fetched_schedule.job_id, "job-4");
}
