//! Schema-check/create phase run once at startup.

use sqlx::PgPool;
use tempo_core::error::{Error, Result};

/// A single migration: a version, a name, and the DDL to apply.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Applies pending migrations in version order, tracking applied versions
/// in a `_migrations` bookkeeping table.
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new() -> Self {
        Self { migrations: Vec::new() }
    }

    pub fn add(&mut self, migration: Migration) -> &mut Self {
        self.migrations.push(migration);
        self.migrations.sort_by_key(|m| m.version);
        self
    }

    pub fn with_migrations(mut self, migrations: Vec<Migration>) -> Self {
        for m in migrations {
            self.add(m);
        }
        self
    }

    pub async fn run(&self, pool: &PgPool) -> Result<Vec<i64>> {
        self.ensure_migrations_table(pool).await?;
        let applied = self.applied_versions(pool).await?;

        let mut newly_applied = Vec::new();
        for migration in &self.migrations {
            if !applied.contains(&migration.version) {
                self.apply(pool, migration).await?;
                newly_applied.push(migration.version);
            }
        }

        if newly_applied.is_empty() {
            tracing::info!("no pending migrations");
        } else {
            tracing::info!(count = newly_applied.len(), "applied migrations");
        }
        Ok(newly_applied)
    }

    async fn ensure_migrations_table(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::database_with_source("failed to create migrations table", e))?;
        Ok(())
    }

    async fn applied_versions(&self, pool: &PgPool) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::database_with_source("failed to read applied migrations", e))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    async fn apply(&self, pool: &PgPool, migration: &Migration) -> Result<()> {
        tracing::info!(version = migration.version, name = %migration.name, "applying migration");

        sqlx::query(&migration.sql)
            .execute(pool)
            .await
            .map_err(|e| Error::database_with_source(format!("migration {} failed", migration.version), e))?;

        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.name)
            .execute(pool)
            .await
            .map_err(|e| Error::database_with_source("failed to record migration", e))?;

        Ok(())
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

/// The four core tables, per the persisted-state layout: Job, Schedule,
/// JobExecution, Worker.
pub fn initial_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_jobs_table",
            r#"
            CREATE TABLE jobs (
                job_id VARCHAR(64) PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                job_type VARCHAR(255) NOT NULL,
                cron_expr VARCHAR(100) NOT NULL,
                priority INT NOT NULL,
                payload TEXT NOT NULL,
                max_retries INT NOT NULL DEFAULT 0,
                rcre_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                trigger_at TIMESTAMPTZ NOT NULL,
                finish_at TIMESTAMPTZ NOT NULL
            );

            CREATE INDEX idx_jobs_window ON jobs(trigger_at, finish_at);
            "#,
        ),
        Migration::new(
            2,
            "create_schedules_table",
            r#"
            CREATE TABLE schedules (
                job_id VARCHAR(64) PRIMARY KEY REFERENCES jobs(job_id) ON DELETE CASCADE,
                priority INT NOT NULL,
                payload TEXT NOT NULL,
                max_retries INT NOT NULL DEFAULT 0,
                retry_count INT NOT NULL DEFAULT 0,
                exec_time TIMESTAMPTZ,
                duration_ms BIGINT,
                rcre_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                next_run_time TIMESTAMPTZ NOT NULL,
                last_run_time TIMESTAMPTZ
            );

            CREATE INDEX idx_schedules_due ON schedules(next_run_time);
            "#,
        ),
        Migration::new(
            3,
            "create_job_executions_table",
            r#"
            CREATE TABLE job_executions (
                process_id VARCHAR(64) PRIMARY KEY,
                job_id VARCHAR(64) NOT NULL,
                worker_id VARCHAR(36) NOT NULL,
                start_time TIMESTAMPTZ NOT NULL,
                end_time TIMESTAMPTZ NOT NULL,
                status VARCHAR(20) NOT NULL,
                error TEXT
            );

            CREATE INDEX idx_job_executions_job ON job_executions(job_id);
            CREATE INDEX idx_job_executions_status ON job_executions(status);
            "#,
        ),
        Migration::new(
            4,
            "create_workers_table",
            r#"
            CREATE TABLE workers (
                worker_id VARCHAR(36) PRIMARY KEY,
                lane VARCHAR(10) NOT NULL,
                checked_out_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_migrations_are_ordered_and_cover_all_four_tables() {
        let migrations = initial_migrations();
        for i in 1..migrations.len() {
            assert!(migrations[i].version > migrations[i - 1].version);
        }
        let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"create_jobs_table"));
        assert!(names.contains(&"create_schedules_table"));
        assert!(names.contains(&"create_job_executions_table"));
        assert!(names.contains(&"create_workers_table"));
    }

    #[test]
    fn migrator_keeps_migrations_sorted_regardless_of_add_order() {
        let mut migrator = Migrator::new();
        migrator.add(Migration::new(2, "second", "SELECT 2"));
        migrator.add(Migration::new(1, "first", "SELECT 1"));
        assert_eq!(migrator.migrations[0].version, 1);
        assert_eq!(migrator.migrations[1].version, 2);
    }
}
