//! tempo Server Entry Point
//!
//! Boots the admission API and the cron-to-dispatch pipeline: connects the
//! primary store, runs pending migrations, builds the cache backend, and
//! spawns the Scheduler, Executor and Worker Pool alongside the HTTP
//! server. All four share one `ShutdownController` so a single signal
//! drains every task.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tempo_cache::{backend::MemoryBackend, Cache};
use tempo_core::shutdown::ShutdownController;
use tempo_core::AppConfig;
use tempo_store::{initial_migrations, DatabasePool, JobExecutionRepository, JobRepository, Migrator, ScheduleRepository};

use tempo_server::state::AppState;
use tempo_server::{background, App};

#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(author, version, about = "Distributed cron-style job scheduler", long_about = None)]
struct Cli {
    /// Port to run the admission API on (overrides config and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind the admission API to
    #[arg(long)]
    host: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_config_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(PathBuf::from(path));
    }
    env::var("TEMPO_CONFIG").ok().map(PathBuf::from)
}

async fn run_app(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = get_config_path(&cli);
    let mut config = AppConfig::load(config_path.as_ref().and_then(|p| p.to_str()))?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    init_tracing(&config.logging.filter);
    info!(address = %config.server.address(), "tempo starting");

    let database = DatabasePool::connect(&config.database).await?;
    Migrator::new()
        .with_migrations(initial_migrations())
        .run(database.inner())
        .await?;

    let cache = Arc::new(Cache::new(Arc::new(MemoryBackend::new(10_000))));

    std::fs::create_dir_all(&config.server.scripts_dir)?;

    let jobs = JobRepository::new(database.inner().clone(), cache.clone());
    let schedules = ScheduleRepository::new(database.inner().clone(), cache.clone());
    let executions = JobExecutionRepository::new(database.inner().clone());

    let shutdown = ShutdownController::new(config.server.shutdown_timeout());
    let config = Arc::new(config);

    let pipeline = background::init_background_tasks(&config, jobs.clone(), schedules.clone(), executions.clone(), &shutdown);

    let state = AppState::new(config, cache, jobs, schedules, executions, shutdown.clone());
    let app = App::new(state, shutdown);

    app.run_from_config().await?;

    let _ = tokio::join!(pipeline.scheduler, pipeline.executor, pipeline.worker_pool);

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_app(cli).await {
        error!(error = %e, "tempo exited with a fatal error");
        std::process::exit(1);
    }
}
