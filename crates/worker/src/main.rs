use std::sync::Arc;
use std::time::Duration;

use rickover::callback::CallbackReducer;
use rickover::config::Config;
use rickover::db;
use rickover::dispatch::PoolManager;
use rickover::downstream::{DownstreamClient, DownstreamConfig};
use rickover::executor::{Executor, HttpExecutor, HttpExecutorConfig};
use rickover::reaper::StuckJobReaper;
use rickover::store::{ArchivedJobsRepo, JobTypesRepo, QueuedJobsRepo};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env()?;
    let downstream_url = cfg.require_downstream_url()?.to_string();

    let pool = db::make_pool(&cfg.database_url, cfg.worker_pool_size).await?;
    db::run_migrations(&pool).await?;

    let job_types = JobTypesRepo::new(pool.clone());
    let queued_jobs = QueuedJobsRepo::new(pool.clone());
    let archived_jobs = ArchivedJobsRepo::new(pool.clone());
    let callback = CallbackReducer::new(queued_jobs.clone(), archived_jobs.clone(), job_types.clone());

    let downstream = DownstreamClient::new(DownstreamConfig {
        base_url: downstream_url,
        auth_password: cfg.downstream_worker_auth.clone().unwrap_or_default(),
        ..Default::default()
    })?;

    let executor: Arc<dyn Executor> = Arc::new(HttpExecutor::new(
        downstream,
        HttpExecutorConfig {
            terminal_timeout: Duration::from_secs(cfg.executor_timeout_secs),
            ..Default::default()
        },
        queued_jobs.clone(),
        archived_jobs.clone(),
        callback.clone(),
    ));

    let max_initial_jitter = Duration::from_millis(cfg.max_initial_jitter_ms);
    let pools = PoolManager::start(&job_types, queued_jobs.clone(), executor, max_initial_jitter).await?;
    info!(pool_count = pools.len(), "dispatcher pools started");

    let reaper = StuckJobReaper::new(
        queued_jobs,
        callback,
        Duration::from_secs(cfg.reap_interval_secs),
        chrono::Duration::seconds(cfg.reap_older_than_secs),
    );
    let reaper_handle = tokio::spawn(async move { reaper.watch().await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, draining pools");
        }
        _ = reaper_handle => {
            info!("reaper task exited unexpectedly");
        }
    }

    PoolManager::shutdown(&pools, Duration::from_secs(cfg.shutdown_deadline_secs)).await;
    Ok(())
}
