use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::callback::{archive_then_delete, CallbackReducer, CallbackStatus};
use crate::downstream::{DispatchResponse, DownstreamClient};
use crate::error::StoreError;
use crate::executor::Executor;
use crate::model::{ArchivedStatus, QueuedJob};
use crate::store::{ArchivedJobsRepo, QueuedJobsRepo};

#[derive(Debug, Clone)]
pub struct HttpExecutorConfig {
    /// Overall wait-for-terminal-state timeout. Default 5 minutes.
    pub terminal_timeout: StdDuration,
    /// Base delay between 503 retries; actual delay is `factor * 2^i` ms.
    pub unavailable_sleep_factor_ms: u64,
}

impl Default for HttpExecutorConfig {
    fn default() -> Self {
        Self {
            terminal_timeout: StdDuration::from_secs(300),
            unavailable_sleep_factor_ms: 500,
        }
    }
}

/// Drives one acquired job to a terminal state: checks expiry, dispatches
/// through the downstream client with bounded 503 retry, then polls the
/// Store until the callback reducer (invoked by the downstream service, or
/// by this executor itself on timeout) has moved the job out of its
/// original attempts count.
pub struct HttpExecutor {
    downstream: DownstreamClient,
    config: HttpExecutorConfig,
    queued_jobs: QueuedJobsRepo,
    archived_jobs: ArchivedJobsRepo,
    callback: CallbackReducer,
}

impl HttpExecutor {
    pub fn new(
        downstream: DownstreamClient,
        config: HttpExecutorConfig,
        queued_jobs: QueuedJobsRepo,
        archived_jobs: ArchivedJobsRepo,
        callback: CallbackReducer,
    ) -> Self {
        Self {
            downstream,
            config,
            queued_jobs,
            archived_jobs,
            callback,
        }
    }

    async fn post_with_retry(&self, job: &QueuedJob) -> PostOutcome {
        for attempt in 0..3u32 {
            let result = self
                .downstream
                .dispatch(&job.name, job.id, &job.data, job.attempts)
                .await;

            match result {
                Ok(DispatchResponse::Unavailable) => {
                    let delay = self.config.unavailable_sleep_factor_ms * (1u64 << attempt);
                    warn!(job_id = %job.id, attempt, delay, "downstream returned 503, retrying");
                    tokio::time::sleep(StdDuration::from_millis(delay)).await;
                    continue;
                }
                Ok(DispatchResponse::Accepted) => return PostOutcome::Delivered,
                Ok(DispatchResponse::Rejected(status)) => return PostOutcome::Rejected(status),
                Err(e) if e.is_timeout() => return PostOutcome::Timeout,
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "downstream request failed, not a timeout");
                    return PostOutcome::ConnectError;
                }
            }
        }
        PostOutcome::Delivered
    }
}

enum PostOutcome {
    Delivered,
    Timeout,
    Rejected(reqwest::StatusCode),
    ConnectError,
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn dispatch(&self, job: QueuedJob) -> anyhow::Result<()> {
        if let Some(expires_at) = job.expires_at {
            if expires_at <= Utc::now() {
                debug!(job_id = %job.id, "job expired before dispatch");
                archive_then_delete(
                    &self.archived_jobs,
                    &self.queued_jobs,
                    job.id,
                    &job.name,
                    ArchivedStatus::Expired.as_str(),
                    job.attempts,
                )
                .await?;
                return Ok(());
            }
        }

        match self.post_with_retry(&job).await {
            PostOutcome::Timeout => {
                debug!(job_id = %job.id, "downstream request timed out, treating as likely delivered");
            }
            PostOutcome::Delivered => {}
            PostOutcome::Rejected(status) => {
                warn!(job_id = %job.id, %status, "downstream rejected dispatch, archiving as failed");
                self.callback
                    .handle(job.id, &job.name, CallbackStatus::Failed, job.attempts, true)
                    .await?;
                return Ok(());
            }
            PostOutcome::ConnectError => {
                warn!(job_id = %job.id, "downstream unreachable, archiving as failed");
                self.callback
                    .handle(job.id, &job.name, CallbackStatus::Failed, job.attempts, true)
                    .await?;
                return Ok(());
            }
        }

        self.wait_for_terminal(job).await
    }
}

impl HttpExecutor {
    async fn wait_for_terminal(&self, original: QueuedJob) -> anyhow::Result<()> {
        let started = Instant::now();

        loop {
            match self.queued_jobs.get(original.id).await {
                Err(StoreError::NotFound) => return Ok(()),
                Ok(current) if current.attempts < original.attempts => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() >= self.config.terminal_timeout {
                warn!(job_id = %original.id, "timed out waiting for terminal state, archiving as failed");
                self.callback
                    .handle(
                        original.id,
                        &original.name,
                        CallbackStatus::Failed,
                        original.attempts,
                        true,
                    )
                    .await?;
                return Ok(());
            }
        }
    }
}
