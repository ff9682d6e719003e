//! Periodically finds `in-progress` rows whose `updated_at` is stale enough
//! to indicate the worker holding them has died, and drives them through the
//! callback reducer as failed.

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::callback::{CallbackReducer, CallbackStatus};
use crate::store::QueuedJobsRepo;

pub const DEFAULT_STUCK_JOB_LIMIT: i64 = 100;

pub struct StuckJobReaper {
    queued_jobs: QueuedJobsRepo,
    callback: CallbackReducer,
    interval: std::time::Duration,
    older_than: Duration,
    limit: i64,
}

impl StuckJobReaper {
    pub fn new(
        queued_jobs: QueuedJobsRepo,
        callback: CallbackReducer,
        interval: std::time::Duration,
        older_than: Duration,
    ) -> Self {
        Self {
            queued_jobs,
            callback,
            interval,
            older_than,
            limit: DEFAULT_STUCK_JOB_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Runs forever, sweeping on every tick. Intended to be spawned as its
    /// own task; errors from an individual sweep are logged, not propagated,
    /// since a sweep racing the normal dispatch path is expected.
    pub async fn watch(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(count) if count > 0 => info!(count, "reaped stuck jobs"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "stuck job sweep failed"),
            }
        }
    }

    /// `older_than < 0` is accepted and handled via the documented two-branch
    /// computation; both branches are numerically `now - |older_than|`. Kept
    /// for fidelity with historical test callers — production callers should
    /// only ever pass a non-negative duration.
    pub async fn sweep(&self) -> anyhow::Result<usize> {
        let now = Utc::now();
        let threshold = compute_threshold(now, self.older_than);

        let stuck = self
            .queued_jobs
            .get_old_in_progress(threshold, self.limit)
            .await?;

        let mut reaped = 0;
        for job in stuck {
            match self
                .callback
                .handle(job.id, &job.name, CallbackStatus::Failed, job.attempts, true)
                .await
            {
                Ok(()) => reaped += 1,
                Err(e) => error!(id = %job.id, name = %job.name, error = %e, "failed to reap stuck job"),
            }
        }

        Ok(reaped)
    }
}

fn compute_threshold(now: DateTime<Utc>, older_than: Duration) -> DateTime<Utc> {
    if older_than >= Duration::zero() {
        now - older_than
    } else {
        now + older_than
    }
}
