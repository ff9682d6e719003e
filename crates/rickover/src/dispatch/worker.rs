use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::backoff::acquire_backoff;
use crate::error::StoreError;
use crate::executor::Executor;
use crate::store::QueuedJobsRepo;

/// A long-running loop bound to one job type, sharing one `Executor`. Workers
/// are distinguishable by a per-pool monotonic id, used only for logging.
pub struct Worker {
    pub id: u64,
    pub job_type: String,
}

impl Worker {
    pub fn new(id: u64, job_type: String) -> Self {
        Self { id, job_type }
    }

    pub async fn run(
        &self,
        queued_jobs: QueuedJobsRepo,
        executor: Arc<dyn Executor>,
        mut quit_rx: mpsc::Receiver<()>,
    ) {
        let mut failed: u32 = 0;
        let mut wait = Duration::ZERO;

        loop {
            tokio::select! {
                _ = quit_rx.recv() => {
                    debug!(worker_id = self.id, job_type = %self.job_type, "worker observed quit signal");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match queued_jobs.acquire(&self.job_type).await {
                Ok(Some(job)) => {
                    failed = 0;
                    wait = Duration::ZERO;
                    let job_id = job.id;
                    if let Err(e) = executor.dispatch(job).await {
                        warn!(worker_id = self.id, job_id = %job_id, error = %e, "dispatch failed");
                    }
                }
                Ok(None) => {
                    failed += 1;
                    wait = acquire_backoff(failed);
                }
                // Unreachable with FOR UPDATE SKIP LOCKED acquisition; kept
                // so the dispatcher still behaves correctly against a
                // hypothetical Store backend that needs the fast-retry path.
                Err(StoreError::LockUnavailable) => {
                    failed = 0;
                    wait = Duration::ZERO;
                }
                Err(e) => {
                    warn!(worker_id = self.id, job_type = %self.job_type, error = %e, "acquire failed");
                    failed += 1;
                    wait = acquire_backoff(failed);
                }
            }
        }
    }
}
