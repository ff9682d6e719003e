use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::dispatch::backoff::startup_jitter;
use crate::dispatch::worker::Worker;
use crate::error::StoreError;
use crate::executor::Executor;
use crate::store::{JobTypesRepo, QueuedJobsRepo};

struct WorkerHandle {
    id: u64,
    quit_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

/// One pool per job type. Holds an in-process mutex protecting the worker
/// slice and a shutdown flag that rejects further `add_worker` calls once set.
pub struct Pool {
    job_type: String,
    workers: Mutex<Vec<WorkerHandle>>,
    shutdown: AtomicBool,
    next_id: AtomicU64,
}

impl Pool {
    pub fn new(job_type: String) -> Self {
        Self {
            job_type,
            workers: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    pub async fn add_worker(
        &self,
        queued_jobs: QueuedJobsRepo,
        executor: Arc<dyn Executor>,
        max_initial_jitter: Duration,
    ) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidArgument(
                "pool is shutting down".into(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (quit_tx, quit_rx) = mpsc::channel(1);
        let worker = Worker::new(id, self.job_type.clone());
        let delay = startup_jitter(max_initial_jitter);

        let join = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            worker.run(queued_jobs, executor, quit_rx).await;
        });

        self.workers
            .lock()
            .await
            .push(WorkerHandle { id, quit_tx, join });
        Ok(())
    }

    pub async fn remove_worker(&self) {
        let mut workers = self.workers.lock().await;
        if let Some(handle) = workers.pop() {
            let _ = handle.quit_tx.send(()).await;
        }
    }

    async fn shutdown(&self, deadline: Duration) {
        self.shutdown.store(true, Ordering::SeqCst);
        let handles = {
            let mut workers = self.workers.lock().await;
            std::mem::take(&mut *workers)
        };

        for handle in &handles {
            let _ = handle.quit_tx.send(()).await;
        }

        let joins = handles.into_iter().map(|h| h.join);
        let drain = futures_join_all(joins);
        if tokio::time::timeout(deadline, drain).await.is_err() {
            tracing::warn!(job_type = %self.job_type, "pool shutdown deadline exceeded");
        }
    }
}

async fn futures_join_all(handles: impl IntoIterator<Item = JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

/// Builds one `Pool` per registered `JobType`, sized to the type's
/// `concurrency`, and supervises graceful shutdown across all of them.
pub struct PoolManager;

impl PoolManager {
    pub async fn start(
        job_types: &JobTypesRepo,
        queued_jobs: QueuedJobsRepo,
        executor: Arc<dyn Executor>,
        max_initial_jitter: Duration,
    ) -> Result<Vec<Arc<Pool>>, StoreError> {
        let types = job_types.get_all().await?;
        let mut pools = Vec::with_capacity(types.len());

        for job_type in types {
            let pool = Arc::new(Pool::new(job_type.name.clone()));
            for _ in 0..job_type.concurrency {
                pool.add_worker(queued_jobs.clone(), executor.clone(), max_initial_jitter)
                    .await?;
            }
            info!(job_type = %job_type.name, concurrency = job_type.concurrency, "pool started");
            pools.push(pool);
        }

        Ok(pools)
    }

    /// Shuts down every pool concurrently: each pool's drain runs on its own
    /// spawned task so one slow pool does not delay signaling the others.
    pub async fn shutdown(pools: &[Arc<Pool>], deadline: Duration) {
        let joins: Vec<_> = pools
            .iter()
            .cloned()
            .map(|pool| tokio::spawn(async move { pool.shutdown(deadline).await }))
            .collect();

        for join in joins {
            let _ = join.await;
        }
    }
}
