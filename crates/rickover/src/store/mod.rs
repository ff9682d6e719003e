pub mod archived_jobs;
pub mod job_types;
pub mod queued_jobs;

pub use archived_jobs::ArchivedJobsRepo;
pub use job_types::JobTypesRepo;
pub use queued_jobs::QueuedJobsRepo;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::QueuedJob;

/// Thin facade bundling the three per-table repos plus `replay`, the one
/// operation that genuinely spans two tables. Components that only need one
/// table (e.g. the reaper only touches `queued_jobs`) hold the narrower repo
/// directly instead of the whole facade.
#[derive(Clone)]
pub struct Store {
    pub job_types: JobTypesRepo,
    pub queued_jobs: QueuedJobsRepo,
    pub archived_jobs: ArchivedJobsRepo,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            job_types: JobTypesRepo::new(pool.clone()),
            queued_jobs: QueuedJobsRepo::new(pool.clone()),
            archived_jobs: ArchivedJobsRepo::new(pool),
        }
    }

    /// Restored from the original system, dropped by the outer distillation
    /// but load-bearing for the replay HTTP route. Never carries forward the
    /// archived job's `run_after` (see design notes): the replayed job is
    /// eligible immediately unless the caller overrides it.
    pub async fn replay(
        &self,
        archived_id: Uuid,
        override_name: Option<&str>,
        override_run_after: Option<chrono::DateTime<Utc>>,
    ) -> Result<QueuedJob, StoreError> {
        if self.queued_jobs.get(archived_id).await.is_ok() {
            return Err(StoreError::InvalidArgument(
                "id is currently queued, not archived".into(),
            ));
        }

        let archived = self.archived_jobs.get_archived(archived_id).await?;
        let name = override_name.unwrap_or(&archived.name);
        let run_after = override_run_after.unwrap_or_else(Utc::now);
        let new_id = Uuid::new_v4();
        let data_json = archived.data.to_string();

        self.queued_jobs
            .enqueue(new_id, name, run_after, archived.expires_at, &data_json)
            .await
    }
}
