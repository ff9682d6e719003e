//! The status callback reducer: the single function that maps a downstream
//! terminal report (or a reaper-manufactured one) onto a Store transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{ArchivedStatus, DeliveryStrategy};
use crate::store::{ArchivedJobsRepo, JobTypesRepo, QueuedJobsRepo};

/// The two terminal statuses a downstream callback is allowed to report.
/// `expired` is archived directly by the executor via [`archive_then_delete`]
/// rather than through `handle`, since it is never something a downstream
/// service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Succeeded,
    Failed,
}

#[derive(Clone)]
pub struct CallbackReducer {
    queued_jobs: QueuedJobsRepo,
    archived_jobs: ArchivedJobsRepo,
    job_types: JobTypesRepo,
}

impl CallbackReducer {
    pub fn new(
        queued_jobs: QueuedJobsRepo,
        archived_jobs: ArchivedJobsRepo,
        job_types: JobTypesRepo,
    ) -> Self {
        Self {
            queued_jobs,
            archived_jobs,
            job_types,
        }
    }

    pub async fn handle(
        &self,
        id: Uuid,
        name: &str,
        status: CallbackStatus,
        attempt: i16,
        retryable: bool,
    ) -> Result<(), StoreError> {
        match status {
            CallbackStatus::Succeeded => {
                debug!(%id, name, "archiving succeeded job");
                archive_then_delete(
                    &self.archived_jobs,
                    &self.queued_jobs,
                    id,
                    name,
                    ArchivedStatus::Succeeded.as_str(),
                    attempt,
                )
                .await
            }
            CallbackStatus::Failed => self.handle_failed(id, name, attempt, retryable).await,
        }
    }

    async fn handle_failed(
        &self,
        id: Uuid,
        name: &str,
        attempt: i16,
        retryable: bool,
    ) -> Result<(), StoreError> {
        let remaining = attempt - 1;

        if !retryable || remaining == 0 {
            debug!(%id, name, remaining, "archiving failed job, no retry");
            return archive_then_delete(
                &self.archived_jobs,
                &self.queued_jobs,
                id,
                name,
                ArchivedStatus::Failed.as_str(),
                remaining,
            )
            .await;
        }

        let job_type = self.job_types.get(name).await?;
        if DeliveryStrategy::parse(&job_type.delivery_strategy) == Some(DeliveryStrategy::AtMostOnce)
        {
            debug!(%id, name, "at_most_once type, archiving without retry");
            return archive_then_delete(
                &self.archived_jobs,
                &self.queued_jobs,
                id,
                name,
                ArchivedStatus::Failed.as_str(),
                remaining,
            )
            .await;
        }

        let delay = retry_delay(job_type.attempts, remaining);
        let run_after = Utc::now() + delay;
        debug!(%id, name, remaining, delay_secs = delay.num_seconds(), "scheduling retry");
        self.queued_jobs
            .decrement(id, attempt, run_after)
            .await
            .map(|_| ())
    }
}

/// `2^(total_attempts - remaining_attempts)` seconds, capped so the exponent
/// never overflows a representable duration for large attempt budgets.
fn retry_delay(total_attempts: i16, remaining_attempts: i16) -> chrono::Duration {
    let burned = (total_attempts - remaining_attempts).max(0) as u32;
    let capped = burned.min(20);
    chrono::Duration::seconds(1i64 << capped)
}

/// Shared by the reducer's `succeeded` branch and the executor's `expired`
/// path (which never flows through `handle`, since `expired` is not a status
/// a downstream callback reports). Archive is conflict-tolerant: a second
/// concurrent archive for the same id is treated as "someone else already
/// did this" rather than an error, and the delete is `NotFound`-tolerant for
/// the same reason.
pub async fn archive_then_delete(
    archived_jobs: &ArchivedJobsRepo,
    queued_jobs: &QueuedJobsRepo,
    id: Uuid,
    name: &str,
    status: &str,
    attempts: i16,
) -> Result<(), StoreError> {
    match archived_jobs.create_archived(id, name, status, attempts).await {
        Ok(_) => {}
        Err(StoreError::Conflict(_)) => {
            warn!(%id, name, "archive conflict, another agent archived first");
        }
        Err(e) => return Err(e),
    }

    match queued_jobs.delete(id).await {
        Ok(()) => Ok(()),
        Err(StoreError::NotFound) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_matches_spec_formula() {
        // first retry of a 3-attempt job: burned = 3-2 = 1 -> 2s
        assert_eq!(retry_delay(3, 2), chrono::Duration::seconds(2));
        // second retry: burned = 3-1 = 2 -> 4s
        assert_eq!(retry_delay(3, 1), chrono::Duration::seconds(4));
    }

    #[test]
    fn retry_delay_caps_for_huge_attempt_budgets() {
        assert_eq!(retry_delay(255, 0), chrono::Duration::seconds(1i64 << 20));
    }
}
