use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::ArchivedJob;

const SELECT_COLUMNS: &str = "id, name, attempts, status, created_at, data, expires_at";

#[derive(Clone)]
pub struct ArchivedJobsRepo {
    pool: PgPool,
}

impl ArchivedJobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Copies `data`, `expires_at`, and `created_at` from the queued row.
    /// Returns `NotFound` if the queued row is absent, `Conflict` if an
    /// archived row already exists for this id (the caller treats that as a
    /// successful no-op — see the callback reducer).
    pub async fn create_archived(
        &self,
        id: Uuid,
        name: &str,
        status: &str,
        attempts: i16,
    ) -> Result<ArchivedJob, StoreError> {
        let row = sqlx::query_as::<_, ArchivedJob>(&format!(
            r#"
            INSERT INTO archived_jobs (id, name, attempts, status, data, expires_at, created_at)
            SELECT id, $2, $4, $3, data, expires_at, created_at
            FROM queued_jobs
            WHERE id = $1 AND name = $2
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(status)
        .bind(attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.ok_or(StoreError::NotFound)
    }

    pub async fn get_archived(&self, id: Uuid) -> Result<ArchivedJob, StoreError> {
        sqlx::query_as::<_, ArchivedJob>(&format!(
            "SELECT {SELECT_COLUMNS} FROM archived_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }
}
