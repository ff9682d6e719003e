// crates/rickover/src/store/queued_jobs.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{QueuedJob, QueuedStatus};

const SELECT_COLUMNS: &str =
    "id, name, attempts, run_after, expires_at, status, data, created_at, updated_at";

#[derive(Clone)]
pub struct QueuedJobsRepo {
    pool: PgPool,
}

impl QueuedJobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `data_json` is passed through as raw text and cast to `jsonb` by
    /// Postgres, so malformed JSON surfaces as the database's own syntax
    /// error rather than a second, possibly-divergent, application parser.
    pub async fn enqueue(
        &self,
        id: Uuid,
        type_name: &str,
        run_after: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        data_json: &str,
    ) -> Result<QueuedJob, StoreError> {
        let row = sqlx::query_as::<_, QueuedJob>(&format!(
            r#"
            INSERT INTO queued_jobs (id, name, attempts, run_after, expires_at, status, data)
            SELECT $1, name, attempts, $3, $4, '{queued}', $5::jsonb
            FROM jobs
            WHERE name = $2
            AND NOT EXISTS (SELECT 1 FROM archived_jobs WHERE id = $1)
            RETURNING {cols}
            "#,
            queued = QueuedStatus::Queued.as_str(),
            cols = SELECT_COLUMNS,
        ))
        .bind(id)
        .bind(type_name)
        .bind(run_after)
        .bind(expires_at)
        .bind(data_json)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.ok_or(StoreError::UnknownOrArchived)
    }

    pub async fn get(&self, id: Uuid) -> Result<QueuedJob, StoreError> {
        sqlx::query_as::<_, QueuedJob>(&format!(
            "SELECT {SELECT_COLUMNS} FROM queued_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    /// `FOR UPDATE SKIP LOCKED` gives true non-blocking acquisition, so the
    /// `LockUnavailable` branch of `StoreError` is never produced here.
    pub async fn acquire(&self, type_name: &str) -> Result<Option<QueuedJob>, StoreError> {
        sqlx::query_as::<_, QueuedJob>(&format!(
            r#"
            UPDATE queued_jobs
            SET status = '{in_progress}', updated_at = now()
            WHERE id = (
                SELECT id FROM queued_jobs
                WHERE status = '{queued}' AND name = $1 AND run_after <= now()
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {cols}
            "#,
            in_progress = QueuedStatus::InProgress.as_str(),
            queued = QueuedStatus::Queued.as_str(),
            cols = SELECT_COLUMNS,
        ))
        .bind(type_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    pub async fn decrement(
        &self,
        id: Uuid,
        expected_attempts: i16,
        run_after: DateTime<Utc>,
    ) -> Result<QueuedJob, StoreError> {
        sqlx::query_as::<_, QueuedJob>(&format!(
            r#"
            UPDATE queued_jobs
            SET attempts = attempts - 1, status = '{queued}', updated_at = now(), run_after = $3
            WHERE id = $1 AND attempts = $2
            RETURNING {cols}
            "#,
            queued = QueuedStatus::Queued.as_str(),
            cols = SELECT_COLUMNS,
        ))
        .bind(id)
        .bind(expected_attempts)
        .bind(run_after)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    /// More than one deleted row would indicate a duplicate primary key,
    /// which Postgres itself makes impossible; this purely documents the
    /// invariant, it cannot fail the assertion in practice.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM queued_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        match result.rows_affected() {
            0 => Err(StoreError::NotFound),
            1 => Ok(()),
            n => panic!("delete removed {n} rows for a single id; primary key invariant broken"),
        }
    }

    pub async fn get_old_in_progress(
        &self,
        threshold: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueuedJob>, StoreError> {
        sqlx::query_as::<_, QueuedJob>(&format!(
            r#"
            SELECT {cols} FROM queued_jobs
            WHERE status = '{in_progress}' AND updated_at < $1
            ORDER BY updated_at ASC
            LIMIT $2
            "#,
            in_progress = QueuedStatus::InProgress.as_str(),
            cols = SELECT_COLUMNS,
        ))
        .bind(threshold)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    /// Returns `(all, ready)` counts across every type. Observability only.
    pub async fn count_ready_and_all(&self) -> Result<(i64, i64), StoreError> {
        let row: (i64, i64) = sqlx::query_as(&format!(
            r#"
            SELECT
                COUNT(*) AS all_count,
                COUNT(*) FILTER (WHERE status = '{queued}' AND run_after <= now()) AS ready_count
            FROM queued_jobs
            "#,
            queued = QueuedStatus::Queued.as_str(),
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(row)
    }

    /// Returns name → count for queued rows matching `status`. Observability
    /// only.
    pub async fn count_by_status(&self, status: &str) -> Result<HashMap<String, i64>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT name, COUNT(*) FROM queued_jobs WHERE status = $1 GROUP BY name
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(rows.into_iter().collect())
    }
}
