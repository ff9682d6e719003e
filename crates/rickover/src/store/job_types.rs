use sqlx::PgPool;

use crate::error::StoreError;
use crate::model::{DeliveryStrategy, JobType};

/// Registration and lookup of job types. Rows here are never mutated once
/// inserted (`register-type` is the only writer).
#[derive(Clone)]
pub struct JobTypesRepo {
    pool: PgPool,
}

impl JobTypesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register_type(
        &self,
        name: &str,
        delivery_strategy: &str,
        attempts: i16,
        concurrency: i16,
    ) -> Result<JobType, StoreError> {
        let strategy = DeliveryStrategy::parse(delivery_strategy).ok_or_else(|| {
            StoreError::InvalidArgument(format!(
                "unknown delivery_strategy: {delivery_strategy}"
            ))
        })?;
        if attempts < 1 {
            return Err(StoreError::InvalidArgument(
                "attempts must be >= 1".into(),
            ));
        }
        if concurrency < 1 {
            return Err(StoreError::InvalidArgument(
                "concurrency must be >= 1".into(),
            ));
        }
        if strategy == DeliveryStrategy::AtMostOnce && attempts != 1 {
            return Err(StoreError::InvalidArgument(
                "at_most_once types must have attempts = 1".into(),
            ));
        }

        sqlx::query_as::<_, JobType>(
            r#"
            INSERT INTO jobs (name, delivery_strategy, attempts, concurrency)
            VALUES ($1, $2, $3, $4)
            RETURNING name, delivery_strategy, attempts, concurrency, created_at
            "#,
        )
        .bind(name)
        .bind(strategy.as_str())
        .bind(attempts)
        .bind(concurrency)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    pub async fn get(&self, name: &str) -> Result<JobType, StoreError> {
        sqlx::query_as::<_, JobType>(
            r#"
            SELECT name, delivery_strategy, attempts, concurrency, created_at
            FROM jobs WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    pub async fn get_all(&self) -> Result<Vec<JobType>, StoreError> {
        sqlx::query_as::<_, JobType>(
            r#"
            SELECT name, delivery_strategy, attempts, concurrency, created_at
            FROM jobs ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }
}
