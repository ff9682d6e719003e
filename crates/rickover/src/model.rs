//! The three persistent entities. Status/strategy fields are kept as plain
//! `String` columns (not a `sqlx`-mapped enum) so `FromRow` stays a direct
//! derive; the `*Status`/`DeliveryStrategy` enums below exist purely to
//! give callers named constants instead of sprinkling string literals
//! through the store layer.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobType {
    pub name: String,
    pub delivery_strategy: String,
    pub attempts: i16,
    pub concurrency: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedJob {
    pub id: Uuid,
    pub name: String,
    pub attempts: i16,
    pub run_after: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArchivedJob {
    pub id: Uuid,
    pub name: String,
    pub attempts: i16,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    AtLeastOnce,
    AtMostOnce,
}

impl DeliveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStrategy::AtLeastOnce => "at_least_once",
            DeliveryStrategy::AtMostOnce => "at_most_once",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "at_least_once" => Some(DeliveryStrategy::AtLeastOnce),
            "at_most_once" => Some(DeliveryStrategy::AtMostOnce),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuedStatus {
    Queued,
    InProgress,
}

impl QueuedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuedStatus::Queued => "queued",
            QueuedStatus::InProgress => "in-progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivedStatus {
    Succeeded,
    Failed,
    Expired,
}

impl ArchivedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchivedStatus::Succeeded => "succeeded",
            ArchivedStatus::Failed => "failed",
            ArchivedStatus::Expired => "expired",
        }
    }
}
