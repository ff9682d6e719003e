// crates/rickover/src/error.rs
//! Typed Store errors. Kept independent of transport: the HTTP surface in
//! `rickover-server` maps these onto status codes, and the dispatcher maps
//! them onto retry/backoff decisions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Queued or archived row absent, or a referenced type is not registered.
    #[error("not found")]
    NotFound,

    /// Enqueue target type is missing OR the id was previously archived.
    /// Deliberately indistinguishable from the caller's point of view.
    #[error("unknown job type or id already archived")]
    UnknownOrArchived,

    /// Uniqueness violation: duplicate id at enqueue, duplicate archival,
    /// duplicate type name at registration.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Validation failure: bad delivery strategy, non-positive counts,
    /// oversize payload, malformed id, malformed JSON payload.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal signal from `acquire` when a candidate row is already locked.
    /// Unreachable with the `FOR UPDATE SKIP LOCKED` acquisition used here;
    /// retained so callers written against the interface still compile
    /// against a hypothetical backend that needs it.
    #[error("lock unavailable")]
    LockUnavailable,

    /// Network/database transient error. Workers retry these with backoff.
    #[error("transient store error: {0}")]
    Transient(#[source] sqlx::Error),

    /// Configuration error at startup.
    #[error("fatal configuration error: {0}")]
    Fatal(String),
}

impl StoreError {
    /// Classifies a raw `sqlx::Error` into the typed kinds above, using
    /// Postgres SQLSTATE codes where the distinction matters.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref dbe) = e {
            if let Some(code) = dbe.code() {
                match code.as_ref() {
                    // unique_violation
                    "23505" => return StoreError::Conflict(dbe.message().to_string()),
                    // lock_not_available
                    "55P03" => return StoreError::LockUnavailable,
                    // invalid_text_representation (e.g. malformed json cast)
                    "22P02" => {
                        return StoreError::InvalidArgument(format!(
                            "malformed payload: {}",
                            dbe.message()
                        ))
                    }
                    // check_violation
                    "23514" => {
                        return StoreError::InvalidArgument(format!(
                            "constraint violated: {}",
                            dbe.message()
                        ))
                    }
                    _ => {}
                }
            }
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return StoreError::NotFound;
        }
        StoreError::Transient(e)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::from_sqlx(e)
    }
}
