use std::{fmt::Display, hash::Hash};

use async_trait::async_trait;
use axum::http::StatusCode;
use time::OffsetDateTime;
use tracing::error;

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Failures raised by a storage backend.
///
/// A missing record is never an error on lookup: `find_by_key` answers
/// `Ok(None)`. `NotFound` is only produced when an update targets a key that
/// is not there.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("unique key conflict: {0}")]
    Conflict(String),
    #[error("{kind} `{key}` not found")]
    NotFound { kind: &'static str, key: String },
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handler-side conversion: log, then answer with the matching status.
pub(crate) fn rejection(e: StoreError) -> (StatusCode, String) {
    error!(error = %e, "storage call failed");
    (e.status_code(), e.to_string())
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// An entity addressed by a natural key (email, slug).
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Display + Send + Sync;
    /// Full field set used when the record is created.
    type Draft: Send;
    /// Field set applied to an existing record; `None` fields are left alone.
    type Patch: Send + Sync;

    const KIND: &'static str;

    fn key(&self) -> &Self::Key;
    fn from_draft(draft: Self::Draft, now: OffsetDateTime) -> Self;
    fn apply(&mut self, patch: &Self::Patch, now: OffsetDateTime);
}

#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn find_by_key(&self, key: &R::Key) -> Result<Option<R>, StoreError>;
    async fn insert(&self, draft: R::Draft) -> Result<R, StoreError>;
    async fn update_by_key(&self, key: &R::Key, patch: &R::Patch) -> Result<R, StoreError>;
}
