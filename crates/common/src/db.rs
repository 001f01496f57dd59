//! Shared database types for Reelbase
//!
//! This module provides the error taxonomy every repository reports, plus the
//! helpers that keep that taxonomy honest: a per-operation timeout wrapper and
//! unique-constraint detection.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::Error;

/// Default bound for one unit of repository work (one Get, Insert, Update, ...)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Anything that went wrong below the repository that is not a modelled outcome.
#[derive(Error, Debug)]
pub enum StorageFailure {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// Integrity constraint rejected by an in-process store
    #[error("constraint violated: {0}")]
    Constraint(String),
}

/// Repository-level error taxonomy
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Edit conflict: the record was modified or removed by another writer")]
    EditConflict,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Invalid sort value: {0}")]
    InvalidSort(String),

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageFailure),
}

impl RepositoryError {
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, RepositoryError::StorageFailure(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::StorageFailure(StorageFailure::Database(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Error::NotFound("Record not found".to_string()),
            RepositoryError::EditConflict => Error::EditConflict,
            RepositoryError::DuplicateEntry(msg) => Error::Conflict(msg),
            RepositoryError::InvalidSort(token) => {
                Error::Validation(format!("invalid sort value: {}", token))
            }
            RepositoryError::StorageFailure(e) => Error::Storage(e),
        }
    }
}

/// Run one unit of repository work under a deadline.
///
/// On expiry the inner future is dropped. Any `sqlx::Transaction` it owns is
/// rolled back on drop, so a timed-out operation never commits partially.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "Repository operation timed out, transaction abandoned"
            );
            Err(StorageFailure::TimedOut(limit).into())
        }
    }
}

/// True when `err` is a unique violation of the named constraint.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
