//! Error types for the persistence layer.

use sqlx::error::DatabaseError as SqlxDatabaseError;
use thiserror::Error;

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors produced by the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database migration error: {0}")]
    Migration(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl DatabaseError {
    /// Create a corrupt-row error, used when stored ids or timestamps fail to parse.
    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::CorruptRow(message.into())
    }

    /// Whether retrying the operation could succeed.
    ///
    /// Pool exhaustion, I/O failures and busy databases are transient;
    /// constraint violations and corrupt rows are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Query(sqlx::Error::Io(_))
            | Self::Query(sqlx::Error::PoolTimedOut)
            | Self::Query(sqlx::Error::PoolClosed)
            | Self::Query(sqlx::Error::WorkerCrashed) => true,
            Self::Query(sqlx::Error::Database(error)) => {
                let message = SqlxDatabaseError::message(error.as_ref());
                message.contains("locked") || message.contains("busy")
            }
            Self::Query(_) | Self::Migration(_) | Self::CorruptRow(_) => false,
        }
    }
}

impl From<uuid::Error> for DatabaseError {
    fn from(err: uuid::Error) -> Self {
        Self::CorruptRow(format!("invalid uuid: {err}"))
    }
}
