//! Error types for database handles.

use thiserror::Error;

/// Database handle errors.
#[derive(Error, Debug)]
pub enum SpanError {
    /// The transaction was already committed or closed.
    #[error("transaction already closed")]
    AlreadyClosed,

    /// A nested transaction closed without committing, so the outer
    /// transaction was rolled back instead of committed.
    #[error("transaction rolled back")]
    RolledBack,

    /// The caller cancelled the context.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A single-row query returned no rows.
    #[error("no rows returned")]
    NotFound,

    /// SQLite error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error.
    #[cfg(feature = "postgres")]
    #[error("postgres: {0}")]
    Postgres(#[from] postgres::Error),
}

impl SpanError {
    /// Did the statement fail because a unique or primary key value already exists?
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            }
            #[cfg(feature = "postgres")]
            Self::Postgres(err) => {
                err.code() == Some(&postgres::error::SqlState::UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }

    /// Did the query find nothing?
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        )
    }

    /// Was the operation stopped by the caller's context?
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type for database handle operations.
pub type Result<T> = std::result::Result<T, SpanError>;
