//! Error types for the migration engine.

use std::path::PathBuf;

use sluice_span::SpanError;
use thiserror::Error;

use crate::Direction;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum Error {
    /// The filename has no `<revision>-` prefix.
    #[error("invalid migration filename: {0}")]
    InvalidIdentifier(String),

    /// The file has no `--- !Up` or `--- !Down` directive.
    #[error("migration {0} has no --- !Up or --- !Down section")]
    MalformedMigration(String),

    /// `create` was called with a blank name.
    #[error("name required")]
    NameRequired,

    /// A rollback of fewer than one step.
    #[error("invalid step")]
    InvalidStep,

    #[error("invalid metadata schema name: {0:?}")]
    InvalidSchemaName(String),

    #[error("invalid metadata table name: {0:?}")]
    InvalidTableName(String),

    #[error("metadata table name required")]
    TableNameRequired,

    /// Two migration files share a revision number.
    #[error("migrations {first} and {second} share revision {revision}")]
    DuplicateRevision {
        revision: u64,
        first: String,
        second: String,
    },

    /// The migrations directory or a migration file could not be read.
    #[error("invalid migrations source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No metadata row for the migration.
    #[error("migration {0} is not recorded in the metadata table")]
    NotFound(String),

    #[error(transparent)]
    Span(#[from] SpanError),

    /// Executing a migration failed; the run stopped at this file.
    #[error("migration {migration} failed migrating {direction}: {source}")]
    Migration {
        migration: String,
        direction: Direction,
        #[source]
        source: SpanError,
    },
}

impl Error {
    /// Attaches the migration and direction to database failures, leaving
    /// every other error as is.
    pub(crate) fn in_migration(self, migration: &str, direction: Direction) -> Self {
        match self {
            Self::Span(source) => Self::Migration {
                migration: migration.to_string(),
                direction,
                source,
            },
            other => other,
        }
    }

    /// Was the run stopped by the caller's context?
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Span(err) | Self::Migration { source: err, .. } => err.is_cancellation(),
            _ => false,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, Error>;
