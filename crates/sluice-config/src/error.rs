//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid migrations configuration: {0}")]
    Migration(#[from] sluice_migration::Error),
}
