//! Configuration management for Sluice
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the caller)
//! 2. Environment variables (SLUICE_* prefix, `__` between section and key)
//! 3. sluice.local.toml (gitignored, local overrides)
//! 4. sluice.toml (git-tracked, project config)
//! 5. ~/.config/sluice/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};
use sluice_migration::{MetadataTable, Options};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main Sluice configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SluiceConfig {
    pub migrations: MigrationsConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub directory: PathBuf,

    /// Target revision; latest when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,

    pub embedded_rollbacks: bool,

    /// `schema.table`, or a bare table name.
    pub metadata: String,

    pub extension: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("sql"),
            revision: None,
            embedded_rollbacks: true,
            metadata: MetadataTable::default().to_string(),
            extension: ".sql".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; there is no default database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// How long a whole run may take.
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            timeout_secs: 600,
        }
    }
}

impl SluiceConfig {
    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.migrations.directory.is_relative() {
            self.migrations.directory = base.join(&self.migrations.directory);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.database.timeout_secs)
    }

    /// Validate and convert into migration engine options
    pub fn to_options(&self) -> Result<Options, ConfigError> {
        let migrations = &self.migrations;

        if migrations.extension.is_empty() {
            return Err(ConfigError::ValidationError(
                "migrations.extension must not be empty".to_string(),
            ));
        }

        let mut options = Options::default()
            .with_directory(&migrations.directory)
            .with_metadata(MetadataTable::parse(&migrations.metadata)?)
            .with_extension(&migrations.extension);

        if let Some(revision) = migrations.revision {
            options = options.with_revision(revision);
        }
        if !migrations.embedded_rollbacks {
            options = options.disable_embedded_rollbacks();
        }

        Ok(options)
    }
}
