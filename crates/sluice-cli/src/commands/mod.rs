//! CLI command implementations.

pub mod database;
pub mod migration;

use anyhow::{Context, Result};
use sluice_config::{ConfigLoader, SluiceConfig};

use crate::GlobalArgs;

/// Loads the project configuration and layers the command-line flags on top.
pub fn load_config(args: &GlobalArgs) -> Result<SluiceConfig> {
    let mut config = ConfigLoader::new()
        .with_project_dir(&args.project)
        .load()
        .with_context(|| format!("Failed to load configuration from {}", args.project.display()))?;

    let migrations = &mut config.migrations;
    if let Some(directory) = &args.migrations {
        migrations.directory.clone_from(directory);
    }
    if let Some(revision) = args.revision {
        migrations.revision = Some(revision);
    }
    if let Some(metadata) = &args.metadata {
        migrations.metadata.clone_from(metadata);
    }
    if args.no_embed {
        migrations.embedded_rollbacks = false;
    }

    if let Some(timeout) = args.timeout {
        config.database.timeout_secs = timeout;
    }
    if let Some(uri) = &args.uri {
        config.database.uri = Some(uri.clone());
    }

    Ok(config)
}
