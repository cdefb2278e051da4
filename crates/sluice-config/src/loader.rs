//! Configuration loader with multi-source merging

use crate::SluiceConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SLUICE";

/// Git-tracked project settings.
const PROJECT_CONFIG_FILE: &str = "sluice.toml";

/// Untracked per-checkout overrides.
const LOCAL_CONFIG_FILE: &str = "sluice.local.toml";

/// ~/.config/sluice/config.toml, or the platform equivalent.
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("dev", "Sluice", "sluice").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn toml_source(path: PathBuf) -> config::File<config::FileSourceFile, config::FileFormat> {
    config::File::from(path)
        .required(false)
        .format(config::FileFormat::Toml)
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_source: Option<config::Map<String, String>>,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_source: None,
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Read environment variables from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: config::Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Skip ~/.config/sluice/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<SluiceConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = SluiceConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/sluice/config.toml)
        if let Some(user_config_file) = user_config_file().filter(|_| self.user_config) {
            builder = builder.add_source(toml_source(user_config_file));
        }

        // 3. Project config, then 4. local overrides
        for name in [PROJECT_CONFIG_FILE, LOCAL_CONFIG_FILE] {
            builder = builder.add_source(toml_source(self.project_dir.join(name)));
        }

        // 5. Environment variables (SLUICE_MIGRATIONS__DIRECTORY=...)
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source.clone()),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let mut sluice_config: SluiceConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Resolve relative paths
        sluice_config.resolve_paths(&self.project_dir);

        Ok(sluice_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
