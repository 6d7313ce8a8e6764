//! Configuration management for Stagecraft

pub mod schema;

pub use schema::Config;

use crate::error::{StagecraftError, StagecraftResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local build description
pub const LOCAL_CONFIG_NAME: &str = "stagecraft.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagecraft")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagecraft")
    }

    /// Directory holding per-build scratch directories
    pub fn builds_dir() -> PathBuf {
        Self::state_dir().join("builds")
    }

    /// Get the build log path
    pub fn build_log_path() -> PathBuf {
        Self::state_dir().join("builds.log")
    }

    /// Walk up from `start` looking for a project-local `stagecraft.toml`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> StagecraftResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> StagecraftResult<Config> {
        let value = read_toml_value(path).await?;
        value.try_into().map_err(|e: toml::de::Error| StagecraftError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config with an optional local config layered on top.
    ///
    /// Tables merge key by key; arrays and scalars from the local file
    /// replace the global value.
    pub async fn load_merged(&self, local: Option<&Path>) -> StagecraftResult<Config> {
        let mut merged = if self.config_path.exists() {
            read_toml_value(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let report_path = match local {
            Some(path) => {
                let overlay = read_toml_value(path).await?;
                merge_values(&mut merged, overlay);
                path.to_path_buf()
            }
            None => self.config_path.clone(),
        };

        merged
            .try_into()
            .map_err(|e: toml::de::Error| StagecraftError::ConfigInvalid {
                path: report_path,
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> StagecraftResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            StagecraftError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> StagecraftResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StagecraftError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure all state directories exist
    pub async fn ensure_state_dirs() -> StagecraftResult<()> {
        for dir in [Self::state_dir(), Self::builds_dir()] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StagecraftError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_toml_value(path: &Path) -> StagecraftResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| StagecraftError::io(format!("reading config from {}", path.display()), e))?;

    content
        .parse()
        .map_err(|e: toml::de::Error| StagecraftError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Recursively merge `overlay` into `base`
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
