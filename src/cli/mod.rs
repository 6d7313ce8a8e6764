//! Command-line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use crate::config::ConfigManager;
use std::path::{Path, PathBuf};

/// Where the project lives and which local config applies to it
#[derive(Debug, Clone)]
pub struct Project {
    /// Build context and base for relative paths
    pub dir: PathBuf,
    /// Discovered `stagecraft.toml`, if any
    pub local_config: Option<PathBuf>,
}

impl Project {
    /// Resolve the project starting from `start`.
    ///
    /// With local discovery on, the directory holding the nearest
    /// `stagecraft.toml` becomes the project directory.
    pub fn discover(start: &Path, discover_local: bool) -> Self {
        let local_config = if discover_local {
            ConfigManager::find_local_config(start)
        } else {
            None
        };

        let dir = local_config
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start.to_path_buf());

        Self { dir, local_config }
    }
}
