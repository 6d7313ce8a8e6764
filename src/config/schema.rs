//! Configuration schema for Stagecraft
//!
//! Global settings live at `~/.config/stagecraft/config.toml`; the build
//! description usually lives in a project-local `stagecraft.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container engine settings
    pub engine: EngineConfig,

    /// Builder stage settings
    pub builder: BuilderConfig,

    /// Runtime stage settings
    pub runtime: RuntimeConfig,

    /// Directories exported from the builder into the runtime stage.
    /// Empty means the standard pair under `builder.install_prefix`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactConfig>,

    /// Output image settings
    pub image: ImageConfig,
}

impl Config {
    /// Configured artifacts, or the standard pair when none are declared
    pub fn effective_artifacts(&self) -> Vec<ArtifactConfig> {
        if self.artifacts.is_empty() {
            ArtifactConfig::standard(&self.builder.install_prefix)
        } else {
            self.artifacts.clone()
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append build events to the build log
    pub build_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            build_log: true,
        }
    }
}

/// Container engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary: "auto", "podman" or "docker"
    pub binary: String,

    /// Always attempt to pull newer base images
    pub pull: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "auto".to_string(),
            pull: false,
        }
    }
}

/// Builder stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Base image with the interpreter and a package manager
    pub base_image: String,

    /// OS packages providing the native toolchain
    pub system_packages: Vec<String>,

    /// Dependency manifest, relative to the project directory
    pub manifest: PathBuf,

    /// Prefix the installer writes libraries and executables under
    pub install_prefix: String,

    /// Installer command; the manifest and prefix are appended
    pub installer: Vec<String>,

    /// Writable cache for the native toolchain
    pub toolchain_cache: ToolchainCacheConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            base_image: "python:3.11-slim".to_string(),
            system_packages: vec![
                "build-essential".to_string(),
                "gcc".to_string(),
                "libffi-dev".to_string(),
                "libssl-dev".to_string(),
                "cargo".to_string(),
            ],
            manifest: PathBuf::from("requirements.txt"),
            install_prefix: "/install".to_string(),
            installer: vec![
                "pip".to_string(),
                "install".to_string(),
                "--no-cache-dir".to_string(),
            ],
            toolchain_cache: ToolchainCacheConfig::default(),
        }
    }
}

/// Toolchain cache redirection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainCacheConfig {
    /// Redirect the cache at all
    pub enabled: bool,

    /// Variable the toolchain reads its cache location from
    pub env_var: String,

    /// Writable path inside the builder
    pub path: String,
}

impl Default for ToolchainCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            env_var: "CARGO_HOME".to_string(),
            path: "/tmp/cargo".to_string(),
        }
    }
}

/// Runtime stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Minimal base image for the shipped stage
    pub base_image: String,

    /// Working directory the application is copied into
    pub workdir: String,

    /// Application source tree, relative to the project directory
    pub source: PathBuf,

    /// Port declared as image metadata
    pub port: u16,

    /// Launch command in exec form
    pub entry: Vec<String>,

    /// Extra environment for the running process
    pub env: BTreeMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_image: "python:3.11-slim".to_string(),
            workdir: "/app".to_string(),
            source: PathBuf::from("."),
            port: 8000,
            entry: vec!["python".to_string(), "main.py".to_string()],
            env: BTreeMap::new(),
        }
    }
}

/// One directory exported by the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Short name used in messages
    pub name: String,

    /// Absolute path inside the builder
    pub source: String,

    /// Absolute path inside the runtime stage
    pub dest: String,
}

impl ArtifactConfig {
    /// Installed libraries and installed executables under `prefix`
    pub fn standard(prefix: &str) -> Vec<Self> {
        let prefix = prefix.trim_end_matches('/');
        vec![
            Self {
                name: "site-packages".to_string(),
                source: format!("{}/lib", prefix),
                dest: "/usr/local/lib".to_string(),
            },
            Self {
                name: "entrypoints".to_string(),
                source: format!("{}/bin", prefix),
                dest: "/usr/local/bin".to_string(),
            },
        ]
    }
}

/// Output image configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Repository name for the content-addressed tag
    pub name: String,

    /// Path components kept out of the tag hash and the build context
    pub exclude: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name: "stagecraft-app".to_string(),
            exclude: vec![
                ".git".to_string(),
                "__pycache__".to_string(),
                ".venv".to_string(),
                "stagecraft.toml".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[builder]"));
        assert!(toml.contains("[runtime]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.runtime.port, 8000);
        assert!(config.artifacts.is_empty());
        assert_eq!(config.effective_artifacts().len(), 2);
        assert_eq!(config.builder.toolchain_cache.env_var, "CARGO_HOME");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [runtime]
            port = 9000
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.runtime.port, 9000);
        assert_eq!(config.runtime.workdir, "/app"); // default preserved
        assert_eq!(config.builder.base_image, "python:3.11-slim");
    }

    #[test]
    fn explicit_artifacts_replace_standard_pair() {
        let toml = r#"
            [[artifacts]]
            name = "venv"
            source = "/install/venv"
            dest = "/opt/venv"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let artifacts = config.effective_artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "venv");
    }

    #[test]
    fn standard_artifacts_follow_prefix() {
        let artifacts = ArtifactConfig::standard("/opt/deps/");
        assert_eq!(artifacts[0].source, "/opt/deps/lib");
        assert_eq!(artifacts[1].source, "/opt/deps/bin");
        assert_eq!(artifacts[1].dest, "/usr/local/bin");
    }
}
