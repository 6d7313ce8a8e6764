//! Error types for Stagecraft
//!
//! All modules use `StagecraftResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Stagecraft operations
pub type StagecraftResult<T> = Result<T, StagecraftError>;

/// All errors that can occur in Stagecraft
#[derive(Error, Debug)]
pub enum StagecraftError {
    // Engine errors
    #[error("No container engine found. Install Podman or Docker")]
    EngineNotFound,

    #[error("Container engine {name} is not usable: {reason}")]
    EngineNotReady { name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Plan errors (raised before any engine call)
    #[error("Invalid image reference {reference:?}: {reason}")]
    ImageRefInvalid { reference: String, reason: String },

    #[error("Invalid dependency manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Application source not found: {0}")]
    SourcePathMissing(PathBuf),

    #[error("Runtime entry command is not set")]
    EntryCommandMissing,

    #[error("Invalid artifact {name}: {reason}")]
    ArtifactInvalid { name: String, reason: String },

    // Build failures, classified from engine output
    #[error("Builder toolchain unavailable: {detail}")]
    ToolchainUnavailable { detail: String },

    #[error("Toolchain cache path is not writable: {detail}")]
    CachePathNotWritable { detail: String },

    #[error("Dependency resolution failed: {detail}")]
    DependencyResolution { detail: String },

    #[error("Copy source missing: {detail}")]
    CopySourceMissing { detail: String },

    #[error("Image build failed: {tag}: {reason}")]
    ImageBuild { tag: String, reason: String },

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl StagecraftError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    /// Whether the error was produced by the engine while building an image
    /// (as opposed to plan validation, which fails before the engine runs)
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolchainUnavailable { .. }
                | Self::CachePathNotWritable { .. }
                | Self::DependencyResolution { .. }
                | Self::CopySourceMissing { .. }
                | Self::ImageBuild { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineNotFound => Some("Install podman (preferred) or docker, or set engine.binary"),
            Self::ToolchainUnavailable { .. } => {
                Some("Check builder.system_packages and that the package source is reachable")
            }
            Self::CachePathNotWritable { .. } => {
                Some("Enable builder.toolchain_cache and point it at a writable path such as /tmp/cargo")
            }
            Self::DependencyResolution { .. } => {
                Some("Check the package names and version constraints in the dependency manifest")
            }
            Self::CopySourceMissing { .. } => {
                Some("Artifact sources must be directories produced under builder.install_prefix")
            }
            Self::EntryCommandMissing => Some("Set runtime.entry, e.g. [\"python\", \"main.py\"]"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StagecraftError::EngineNotFound;
        assert!(err.to_string().contains("No container engine"));
    }

    #[test]
    fn error_hint() {
        let err = StagecraftError::CachePathNotWritable {
            detail: "read-only".to_string(),
        };
        assert!(err.hint().unwrap().contains("toolchain_cache"));
        assert!(StagecraftError::Internal("x".to_string()).hint().is_none());
    }

    #[test]
    fn build_failures_are_distinguished_from_plan_errors() {
        assert!(StagecraftError::DependencyResolution {
            detail: String::new()
        }
        .is_build_failure());
        assert!(!StagecraftError::EntryCommandMissing.is_build_failure());
        assert!(!StagecraftError::SourcePathMissing(PathBuf::from("app")).is_build_failure());
    }
}
