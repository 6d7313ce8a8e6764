//! Runtime factory for creating the configured container engine

use crate::config::Config;
use crate::error::{StagecraftError, StagecraftResult};
use crate::orchestration::engine::CliEngine;
use crate::orchestration::runtime::ContainerRuntime;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Supported engine CLIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Podman,
    Docker,
}

impl EngineKind {
    /// Binary name on PATH
    pub fn binary(&self) -> &'static str {
        match self {
            EngineKind::Podman => "podman",
            EngineKind::Docker => "docker",
        }
    }

    /// Detection order for `engine.binary = "auto"`
    pub fn preference() -> [EngineKind; 2] {
        [EngineKind::Podman, EngineKind::Docker]
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

impl FromStr for EngineKind {
    type Err = StagecraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "podman" => Ok(EngineKind::Podman),
            "docker" => Ok(EngineKind::Docker),
            other => Err(StagecraftError::User(format!(
                "Unknown engine {:?}. Use auto, podman or docker",
                other
            ))),
        }
    }
}

/// Create the container runtime selected by `engine.binary`.
///
/// `auto` picks the first installed engine in [`EngineKind::preference`].
pub async fn create_runtime(config: &Config) -> StagecraftResult<Box<dyn ContainerRuntime>> {
    let choice = config.engine.binary.trim();

    if !choice.eq_ignore_ascii_case("auto") {
        let kind: EngineKind = choice.parse()?;
        return Ok(Box::new(CliEngine::new(kind)));
    }

    for kind in EngineKind::preference() {
        let engine = CliEngine::new(kind);
        if engine.is_available().await? {
            debug!("Detected container engine: {}", kind);
            return Ok(Box::new(engine));
        }
    }

    Err(StagecraftError::EngineNotFound)
}
