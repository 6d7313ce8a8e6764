//! Two-stage build plan
//!
//! A [`BuildPlan`] is the typed form of the build description: a builder
//! stage that compiles and installs the dependency closure, a runtime
//! stage that ships it, and the [`ArtifactManifest`] that is the only
//! channel between them. All validation that can fail without a
//! container engine happens while the plan is assembled.

pub mod artifacts;
pub mod containerfile;
pub mod image;
pub mod requirements;
pub mod stage;

pub use artifacts::{Artifact, ArtifactManifest};
pub use containerfile::render;
pub use image::ImageRef;
pub use requirements::{DependencyManifest, ManifestLine, Requirement};
pub use stage::{BuilderStage, Instruction, RuntimeStage, ToolchainCache};

use crate::config::Config;
use crate::error::{StagecraftError, StagecraftResult};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Fully validated two-stage build
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub builder: BuilderStage,
    pub runtime: RuntimeStage,
    pub artifacts: ArtifactManifest,
}

impl BuildPlan {
    /// Assemble and validate a plan for the project at `project_dir`.
    ///
    /// The builder and runtime base images are not compared; a runtime
    /// version mismatch only shows up when the image runs.
    pub async fn from_config(config: &Config, project_dir: &Path) -> StagecraftResult<Self> {
        let builder_cfg = &config.builder;
        let runtime_cfg = &config.runtime;

        let builder_base = ImageRef::parse(&builder_cfg.base_image)?;
        let runtime_base = ImageRef::parse(&runtime_cfg.base_image)?;

        if runtime_cfg.entry.first().map_or(true, |arg| arg.trim().is_empty()) {
            return Err(StagecraftError::EntryCommandMissing);
        }

        let source = resolve_source(project_dir, &runtime_cfg.source)?;

        if !runtime_cfg.workdir.starts_with('/') {
            return Err(StagecraftError::User(format!(
                "runtime.workdir must be absolute, got {}",
                runtime_cfg.workdir
            )));
        }
        if runtime_cfg.port == 0 {
            return Err(StagecraftError::User(
                "runtime.port must be between 1 and 65535".to_string(),
            ));
        }
        if builder_cfg.installer.is_empty() {
            return Err(StagecraftError::User(
                "builder.installer must name an install command".to_string(),
            ));
        }
        if !builder_cfg.install_prefix.starts_with('/') {
            return Err(StagecraftError::User(format!(
                "builder.install_prefix must be absolute, got {}",
                builder_cfg.install_prefix
            )));
        }

        let toolchain_cache = if builder_cfg.toolchain_cache.enabled {
            let cache = &builder_cfg.toolchain_cache;
            if !is_env_name(&cache.env_var) {
                return Err(StagecraftError::User(format!(
                    "builder.toolchain_cache.env_var is not a valid variable name: {:?}",
                    cache.env_var
                )));
            }
            if !cache.path.starts_with('/') {
                return Err(StagecraftError::User(format!(
                    "builder.toolchain_cache.path must be absolute, got {}",
                    cache.path
                )));
            }
            Some(ToolchainCache {
                env_var: cache.env_var.clone(),
                path: cache.path.clone(),
            })
        } else {
            debug!("Toolchain cache redirection disabled");
            None
        };

        let manifest = DependencyManifest::load(project_dir, &builder_cfg.manifest).await?;
        debug!(
            "Loaded {} ({} requirements across {} files)",
            manifest.path().display(),
            manifest.requirements().count(),
            manifest.files().len()
        );

        let builder = BuilderStage {
            base: builder_base,
            system_packages: builder_cfg.system_packages.clone(),
            manifest,
            install_prefix: builder_cfg.install_prefix.clone(),
            installer: builder_cfg.installer.clone(),
            toolchain_cache,
        };

        let artifacts = ArtifactManifest::from_config(&config.effective_artifacts());
        artifacts.verify(&builder)?;

        let runtime = RuntimeStage {
            base: runtime_base,
            workdir: runtime_cfg.workdir.clone(),
            source,
            port: runtime_cfg.port,
            entry: runtime_cfg.entry.clone(),
            env: runtime_cfg.env.clone(),
        };

        Ok(Self {
            builder,
            runtime,
            artifacts,
        })
    }

    pub fn builder_instructions(&self) -> Vec<Instruction> {
        self.builder.instructions(&self.artifacts)
    }

    pub fn runtime_instructions(&self) -> Vec<Instruction> {
        self.runtime.instructions(&self.artifacts)
    }
}

/// Resolve the application source against the project directory.
///
/// The source must exist and stay inside the project, since the engine
/// only sees the project directory as build context.
fn resolve_source(project_dir: &Path, source: &Path) -> StagecraftResult<PathBuf> {
    let mut rel = PathBuf::new();
    for component in source.components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => return Err(StagecraftError::SourcePathMissing(source.to_path_buf())),
        }
    }

    let full = project_dir.join(&rel);
    if !full.exists() {
        return Err(StagecraftError::SourcePathMissing(full));
    }
    Ok(rel)
}

fn is_env_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
