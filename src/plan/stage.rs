//! Builder and runtime stages
//!
//! Each stage turns its settings into an ordered list of instructions.
//! The runtime stage can only reach the builder through the
//! [`ArtifactManifest`] it is given.

use crate::plan::artifacts::ArtifactManifest;
use crate::plan::image::ImageRef;
use crate::plan::requirements::DependencyManifest;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Alias of the builder stage inside the Containerfile
pub const BUILDER_STAGE: &str = "builder";

/// Scratch directory the manifest is copied into inside the builder
pub const BUILD_DIR: &str = "/build";

/// Package-manager metadata removed at the end of the toolchain step
pub const APT_LISTS_DIR: &str = "/var/lib/apt/lists";

/// One Containerfile instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Instruction {
    Comment(String),
    From {
        image: ImageRef,
        alias: Option<String>,
    },
    Workdir(String),
    Run(String),
    Env {
        key: String,
        value: String,
    },
    Copy {
        from: Option<String>,
        source: String,
        dest: String,
    },
    Expose(u16),
    Cmd(Vec<String>),
}

/// Writable cache location for the native toolchain.
///
/// Handed to the install step explicitly; the variable is set for that one
/// command and never becomes image-wide environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainCache {
    pub env_var: String,
    pub path: String,
}

/// Stage one: toolchain, dependency install, artifact production
#[derive(Debug, Clone, Serialize)]
pub struct BuilderStage {
    pub base: ImageRef,
    pub system_packages: Vec<String>,
    pub manifest: DependencyManifest,
    pub install_prefix: String,
    pub installer: Vec<String>,
    pub toolchain_cache: Option<ToolchainCache>,
}

impl BuilderStage {
    /// Instructions for stage one. Every exported artifact directory is
    /// created before the install runs, so an empty manifest still yields
    /// the directories the runtime stage copies.
    pub fn instructions(&self, artifacts: &ArtifactManifest) -> Vec<Instruction> {
        let mut out = vec![
            Instruction::Comment("Stage 1: toolchain and dependency closure".to_string()),
            Instruction::From {
                image: self.base.clone(),
                alias: Some(BUILDER_STAGE.to_string()),
            },
            Instruction::Workdir(BUILD_DIR.to_string()),
        ];

        if !self.system_packages.is_empty() {
            out.push(Instruction::Run(self.toolchain_command()));
        }

        for file in self.manifest.files() {
            let rel = container_relative(&file.path);
            out.push(Instruction::Copy {
                from: None,
                source: rel.clone(),
                dest: format!("./{}", rel),
            });
        }

        out.push(Instruction::Run(self.install_command(artifacts)));
        out
    }

    /// `apt-get` install of the toolchain, dropping package lists in the same layer
    pub fn toolchain_command(&self) -> String {
        let packages: Vec<String> = self.system_packages.iter().map(|p| shell_word(p)).collect();
        format!(
            "apt-get update && apt-get install -y --no-install-recommends {} && rm -rf {}/*",
            packages.join(" "),
            APT_LISTS_DIR
        )
    }

    /// Dependency install with the cache variable scoped to this command
    pub fn install_command(&self, artifacts: &ArtifactManifest) -> String {
        let mut dirs: Vec<String> = artifacts.exports().map(shell_word).collect();
        if let Some(ref cache) = self.toolchain_cache {
            dirs.push(shell_word(&cache.path));
        }

        let mut command = format!("mkdir -p {} && ", dirs.join(" "));

        if let Some(ref cache) = self.toolchain_cache {
            command.push_str(&format!("{}={} ", cache.env_var, shell_word(&cache.path)));
        }

        let installer: Vec<String> = self.installer.iter().map(|w| shell_word(w)).collect();
        command.push_str(&installer.join(" "));
        command.push_str(&format!(
            " --prefix={} -r {}",
            shell_word(&self.install_prefix),
            shell_word(&container_relative(self.manifest.path()))
        ));
        command
    }
}

/// Stage two: the image that ships
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStage {
    pub base: ImageRef,
    pub workdir: String,
    /// Application source relative to the project directory
    pub source: PathBuf,
    pub port: u16,
    pub entry: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl RuntimeStage {
    /// Instructions for stage two. The only cross-stage copies are the
    /// artifact manifest's imports.
    pub fn instructions(&self, artifacts: &ArtifactManifest) -> Vec<Instruction> {
        let mut out = vec![
            Instruction::Comment("Stage 2: runtime image".to_string()),
            Instruction::From {
                image: self.base.clone(),
                alias: None,
            },
        ];

        for artifact in artifacts.imports() {
            out.push(Instruction::Copy {
                from: Some(BUILDER_STAGE.to_string()),
                source: artifact.source.clone(),
                dest: artifact.dest.clone(),
            });
        }

        for (key, value) in &self.env {
            out.push(Instruction::Env {
                key: key.clone(),
                value: value.clone(),
            });
        }

        out.push(Instruction::Workdir(self.workdir.clone()));
        out.push(Instruction::Copy {
            from: None,
            source: container_relative(&self.source),
            dest: ".".to_string(),
        });
        out.push(Instruction::Expose(self.port));
        out.push(Instruction::Cmd(self.entry.clone()));
        out
    }
}

/// Render a project-relative path with forward slashes; the project root is `.`
fn container_relative(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Single-quote a shell word unless it is plainly safe
pub fn shell_word(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '=' | ':' | '+' | ','));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
