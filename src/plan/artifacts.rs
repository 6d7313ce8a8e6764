//! Cross-stage artifact manifest
//!
//! The declared list of directories stage one exports and stage two
//! imports. Nothing else produced in the builder is reachable from the
//! runtime image, and `verify` rejects entries that would drag build-only
//! state (toolchain cache, package-manager metadata) across.

use crate::config::schema::ArtifactConfig;
use crate::error::{StagecraftError, StagecraftResult};
use crate::plan::stage::{BuilderStage, APT_LISTS_DIR};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path};

/// Build-only locations that must never cross into the runtime image
const BUILD_ONLY_DIRS: [&str; 3] = [APT_LISTS_DIR, "/var/cache/apt", "/root/.cache"];

/// A single exported directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    /// Absolute path in the builder
    pub source: String,
    /// Absolute path in the runtime image
    pub dest: String,
}

/// Ordered set of artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactManifest {
    entries: Vec<Artifact>,
}

impl ArtifactManifest {
    pub fn from_config(artifacts: &[ArtifactConfig]) -> Self {
        Self {
            entries: artifacts
                .iter()
                .map(|a| Artifact {
                    name: a.name.clone(),
                    source: a.source.clone(),
                    dest: a.dest.clone(),
                })
                .collect(),
        }
    }

    /// Paths the builder must produce
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|a| a.source.as_str())
    }

    /// Copies the runtime stage performs
    pub fn imports(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the manifest against the builder that has to satisfy it
    pub fn verify(&self, builder: &BuilderStage) -> StagecraftResult<()> {
        if self.entries.is_empty() {
            return Err(StagecraftError::ArtifactInvalid {
                name: "<none>".to_string(),
                reason: "at least one artifact directory must be exported".to_string(),
            });
        }

        let prefix = &builder.install_prefix;
        let mut names = HashSet::new();
        let mut dests = HashSet::new();

        let mut forbidden: Vec<&str> = BUILD_ONLY_DIRS.to_vec();
        if let Some(ref cache) = builder.toolchain_cache {
            forbidden.push(&cache.path);
        }

        for artifact in &self.entries {
            let invalid = |reason: String| StagecraftError::ArtifactInvalid {
                name: artifact.name.clone(),
                reason,
            };

            if artifact.name.trim().is_empty() {
                return Err(invalid("artifact name is empty".to_string()));
            }
            if !names.insert(artifact.name.as_str()) {
                return Err(invalid("duplicate artifact name".to_string()));
            }
            if !is_clean_absolute(&artifact.source) {
                return Err(invalid(format!(
                    "source {} must be an absolute path without '..'",
                    artifact.source
                )));
            }
            if !is_clean_absolute(&artifact.dest) {
                return Err(invalid(format!(
                    "destination {} must be an absolute path without '..'",
                    artifact.dest
                )));
            }
            if !dests.insert(normalized(&artifact.dest)) {
                return Err(invalid(format!("destination {} is used twice", artifact.dest)));
            }
            if !is_within(&artifact.source, prefix) {
                return Err(invalid(format!(
                    "source {} is not produced by the install step (outside {})",
                    artifact.source, prefix
                )));
            }
            for dir in &forbidden {
                if is_within(&artifact.source, dir) || is_within(dir, &artifact.source) {
                    return Err(invalid(format!(
                        "source {} overlaps build-only directory {}",
                        artifact.source, dir
                    )));
                }
            }
        }

        Ok(())
    }
}

fn is_clean_absolute(path: &str) -> bool {
    let path = Path::new(path);
    path.is_absolute() && !path.components().any(|c| c == Component::ParentDir)
}

fn normalized(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
    format!("/{}", parts.join("/"))
}

/// Whether `child` equals `parent` or lies below it
fn is_within(child: &str, parent: &str) -> bool {
    let child = normalized(child);
    let parent = normalized(parent);
    parent == "/" || child == parent || child.starts_with(&format!("{}/", parent))
}
