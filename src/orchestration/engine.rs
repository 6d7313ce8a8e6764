//! CLI-driven container engine
//!
//! Implements the ContainerRuntime trait by shelling out to `podman` or
//! `docker`. Both speak the same build and inspect dialect for everything
//! a two-stage build needs.

use crate::error::{StagecraftError, StagecraftResult};
use crate::orchestration::factory::EngineKind;
use crate::orchestration::runtime::{BuildOptions, ContainerRuntime, ImageInfo};
use crate::orchestration::IGNORE_FILE_NAME;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Container engine driven through its command line
pub struct CliEngine {
    kind: EngineKind,
}

impl CliEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self { kind }
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[&str]) -> StagecraftResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.kind, args);

        Command::new(self.kind.binary())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StagecraftError::command_failed(format!("{} {:?}", self.kind, args), e))
    }

    /// Arguments for `build`, without the binary name
    pub fn build_args(
        &self,
        containerfile: &Path,
        context: &Path,
        tag: &str,
        options: BuildOptions,
    ) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--file".to_string(),
            containerfile.display().to_string(),
            "--tag".to_string(),
            tag.to_string(),
            // Drop intermediate containers even when a step fails
            "--force-rm".to_string(),
        ];

        match self.kind {
            EngineKind::Docker => {
                // BuildKit's default TTY output cannot be parsed line by line
                args.push("--progress=plain".to_string());
            }
            EngineKind::Podman => {
                let ignore_file = containerfile.with_file_name(IGNORE_FILE_NAME);
                if ignore_file.is_file() {
                    args.push("--ignorefile".to_string());
                    args.push(ignore_file.display().to_string());
                }
            }
        }
        if options.no_cache {
            args.push("--no-cache".to_string());
        }
        if options.pull {
            args.push("--pull".to_string());
        }

        args.push(context.display().to_string());
        args
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectImage {
    id: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    config: Option<InspectConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    exposed_ports: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    cmd: Option<Vec<String>>,
    #[serde(default)]
    working_dir: Option<String>,
}

/// Parse `image inspect` JSON output (an array with one object per image)
pub(crate) fn parse_inspect(json: &str) -> StagecraftResult<ImageInfo> {
    let mut images: Vec<InspectImage> = serde_json::from_str(json)?;
    if images.is_empty() {
        return Err(StagecraftError::Internal(
            "image inspect returned no images".to_string(),
        ));
    }
    let image = images.swap_remove(0);
    let config = image.config.unwrap_or_default();

    Ok(ImageInfo {
        id: image.id,
        size: image.size,
        exposed_ports: config
            .exposed_ports
            .map(|ports| ports.into_keys().collect())
            .unwrap_or_default(),
        cmd: config.cmd.unwrap_or_default(),
        workdir: config.working_dir.unwrap_or_default(),
    })
}

#[async_trait]
impl ContainerRuntime for CliEngine {
    async fn is_available(&self) -> StagecraftResult<bool> {
        let installed = Command::new(self.kind.binary())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        Ok(installed)
    }

    async fn ensure_ready(&self) -> StagecraftResult<()> {
        if !self.is_available().await? {
            return Err(StagecraftError::EngineNotFound);
        }

        let output = self.exec(&["info"]).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StagecraftError::EngineNotReady {
                name: self.kind.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn image_exists(&self, image: &str) -> StagecraftResult<bool> {
        let output = self.exec(&["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    async fn build_image_with_progress(
        &self,
        containerfile: &Path,
        context: &Path,
        tag: &str,
        options: BuildOptions,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()> {
        let args = self.build_args(containerfile, context, tag, options);
        info!("Building {} with {}", tag, self.kind);
        debug!("Executing: {} {:?}", self.kind, args);

        let mut child = Command::new(self.kind.binary())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StagecraftError::command_failed(format!("{} build", self.kind), e))?;

        let all_output = super::stream_child_output(&mut child, on_output).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| StagecraftError::command_failed(format!("{} build", self.kind), e))?;

        if !status.success() {
            let combined = all_output.join("\n");
            let tail = super::build_error_output(&combined, "");
            return Err(StagecraftError::ImageBuild {
                tag: tag.to_string(),
                reason: tail,
            });
        }

        Ok(())
    }

    async fn image_inspect(&self, image: &str) -> StagecraftResult<ImageInfo> {
        let output = self.exec(&["image", "inspect", image]).await?;
        if !output.status.success() {
            return Err(StagecraftError::ImageNotFound(image.to_string()));
        }
        parse_inspect(&String::from_utf8_lossy(&output.stdout))
    }

    fn runtime_name(&self) -> &'static str {
        match self.kind {
            EngineKind::Podman => "Podman",
            EngineKind::Docker => "Docker",
        }
    }
}
