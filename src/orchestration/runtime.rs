//! Container runtime abstraction
//!
//! Provides a trait for the image operations a build needs, so the build
//! can be driven by Podman, Docker, or a fake in tests.

use crate::error::StagecraftResult;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Options forwarded to the engine's build command
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Ignore the engine's layer cache
    pub no_cache: bool,
    /// Always try to pull newer base images
    pub pull: bool,
}

/// Metadata of a built image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Image ID
    pub id: String,
    /// Size in bytes
    pub size: u64,
    /// Declared ports, e.g. `8000/tcp`
    pub exposed_ports: Vec<String>,
    /// Launch command
    pub cmd: Vec<String>,
    /// Working directory
    pub workdir: String,
}

/// Abstract container runtime interface
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check if the runtime is available on this system
    async fn is_available(&self) -> StagecraftResult<bool>;

    /// Ensure the runtime can serve requests
    async fn ensure_ready(&self) -> StagecraftResult<()>;

    /// Check whether an image tag exists locally
    async fn image_exists(&self, image: &str) -> StagecraftResult<bool>;

    /// Build `containerfile` against `context`, tagging the result as `tag`.
    /// Each output line is passed to `on_output` as it arrives.
    async fn build_image_with_progress(
        &self,
        containerfile: &Path,
        context: &Path,
        tag: &str,
        options: BuildOptions,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()>;

    /// Read metadata of a local image
    async fn image_inspect(&self, image: &str) -> StagecraftResult<ImageInfo>;

    /// Get the human-readable runtime name for display
    fn runtime_name(&self) -> &'static str;
}
