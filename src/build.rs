//! Image build execution
//!
//! Renders a [`BuildPlan`], derives a content-addressed tag, and drives the
//! container engine through both stages in a single pass. Any failure
//! aborts the build; the engine never tags a partially built image.

use crate::config::{Config, ConfigManager};
use crate::error::{StagecraftError, StagecraftResult};
use crate::orchestration::{BuildOptions, ContainerRuntime, ImageInfo, IGNORE_FILE_NAME};
use crate::plan::{self, BuildPlan, ImageRef};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info, warn};

/// Everything a build needs besides the plan and the engine
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context handed to the engine
    pub project_dir: PathBuf,
    /// Repository name for the derived tag
    pub image_name: String,
    /// Path components kept out of the tag hash and the build context
    pub exclude: Vec<String>,
    /// Explicit tag; overrides the derived one
    pub tag: Option<String>,
    /// Engine flags
    pub options: BuildOptions,
    /// Parent directory for per-build scratch directories
    pub scratch_dir: PathBuf,
}

impl BuildRequest {
    pub fn from_config(config: &Config, project_dir: &Path) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            image_name: config.image.name.clone(),
            exclude: config.image.exclude.clone(),
            tag: None,
            options: BuildOptions {
                no_cache: false,
                pull: config.engine.pull,
            },
            scratch_dir: ConfigManager::builds_dir(),
        }
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Full image tag (e.g., "stagecraft-app:a1b2c3d4e5f6")
    pub image_tag: String,

    /// Whether the image already existed (no engine build ran)
    pub was_cached: bool,

    /// Metadata of the final image
    pub info: ImageInfo,
}

/// Build the runtime image described by `plan`.
///
/// Steps run strictly in order: render, hash, cache check, build, inspect.
pub async fn build_image(
    runtime: &dyn ContainerRuntime,
    plan: &BuildPlan,
    request: &BuildRequest,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> StagecraftResult<BuildOutcome> {
    let containerfile = plan::render(plan);

    let image_tag = match request.tag {
        Some(ref tag) => tag.clone(),
        None => compute_image_tag(&request.image_name, &containerfile, plan, request).await?,
    };
    ImageRef::parse(&image_tag)?;
    debug!("Image tag: {}", image_tag);

    // An explicit tag says nothing about content, so it never short-circuits
    let reuse = request.tag.is_none() && !request.options.no_cache;
    if reuse && runtime.image_exists(&image_tag).await? {
        info!("Image already built: {}", image_tag);
        let info = runtime.image_inspect(&image_tag).await?;
        return Ok(BuildOutcome {
            image_tag,
            was_cached: true,
            info,
        });
    }

    let build_dir =
        prepare_build_dir(&request.scratch_dir, &containerfile, &request.exclude).await?;
    let containerfile_path = build_dir.join("Containerfile");

    // Keep every line for classification; the engine error only carries a tail
    let captured = Mutex::new(Vec::new());
    let tee = |line: String| {
        if let Ok(mut lines) = captured.lock() {
            lines.push(line.clone());
        }
        on_output(line);
    };

    let result = runtime
        .build_image_with_progress(
            &containerfile_path,
            &request.project_dir,
            &image_tag,
            request.options,
            &tee,
        )
        .await;

    // Clean up build directory (best-effort)
    if let Err(e) = fs::remove_dir_all(&build_dir).await {
        warn!("Failed to remove {}: {}", build_dir.display(), e);
    }

    if let Err(e) = result {
        let output = captured.into_inner().unwrap_or_default();
        return Err(classify_failure(e, plan, &output));
    }

    let info = runtime.image_inspect(&image_tag).await?;
    info!("Built {} ({})", image_tag, short_id(&info.id));

    Ok(BuildOutcome {
        image_tag,
        was_cached: false,
        info,
    })
}

/// Compute a deterministic tag from the rendered Containerfile, the
/// dependency manifest and the application source tree.
async fn compute_image_tag(
    name: &str,
    containerfile: &str,
    plan: &BuildPlan,
    request: &BuildRequest,
) -> StagecraftResult<String> {
    let mut hasher = Sha256::new();

    hasher.update(containerfile.as_bytes());

    for file in plan.builder.manifest.files() {
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(file.content.as_bytes());
        hasher.update([0]);
    }

    let source_root = request.project_dir.join(&plan.runtime.source);
    for rel in collect_source_files(&source_root, &request.exclude).await? {
        let path = if rel.as_os_str().is_empty() {
            source_root.clone()
        } else {
            source_root.join(&rel)
        };
        let content = fs::read(&path)
            .await
            .map_err(|e| StagecraftError::io(format!("reading {}", rel.display()), e))?;
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(&content);
        hasher.update([0]);
    }

    let hash = hex::encode(hasher.finalize());
    Ok(format!("{}:{}", name, &hash[..12]))
}

/// Relative paths of every regular file under `root`, sorted
async fn collect_source_files(root: &Path, exclude: &[String]) -> StagecraftResult<Vec<PathBuf>> {
    let meta = fs::metadata(root)
        .await
        .map_err(|_| StagecraftError::SourcePathMissing(root.to_path_buf()))?;

    if meta.is_file() {
        // Single-file source hashes under an empty relative path
        return Ok(vec![PathBuf::new()]);
    }

    let mut files = Vec::new();
    let mut stack = vec![PathBuf::new()];

    while let Some(rel) = stack.pop() {
        let dir = root.join(&rel);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StagecraftError::io(format!("reading {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StagecraftError::io(format!("reading {}", dir.display()), e))?
        {
            let name = entry.file_name();
            if exclude.iter().any(|e| name.to_str() == Some(e.as_str())) {
                continue;
            }

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StagecraftError::io(format!("inspecting {}", name.to_string_lossy()), e))?;
            let child = rel.join(&name);
            if file_type.is_dir() {
                stack.push(child);
            } else if file_type.is_file() {
                files.push(child);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Write the Containerfile and its ignore file into a fresh scratch directory
async fn prepare_build_dir(
    scratch_dir: &Path,
    containerfile: &str,
    exclude: &[String],
) -> StagecraftResult<PathBuf> {
    let build_id = uuid::Uuid::new_v4().to_string();
    let build_dir = scratch_dir.join(&build_id);
    fs::create_dir_all(&build_dir)
        .await
        .map_err(|e| StagecraftError::io("creating build directory", e))?;

    fs::write(build_dir.join("Containerfile"), containerfile)
        .await
        .map_err(|e| StagecraftError::io("writing Containerfile", e))?;

    fs::write(build_dir.join(IGNORE_FILE_NAME), ignore_patterns(exclude))
        .await
        .map_err(|e| StagecraftError::io(format!("writing {}", IGNORE_FILE_NAME), e))?;

    Ok(build_dir)
}

/// Ignore file matching each excluded name at any depth, the same way the
/// tag hash skips it
fn ignore_patterns(exclude: &[String]) -> String {
    let mut out = String::new();
    for name in exclude {
        out.push_str(&format!("{name}\n**/{name}\n"));
    }
    out
}

/// Map an unclassified engine failure onto the build error taxonomy.
///
/// `output` is the full streamed build output; the error's own reason is
/// searched after it.
fn classify_failure(err: StagecraftError, plan: &BuildPlan, output: &[String]) -> StagecraftError {
    let StagecraftError::ImageBuild { tag, reason } = err else {
        return err;
    };

    let cache_path = plan
        .builder
        .toolchain_cache
        .as_ref()
        .map(|c| c.path.as_str());

    let find = |pred: &dyn Fn(&str) -> bool| {
        output
            .iter()
            .map(String::as_str)
            .chain(reason.lines())
            .find(|line| pred(line))
            .map(|line| line.trim().to_string())
    };

    if let Some(detail) = find(&|line: &str| {
        line.contains("Read-only file system")
            || (line.contains("Permission denied")
                && (line.contains("cargo") || cache_path.is_some_and(|p| line.contains(p))))
    }) {
        return StagecraftError::CachePathNotWritable { detail };
    }

    if let Some(detail) = find(&|line: &str| {
        line.contains("Unable to locate package")
            || line.contains("has no installation candidate")
            || line.contains("Temporary failure resolving")
            || line.contains("can't find Rust compiler")
            || line.contains("command 'gcc' failed")
            || line.contains("gcc: not found")
            || line.contains("cc: not found")
    }) {
        return StagecraftError::ToolchainUnavailable { detail };
    }

    if let Some(detail) = find(&|line: &str| {
        line.contains("No matching distribution found")
            || line.contains("Could not find a version that satisfies")
            || line.contains("ResolutionImpossible")
            || line.contains("conflicting dependencies")
            || line.contains("Invalid requirement")
    }) {
        return StagecraftError::DependencyResolution { detail };
    }

    if let Some(detail) = find(&|line: &str| {
        line.contains("failed to compute cache key")
            || (line.contains("no such file or directory")
                && (line.contains("copier") || line.contains("checking on sources")))
    }) {
        return StagecraftError::CopySourceMissing { detail };
    }

    StagecraftError::ImageBuild { tag, reason }
}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    &id[..12.min(id.len())]
}
