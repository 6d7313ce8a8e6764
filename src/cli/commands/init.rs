//! Init command - create project-local stagecraft.toml

use crate::cli::args::InitArgs;
use crate::config::LOCAL_CONFIG_NAME;
use crate::error::{StagecraftError, StagecraftResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for project-local config
const INIT_TEMPLATE: &str = r#"# stagecraft project configuration
# Settings here override your global config (~/.config/stagecraft/config.toml)

[image]
name = "stagecraft-app"
# exclude = [".git", "__pycache__", ".venv", "stagecraft.toml"]

[builder]
# base_image = "python:3.11-slim"
# system_packages = ["build-essential", "gcc", "libffi-dev", "libssl-dev", "cargo"]
# manifest = "requirements.txt"
# install_prefix = "/install"

# Native extensions compiled with cargo need a writable CARGO_HOME
[builder.toolchain_cache]
# enabled = true
# env_var = "CARGO_HOME"
# path = "/tmp/cargo"

[runtime]
# base_image = "python:3.11-slim"   # keep the interpreter version in step with builder
# workdir = "/app"
# source = "."
# port = 8000
# entry = ["python", "main.py"]

# [runtime.env]
# PYTHONUNBUFFERED = "1"

# Only these paths cross from builder to runtime. Omit to use
# <install_prefix>/lib -> /usr/local/lib and <install_prefix>/bin -> /usr/local/bin
# [[artifacts]]
# name = "site-packages"
# source = "/install/lib"
# dest = "/usr/local/lib"
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> StagecraftResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| StagecraftError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(LOCAL_CONFIG_NAME);

    if config_path.exists() && !args.force {
        return Err(StagecraftError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| StagecraftError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );
    if !target_dir.join("requirements.txt").exists() {
        ui::step_warn_hint(
            &ctx,
            "No requirements.txt next to it",
            "Create one or set builder.manifest",
        );
    }

    Ok(())
}

async fn ensure_dir(dir: &Path) -> StagecraftResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).await.map_err(|e| {
            StagecraftError::io(format!("creating directory {}", dir.display()), e)
        })?;
    }
    Ok(())
}
