//! Status command - check container engines and config locations

use crate::cli::Project;
use crate::config::{Config, ConfigManager};
use crate::error::StagecraftResult;
use crate::orchestration::{create_runtime, CliEngine, ContainerRuntime, EngineKind};
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config, project: &Project) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "stagecraft status");

    ui::section(&ctx, "Container engines");
    for kind in EngineKind::preference() {
        check_engine(&ctx, kind).await;
    }

    ui::section(&ctx, "Selected engine");
    match create_runtime(config).await {
        Ok(runtime) => ui::key_value_status(
            &ctx,
            &format!("engine.binary = {}", config.engine.binary),
            runtime.runtime_name(),
            true,
        ),
        Err(e) => {
            ui::step_error_detail(&ctx, "No usable engine", &e.to_string());
            if let Some(hint) = e.hint() {
                ui::remark(&ctx, hint);
            }
        }
    }

    ui::section(&ctx, "Configuration");
    ui::key_value(
        &ctx,
        "Global",
        &ConfigManager::default_config_path().display().to_string(),
    );
    match project.local_config {
        Some(ref path) => ui::key_value(&ctx, "Local", &path.display().to_string()),
        None => ui::key_value(&ctx, "Local", "none"),
    }
    ui::key_value(
        &ctx,
        "Build log",
        &ConfigManager::build_log_path().display().to_string(),
    );

    Ok(())
}

async fn check_engine(ctx: &UiContext, kind: EngineKind) {
    let engine = CliEngine::new(kind);

    if !engine.is_available().await.unwrap_or(false) {
        ui::step_warn(ctx, &format!("{}: not installed", kind));
        return;
    }

    match engine.ensure_ready().await {
        Ok(()) => ui::step_ok_detail(ctx, &kind.to_string(), "ready"),
        Err(e) => ui::step_error_detail(ctx, &kind.to_string(), &e.to_string()),
    }
}
