//! Plan command - validate the build and show both stages

use crate::cli::args::PlanArgs;
use crate::cli::Project;
use crate::config::Config;
use crate::error::StagecraftResult;
use crate::plan::BuildPlan;
use crate::ui::{self, UiContext};

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config, project: &Project) -> StagecraftResult<()> {
    let plan = BuildPlan::from_config(config, &project.dir).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let ctx = UiContext::detect();
    ui::intro(&ctx, "stagecraft plan");
    ui::key_value(&ctx, "Project", &project.dir.display().to_string());
    if let Some(ref local) = project.local_config {
        ui::key_value(&ctx, "Config", &local.display().to_string());
    }

    ui::section(&ctx, "Builder stage");
    ui::key_value(&ctx, "Base image", &plan.builder.base.to_string());
    ui::key_value(&ctx, "System packages", &plan.builder.system_packages.join(" "));
    ui::key_value(
        &ctx,
        "Manifest",
        &format!(
            "{} ({} requirements)",
            plan.builder.manifest.path().display(),
            plan.builder.manifest.requirements().count()
        ),
    );
    match plan.builder.toolchain_cache {
        Some(ref cache) => ui::key_value(
            &ctx,
            "Toolchain cache",
            &format!("{}={}", cache.env_var, cache.path),
        ),
        None => ui::step_warn_hint(
            &ctx,
            "Toolchain cache redirection disabled",
            "Native builds may fail writing to a read-only default cache path",
        ),
    }

    ui::section(&ctx, "Artifacts");
    for artifact in plan.artifacts.imports() {
        ui::key_value(
            &ctx,
            &artifact.name,
            &format!("{} -> {}", artifact.source, artifact.dest),
        );
    }

    ui::section(&ctx, "Runtime stage");
    ui::key_value(&ctx, "Base image", &plan.runtime.base.to_string());
    ui::key_value(&ctx, "Workdir", &plan.runtime.workdir);
    ui::key_value(&ctx, "Port", &plan.runtime.port.to_string());
    ui::key_value(&ctx, "Entry", &plan.runtime.entry.join(" "));

    // Shown for reference only; differing versions are not an error
    let unknown = || "unknown".to_string();
    ui::key_value(
        &ctx,
        "Interpreter",
        &format!(
            "builder {}, runtime {}",
            plan.builder.base.runtime_version().unwrap_or_else(unknown),
            plan.runtime.base.runtime_version().unwrap_or_else(unknown)
        ),
    );

    ui::outro_success(&ctx, "Plan is valid");
    Ok(())
}
