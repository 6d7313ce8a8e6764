//! Build command - produce the runtime image

use crate::build::{self, BuildOutcome, BuildRequest};
use crate::build_log::{self, BuildLog};
use crate::cli::args::BuildArgs;
use crate::cli::Project;
use crate::config::Config;
use crate::error::StagecraftResult;
use crate::orchestration::create_runtime;
use crate::plan::BuildPlan;
use crate::ui::{self, BuildProgress, TaskSpinner, UiContext};
use tracing::{debug, error};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config, project: &Project) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    let log = BuildLog::new(config);
    debug!("Build id: {}", log.build_id());

    ui::intro(&ctx, "stagecraft build");

    let plan = BuildPlan::from_config(config, &project.dir).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Checking container engine...");
    let runtime = match create_runtime(config).await {
        Ok(runtime) => runtime,
        Err(e) => {
            spinner.stop_error("No container engine");
            return Err(e);
        }
    };
    if let Err(e) = runtime.ensure_ready().await {
        spinner.stop_error(&format!("{} is not ready", runtime.runtime_name()));
        return Err(e);
    }
    spinner.stop(&format!("{} ready", runtime.runtime_name()));

    let mut request = BuildRequest::from_config(config, &project.dir);
    request.tag = args.tag;
    request.options.no_cache = args.no_cache;
    request.options.pull |= args.pull;

    log.log(
        build_log::EVENT_STARTED,
        &serde_json::json!({
            "project": project.dir.display().to_string(),
            "engine": runtime.runtime_name(),
            "builder_image": plan.builder.base.to_string(),
            "runtime_image": plan.runtime.base.to_string(),
            "no_cache": request.options.no_cache,
        }),
    )
    .await;

    let progress = BuildProgress::new(&ctx, &config.image.name);
    let result =
        build::build_image(&*runtime, &plan, &request, &|line: String| progress.on_line(line)).await;
    progress.finish();

    match result {
        Ok(outcome) => {
            report_success(&ctx, &log, &outcome).await;
            Ok(())
        }
        Err(e) => {
            error!("Build failed: {}", e);
            log.log(
                build_log::EVENT_FAILED,
                &serde_json::json!({
                    "error": e.to_string(),
                    "phase": if e.is_build_failure() { "engine" } else { "setup" },
                }),
            )
            .await;
            ui::outro_error(&ctx, "Build failed");
            Err(e)
        }
    }
}

async fn report_success(ctx: &UiContext, log: &BuildLog, outcome: &BuildOutcome) {
    let event = if outcome.was_cached {
        build_log::EVENT_CACHED
    } else {
        build_log::EVENT_SUCCEEDED
    };
    log.log(
        event,
        &serde_json::json!({
            "image": outcome.image_tag,
            "info": outcome.info,
        }),
    )
    .await;

    if outcome.was_cached {
        ui::step_info(ctx, "Image up to date, nothing to build");
    }
    ui::key_value(ctx, "Image", &outcome.image_tag);
    ui::key_value(ctx, "Size", &format_size(outcome.info.size));
    if !outcome.info.exposed_ports.is_empty() {
        ui::key_value(ctx, "Ports", &outcome.info.exposed_ports.join(", "));
    }
    ui::key_value(ctx, "Command", &outcome.info.cmd.join(" "));
    ui::outro_success(ctx, &format!("Built {}", outcome.image_tag));
}

fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let mb = bytes as f64 / MB;
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{:.1} MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(152 * 1024 * 1024), "152.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
