//! Render command - print or write the generated Containerfile

use crate::cli::args::RenderArgs;
use crate::cli::Project;
use crate::config::Config;
use crate::error::{StagecraftError, StagecraftResult};
use crate::plan::{self, BuildPlan};
use crate::ui::{self, UiContext};
use tokio::fs;

/// Execute the render command
pub async fn execute(args: RenderArgs, config: &Config, project: &Project) -> StagecraftResult<()> {
    let plan = BuildPlan::from_config(config, &project.dir).await?;
    let containerfile = plan::render(&plan);

    match args.output {
        Some(ref path) => {
            fs::write(path, &containerfile)
                .await
                .map_err(|e| StagecraftError::io(format!("writing {}", path.display()), e))?;
            let ctx = UiContext::detect();
            ui::step_ok_detail(&ctx, "Wrote Containerfile", &path.display().to_string());
        }
        None => print!("{}", containerfile),
    }

    Ok(())
}
