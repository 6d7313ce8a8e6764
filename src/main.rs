//! stagecraft - two-stage container image builder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use stagecraft::cli::{Cli, Commands, Project};
use stagecraft::config::ConfigManager;
use stagecraft::error::{StagecraftError, StagecraftResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StagecraftResult<()> {
    let cli = Cli::parse();
    stagecraft::ui::init_theme();

    // Commands that need no config
    match cli.command {
        Commands::Init(args) => {
            init_logging(cli.verbose, false);
            return stagecraft::cli::commands::init(args).await;
        }
        Commands::Completions { shell } => {
            stagecraft::cli::commands::completions(shell);
            return Ok(());
        }
        _ => {}
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let start = match cli.project {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| StagecraftError::io("getting current directory", e))?,
    };
    let project = Project::discover(&start, !cli.no_local);

    let config = config_manager
        .load_merged(project.local_config.as_deref())
        .await?;

    init_logging(cli.verbose, config.general.log_format == "json");
    if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
    } else if let Some(ref path) = project.local_config {
        debug!("Found local config: {}", path.display());
    }

    ConfigManager::ensure_state_dirs().await?;

    match cli.command {
        Commands::Init(_) | Commands::Completions { .. } => Ok(()),
        Commands::Plan(args) => stagecraft::cli::commands::plan(args, &config, &project).await,
        Commands::Render(args) => stagecraft::cli::commands::render(args, &config, &project).await,
        Commands::Build(args) => stagecraft::cli::commands::build(args, &config, &project).await,
        Commands::Status => stagecraft::cli::commands::status(&config, &project).await,
        Commands::Config(args) => {
            stagecraft::cli::commands::config(args, &config, &config_manager, &project).await
        }
    }
}

/// 0 = warn (progress only), 1 = info, 2+ = debug. Logs go to stderr.
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("stagecraft=warn"),
        1 => EnvFilter::new("stagecraft=info"),
        _ => EnvFilter::new("stagecraft=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
