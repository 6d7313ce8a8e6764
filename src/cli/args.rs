//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// stagecraft - two-stage container image builder
///
/// Compiles native dependencies in a throwaway builder stage and ships
/// only the installed artifacts in a slim runtime image.
#[derive(Parser, Debug)]
#[command(name = "stagecraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STAGECRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local stagecraft.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Project directory (defaults to the directory holding stagecraft.toml,
    /// or the current directory)
    #[arg(short = 'C', long, global = true)]
    pub project: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project-local stagecraft.toml
    Init(InitArgs),

    /// Validate the build and show both stages
    Plan(PlanArgs),

    /// Print the generated Containerfile
    Render(RenderArgs),

    /// Build the runtime image
    Build(BuildArgs),

    /// Check container engine availability
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing stagecraft.toml
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Image tag (defaults to <image.name>:<content hash>)
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Rebuild even if the image exists, ignoring the engine's layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Always pull newer base images
    #[arg(long)]
    pub pull: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., runtime.port)
        key: String,
        /// Value to set (comma-separated for lists)
        value: String,
        /// Write to the project-local stagecraft.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_build() {
        let cli = Cli::parse_from(["stagecraft", "build", "--tag", "app:1", "--no-cache"]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.tag.as_deref(), Some("app:1"));
                assert!(args.no_cache);
                assert!(!args.pull);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_project_anywhere() {
        let cli = Cli::parse_from(["stagecraft", "build", "--project", "/srv/app"]);
        assert_eq!(cli.project, Some(PathBuf::from("/srv/app")));

        let cli = Cli::parse_from(["stagecraft", "-C", "/srv/app", "render"]);
        assert_eq!(cli.project, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn cli_parses_plan_json() {
        let cli = Cli::parse_from(["stagecraft", "plan", "--json"]);
        match cli.command {
            Commands::Plan(args) => assert!(args.json),
            _ => panic!("expected Plan command"),
        }
    }

    #[test]
    fn cli_parses_render_output() {
        let cli = Cli::parse_from(["stagecraft", "render", "-o", "Containerfile"]);
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.output, Some(PathBuf::from("Containerfile")))
            }
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["stagecraft", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parses_init_force() {
        let cli = Cli::parse_from(["stagecraft", "init", "--force"]);
        match cli.command {
            Commands::Init(args) => assert!(args.force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parses_config_set_local() {
        let cli = Cli::parse_from(["stagecraft", "config", "set", "runtime.port", "9000", "--local"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value, local }),
            }) => {
                assert_eq!(key, "runtime.port");
                assert_eq!(value, "9000");
                assert!(local);
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::parse_from(["stagecraft", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Zsh }
        ));
    }

    #[test]
    fn cli_no_local_flag() {
        let cli = Cli::parse_from(["stagecraft", "--no-local", "plan"]);
        assert!(cli.no_local);
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["stagecraft", "status"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["stagecraft", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
