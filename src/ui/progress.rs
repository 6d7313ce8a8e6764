//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// A parsed build step header
#[derive(Debug, PartialEq, Eq)]
struct Step<'a> {
    /// Stage label when the engine prints one (`builder`, `stage-1`, `1/2`)
    stage: Option<&'a str>,
    n: u64,
    total: u64,
    instruction: &'a str,
}

/// Progress bar for two-stage image builds.
///
/// Understands Podman `[k/m] STEP N/M: <instruction>` lines and Docker
/// plain-progress `#N [stage k/m] <instruction>` lines. Shows an indicatif
/// bar in interactive mode, or plain step lines in CI.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            let bar_style = ProgressStyle::default_bar()
                .template("  {spinner:.blue} Building {prefix}  {bar:20.blue/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(bar_style);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Building {}...", label);
            None
        };
        Self { bar }
    }

    /// Process a build output line
    pub fn on_line(&self, line: String) {
        if let Some(step) = parse_step_line(&line) {
            if let Some(ref bar) = self.bar {
                bar.set_length(step.total);
                bar.set_position(step.n);
                bar.set_message(step.instruction.to_string());
            } else {
                match step.stage {
                    Some(stage) => println!(
                        "  [{}] STEP {}/{}: {}",
                        stage, step.n, step.total, step.instruction
                    ),
                    None => println!("  STEP {}/{}: {}", step.n, step.total, step.instruction),
                }
            }
        } else if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !is_build_noise(trimmed) {
                bar.set_message(truncate(trimmed, 60));
            }
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max - 3).collect();
    format!("{}...", head)
}

/// Engine bookkeeping lines that aren't worth showing
fn is_build_noise(line: &str) -> bool {
    line.starts_with("--->")
        || line.starts_with("-->")
        || line.starts_with("Removing intermediate")
        || line.starts_with("COMMIT")
        || line.starts_with("#0 building with")
        || (line.starts_with('#') && line.contains(" DONE "))
}

fn parse_step_line(line: &str) -> Option<Step<'_>> {
    parse_podman_step(line).or_else(|| parse_docker_step(line))
}

/// `STEP 3/7: RUN ...`, optionally prefixed by a `[1/2] ` stage counter
fn parse_podman_step(line: &str) -> Option<Step<'_>> {
    let (stage, rest) = match line.strip_prefix('[') {
        Some(bracketed) => {
            let close = bracketed.find("] ")?;
            (Some(&bracketed[..close]), &bracketed[close + 2..])
        }
        None => (None, line),
    };

    let rest = rest.strip_prefix("STEP ")?;
    let slash = rest.find('/')?;
    let colon = rest.find(':')?;
    if colon <= slash {
        return None;
    }
    let n: u64 = rest[..slash].parse().ok()?;
    let total: u64 = rest[slash + 1..colon].parse().ok()?;
    Some(Step {
        stage,
        n,
        total,
        instruction: rest[colon + 1..].trim(),
    })
}

/// `#7 [builder 2/6] RUN ...`
fn parse_docker_step(line: &str) -> Option<Step<'_>> {
    let rest = line.strip_prefix('#')?;
    let space = rest.find(' ')?;
    rest[..space].parse::<u64>().ok()?;

    let rest = rest[space + 1..].strip_prefix('[')?;
    let close = rest.find(']')?;
    let header = &rest[..close];
    let instruction = rest[close + 1..].trim();

    let (stage, counter) = header.rsplit_once(' ')?;
    let (n, total) = counter.split_once('/')?;
    Some(Step {
        stage: Some(stage.trim()),
        n: n.parse().ok()?,
        total: total.parse().ok()?,
        instruction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Checking engine...");
        spinner.stop("podman ready");
    }

    #[test]
    fn parse_podman_single_stage_line() {
        let step = parse_step_line("STEP 3/7: RUN apt-get update").unwrap();
        assert_eq!(step.stage, None);
        assert_eq!((step.n, step.total), (3, 7));
        assert_eq!(step.instruction, "RUN apt-get update");
    }

    #[test]
    fn parse_podman_multi_stage_line() {
        let step = parse_step_line("[2/2] STEP 1/8: FROM python:3.11-slim").unwrap();
        assert_eq!(step.stage, Some("2/2"));
        assert_eq!((step.n, step.total), (1, 8));
        assert_eq!(step.instruction, "FROM python:3.11-slim");
    }

    #[test]
    fn parse_docker_plain_line() {
        let step = parse_step_line("#9 [builder 4/5] RUN CARGO_HOME=/tmp/cargo pip install").unwrap();
        assert_eq!(step.stage, Some("builder"));
        assert_eq!((step.n, step.total), (4, 5));
        assert_eq!(step.instruction, "RUN CARGO_HOME=/tmp/cargo pip install");

        let step = parse_step_line("#12 [stage-1 2/7] COPY --from=builder /install/lib /usr/local/lib").unwrap();
        assert_eq!(step.stage, Some("stage-1"));
    }

    #[test]
    fn parse_step_line_not_a_step() {
        assert!(parse_step_line("---> abc123def").is_none());
        assert!(parse_step_line("#9 0.512 Collecting fastapi").is_none());
        assert!(parse_step_line("[notes] plain text").is_none());
        assert!(parse_step_line("").is_none());
    }

    #[test]
    fn build_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = BuildProgress::new(&ctx, "stagecraft-app");
        progress.on_line("[1/2] STEP 1/5: FROM python:3.11-slim AS builder".to_string());
        progress.on_line("---> abc123".to_string());
        progress.on_line("Collecting fastapi".to_string());
        progress.finish();
    }

    #[test]
    fn is_build_noise_filters_engine_internals() {
        assert!(is_build_noise("---> abc123def"));
        assert!(is_build_noise("--> Using cache abc123"));
        assert!(is_build_noise("COMMIT stagecraft-app:abc"));
        assert!(is_build_noise("#5 DONE 0.3s"));
        assert!(!is_build_noise("Building wheel for cryptography"));
        assert!(!is_build_noise(""));
    }

    #[test]
    fn truncate_long_lines() {
        assert_eq!(truncate("short", 60), "short");
        let long = "x".repeat(100);
        assert_eq!(truncate(&long, 10), "xxxxxxx...");
    }
}
