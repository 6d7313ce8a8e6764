//! Orchestration module for container engines
//!
//! Builds run through the engine's CLI:
//! - Podman (preferred, rootless)
//! - Docker

mod engine;
mod factory;
mod runtime;

pub use engine::CliEngine;
pub use factory::{create_runtime, EngineKind};
pub use runtime::{BuildOptions, ContainerRuntime, ImageInfo};

use crate::error::{StagecraftError, StagecraftResult};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ignore file written next to the Containerfile. BuildKit picks it up by
/// name; Podman gets it through `--ignorefile`.
pub const IGNORE_FILE_NAME: &str = "Containerfile.dockerignore";

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of build output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `BUILD_ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > BUILD_ERROR_TAIL_LINES {
        lines[total - BUILD_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines for error reporting. This is a standalone
/// async function (not behind `async_trait`) to avoid lifetime issues with the
/// `dyn Fn` callback.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> StagecraftResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| StagecraftError::Internal("child stderr not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| StagecraftError::Internal("child stdout not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok(all_output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_output_keeps_tail() {
        let stdout: String = (0..80).map(|i| format!("line {}\n", i)).collect();
        let tail = build_error_output(&stdout, "boom");
        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), BUILD_ERROR_TAIL_LINES);
        assert_eq!(*lines.last().unwrap(), "boom");
        assert_eq!(lines[0], "line 31");
    }

    #[test]
    fn error_output_short_input_unchanged() {
        assert_eq!(build_error_output("a\nb", "c"), "a\nb\nc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stream_collects_both_pipes() {
        use std::process::Stdio;
        use std::sync::Mutex;

        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "echo out; echo err 1>&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let seen = Mutex::new(Vec::new());
        let lines = stream_child_output(&mut child, &|line| seen.lock().unwrap().push(line))
            .await
            .unwrap();
        child.wait().await.unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"out".to_string()));
        assert!(lines.contains(&"err".to_string()));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
