//! Containerfile rendering
//!
//! Turns a [`BuildPlan`] into the text handed to the container engine.
//! Output is deterministic for a given plan.

use crate::plan::stage::Instruction;
use crate::plan::BuildPlan;
use std::fmt;

const HEADER: &str = "# Generated by stagecraft. Edit stagecraft.toml instead.";

/// Render the full two-stage Containerfile
pub fn render(plan: &BuildPlan) -> String {
    let mut lines = vec![HEADER.to_string(), String::new()];

    for instruction in plan.builder_instructions() {
        lines.push(instruction.to_string());
    }

    lines.push(String::new());

    for instruction in plan.runtime_instructions() {
        lines.push(instruction.to_string());
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Comment(text) => write!(f, "# {}", text),
            Instruction::From { image, alias } => match alias {
                Some(alias) => write!(f, "FROM {} AS {}", image, alias),
                None => write!(f, "FROM {}", image),
            },
            Instruction::Workdir(dir) => write!(f, "WORKDIR {}", dir),
            Instruction::Run(command) => write!(f, "RUN {}", command),
            Instruction::Env { key, value } => write!(f, "ENV {}={}", key, dockerfile_quote(value)),
            Instruction::Copy { from, source, dest } => {
                write!(f, "COPY ")?;
                if let Some(stage) = from {
                    write!(f, "--from={} ", stage)?;
                }
                if needs_json_form(source) || needs_json_form(dest) {
                    let json = serde_json::to_string(&[source, dest]).map_err(|_| fmt::Error)?;
                    write!(f, "{}", json)
                } else {
                    write!(f, "{} {}", source, dest)
                }
            }
            Instruction::Expose(port) => write!(f, "EXPOSE {}", port),
            Instruction::Cmd(args) => {
                // JSON exec form; serde_json handles escaping
                let json = serde_json::to_string(args).map_err(|_| fmt::Error)?;
                write!(f, "CMD {}", json)
            }
        }
    }
}

/// Paths the whitespace-split COPY form would misread
fn needs_json_form(path: &str) -> bool {
    path.chars()
        .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\')
}

/// Quote a value for Dockerfile ENV instruction.
/// Values containing $ (variable references) must be quoted properly.
/// Embedded double quotes and backslashes are escaped to prevent injection.
fn dockerfile_quote(value: &str) -> String {
    if value.is_empty()
        || value.contains('$')
        || value.contains(' ')
        || value.contains('"')
        || value.contains('\\')
    {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::Path;
    use tempfile::TempDir;

    async fn plan_for(config: &Config, requirements: &str) -> (TempDir, BuildPlan) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.txt"), requirements).unwrap();
        std::fs::write(temp.path().join("main.py"), "print('hi')\n").unwrap();
        let plan = BuildPlan::from_config(config, temp.path()).await.unwrap();
        (temp, plan)
    }

    #[tokio::test]
    async fn renders_default_service_image() {
        let (_temp, plan) = plan_for(&Config::default(), "fastapi==0.104.1\nbcrypt\n").await;
        let text = render(&plan);

        let expected = "\
# Generated by stagecraft. Edit stagecraft.toml instead.

# Stage 1: toolchain and dependency closure
FROM python:3.11-slim AS builder
WORKDIR /build
RUN apt-get update && apt-get install -y --no-install-recommends build-essential gcc libffi-dev libssl-dev cargo && rm -rf /var/lib/apt/lists/*
COPY requirements.txt ./requirements.txt
RUN mkdir -p /install/lib /install/bin /tmp/cargo && CARGO_HOME=/tmp/cargo pip install --no-cache-dir --prefix=/install -r requirements.txt

# Stage 2: runtime image
FROM python:3.11-slim
COPY --from=builder /install/lib /usr/local/lib
COPY --from=builder /install/bin /usr/local/bin
WORKDIR /app
COPY . .
EXPOSE 8000
CMD [\"python\",\"main.py\"]
";
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn render_is_deterministic() {
        let (_a, plan_a) = plan_for(&Config::default(), "fastapi\n").await;
        let (_b, plan_b) = plan_for(&Config::default(), "fastapi\n").await;
        assert_eq!(render(&plan_a), render(&plan_b));
    }

    #[tokio::test]
    async fn runtime_stage_holds_no_build_only_paths() {
        let (_temp, plan) = plan_for(&Config::default(), "cryptography\n").await;
        let text = render(&plan);
        let runtime = text.split("# Stage 2").nth(1).unwrap();

        assert!(!runtime.contains("/tmp/cargo"));
        assert!(!runtime.contains("CARGO_HOME"));
        assert!(!runtime.contains("apt"));
        assert!(!runtime.contains("RUN "));
        assert_eq!(runtime.matches("--from=builder").count(), 2);
    }

    #[tokio::test]
    async fn runtime_env_is_sorted_and_quoted() {
        let mut config = Config::default();
        config
            .runtime
            .env
            .insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        config
            .runtime
            .env
            .insert("GREETING".to_string(), "hello world".to_string());
        let (_temp, plan) = plan_for(&config, "").await;
        let text = render(&plan);

        let greeting = text.find("ENV GREETING=\"hello world\"").unwrap();
        let unbuffered = text.find("ENV PYTHONUNBUFFERED=1").unwrap();
        assert!(greeting < unbuffered);
    }

    #[tokio::test]
    async fn nested_manifest_files_keep_their_layout() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("reqs")).unwrap();
        std::fs::write(temp.path().join("reqs/prod.txt"), "-r base.txt\n").unwrap();
        std::fs::write(temp.path().join("reqs/base.txt"), "fastapi\n").unwrap();

        let mut config = Config::default();
        config.builder.manifest = Path::new("reqs/prod.txt").to_path_buf();
        let plan = BuildPlan::from_config(&config, temp.path()).await.unwrap();
        let text = render(&plan);

        assert!(text.contains("COPY reqs/prod.txt ./reqs/prod.txt"));
        assert!(text.contains("COPY reqs/base.txt ./reqs/base.txt"));
        assert!(text.contains("-r reqs/prod.txt"));
    }

    #[tokio::test]
    async fn copy_paths_with_spaces_use_json_form() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("my reqs.txt"), "fastapi\n").unwrap();
        std::fs::create_dir_all(temp.path().join("app src")).unwrap();
        std::fs::write(temp.path().join("app src/main.py"), "").unwrap();

        let mut config = Config::default();
        config.builder.manifest = Path::new("my reqs.txt").to_path_buf();
        config.runtime.source = Path::new("app src").to_path_buf();
        let plan = BuildPlan::from_config(&config, temp.path()).await.unwrap();
        let text = render(&plan);

        assert!(text.contains(r#"COPY ["my reqs.txt","./my reqs.txt"]"#));
        assert!(text.contains(r#"COPY ["app src","."]"#));
        assert!(text.contains("-r 'my reqs.txt'"));
        // Plain paths keep the short form
        assert!(text.contains("COPY --from=builder /install/lib /usr/local/lib"));
    }

    #[test]
    fn copy_json_form_escapes_quotes() {
        let copy = Instruction::Copy {
            from: Some("builder".to_string()),
            source: "/install/a\"b".to_string(),
            dest: "/usr/local/lib".to_string(),
        };
        assert_eq!(
            copy.to_string(),
            r#"COPY --from=builder ["/install/a\"b","/usr/local/lib"]"#
        );
    }

    #[test]
    fn cmd_uses_exec_form() {
        let cmd = Instruction::Cmd(vec!["uvicorn".to_string(), "main:app".to_string()]);
        assert_eq!(cmd.to_string(), "CMD [\"uvicorn\",\"main:app\"]");
    }

    #[test]
    fn dockerfile_quote_simple() {
        assert_eq!(dockerfile_quote("/cache/cargo"), "/cache/cargo");
    }

    #[test]
    fn dockerfile_quote_with_variable() {
        assert_eq!(
            dockerfile_quote("/opt/venv/bin:${PATH}"),
            "\"/opt/venv/bin:${PATH}\""
        );
    }

    #[test]
    fn dockerfile_quote_escapes_embedded_quotes() {
        assert_eq!(
            dockerfile_quote("value with \"quotes\""),
            "\"value with \\\"quotes\\\"\""
        );
    }

    #[test]
    fn dockerfile_quote_empty() {
        assert_eq!(dockerfile_quote(""), "\"\"");
    }
}
