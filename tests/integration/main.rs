//! Integration tests for stagecraft

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command isolated from the user's global config
    fn stagecraft(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("stagecraft");
        cmd.env("STAGECRAFT_CONFIG", home.path().join("config.toml"))
            .env("CI", "true");
        cmd
    }

    fn project(requirements: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.txt"), requirements).unwrap();
        std::fs::write(temp.path().join("main.py"), "import fastapi\n").unwrap();
        temp
    }

    fn path_arg(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        stagecraft(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Two-stage container image builder"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        stagecraft(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecraft"));
    }

    #[test]
    fn render_default_project() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\nuvicorn\n");

        stagecraft(&home)
            .args(["--no-local", "-C", &path_arg(app.path()), "render"])
            .assert()
            .success()
            .stdout(predicate::str::contains("FROM python:3.11-slim AS builder"))
            .stdout(predicate::str::contains(
                "CARGO_HOME=/tmp/cargo pip install --no-cache-dir --prefix=/install -r requirements.txt",
            ))
            .stdout(predicate::str::contains("COPY --from=builder /install/lib /usr/local/lib"))
            .stdout(predicate::str::contains("EXPOSE 8000"))
            .stdout(predicate::str::contains(r#"CMD ["python","main.py"]"#));
    }

    #[test]
    fn render_uses_local_config() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\n");
        std::fs::write(
            app.path().join("stagecraft.toml"),
            "[runtime]\nport = 9000\n",
        )
        .unwrap();

        stagecraft(&home)
            .args(["-C", &path_arg(app.path()), "render"])
            .assert()
            .success()
            .stdout(predicate::str::contains("EXPOSE 9000"));
    }

    #[test]
    fn plan_fails_without_manifest() {
        let home = TempDir::new().unwrap();
        let app = TempDir::new().unwrap();
        std::fs::write(app.path().join("main.py"), "").unwrap();

        stagecraft(&home)
            .args(["--no-local", "-C", &path_arg(app.path()), "plan"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("requirements.txt"));
    }

    #[test]
    fn plan_json_lists_artifacts() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\n");

        stagecraft(&home)
            .args(["--no-local", "-C", &path_arg(app.path()), "plan", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"artifacts\""))
            .stdout(predicate::str::contains("/install/bin"));
    }

    #[test]
    fn plan_shows_interpreter_skew_without_warning() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\n");
        std::fs::write(
            app.path().join("stagecraft.toml"),
            "[runtime]\nbase_image = \"python:3.12-slim\"\n",
        )
        .unwrap();

        stagecraft(&home)
            .args(["-C", &path_arg(app.path()), "plan"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Interpreter: builder 3.11, runtime 3.12"))
            .stdout(predicate::str::contains("[WARN]").not());
    }

    #[test]
    fn empty_entry_rejected() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\n");
        std::fs::write(app.path().join("stagecraft.toml"), "[runtime]\nentry = []\n").unwrap();

        stagecraft(&home)
            .args(["-C", &path_arg(app.path()), "render"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("entry command"));
    }

    #[test]
    fn init_then_render() {
        let home = TempDir::new().unwrap();
        let app = project("fastapi\n");

        stagecraft(&home)
            .args(["init", "--path", &path_arg(app.path())])
            .assert()
            .success();
        assert!(app.path().join("stagecraft.toml").exists());

        stagecraft(&home)
            .args(["-C", &path_arg(app.path()), "render"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("# Generated by stagecraft"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        stagecraft(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_set_then_show() {
        let home = TempDir::new().unwrap();
        stagecraft(&home)
            .args(["--no-local", "config", "set", "image.name", "attendance"])
            .assert()
            .success();

        stagecraft(&home)
            .args(["--no-local", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("name = \"attendance\""));
    }

    #[test]
    fn completions_generate() {
        let home = TempDir::new().unwrap();
        stagecraft(&home)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecraft"));
    }
}
