//! Build history log
//!
//! Writes JSON lines to `<state dir>/stagecraft/builds.log`, one per build
//! event. Every event of a single invocation shares a `build_id`.

use crate::config::{Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub const EVENT_STARTED: &str = "build.started";
pub const EVENT_SUCCEEDED: &str = "build.succeeded";
pub const EVENT_FAILED: &str = "build.failed";
pub const EVENT_CACHED: &str = "build.cached";

/// File-based build logger that appends JSON lines
pub struct BuildLog {
    enabled: bool,
    path: PathBuf,
    build_id: String,
}

impl BuildLog {
    /// Create a new build logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.build_log,
            path: ConfigManager::build_log_path(),
            build_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Log a build event as a JSON line
    ///
    /// Write failures are reported as warnings and never fail the build.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "build_id": self.build_id,
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize build event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write build log: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_build_log(dir: &TempDir, enabled: bool) -> BuildLog {
        BuildLog {
            enabled,
            path: dir.path().join("builds.log"),
            build_id: "b-1".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_json_line() {
        let dir = TempDir::new().unwrap();
        let log = test_build_log(&dir, true);

        log.log(
            EVENT_SUCCEEDED,
            &serde_json::json!({"image": "stagecraft-app:abc"}),
        )
        .await;

        let content = tokio::fs::read_to_string(&log.path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "build.succeeded");
        assert_eq!(parsed["build_id"], "b-1");
        assert_eq!(parsed["data"]["image"], "stagecraft-app:abc");
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn events_share_build_id() {
        let dir = TempDir::new().unwrap();
        let log = test_build_log(&dir, true);

        log.log(EVENT_STARTED, &serde_json::json!({})).await;
        log.log(EVENT_FAILED, &serde_json::json!({"error": "boom"})).await;

        let content = tokio::fs::read_to_string(&log.path).await.unwrap();
        let ids: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["build_id"].to_string())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let log = test_build_log(&dir, false);

        log.log(EVENT_CACHED, &serde_json::json!({})).await;

        assert!(!log.path.exists());
    }

    #[test]
    fn fresh_ids_per_logger() {
        let config = Config::default();
        assert_ne!(BuildLog::new(&config).build_id(), BuildLog::new(&config).build_id());
    }
}
