//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::cli::Project;
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_NAME};
use crate::error::{StagecraftError, StagecraftResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
    project: &Project,
) -> StagecraftResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Set { key, value, local }) => {
            let ctx = UiContext::detect();
            if local {
                let path = project
                    .local_config
                    .clone()
                    .unwrap_or_else(|| project.dir.join(LOCAL_CONFIG_NAME));
                set_local_value(&path, &key, &value).await?;
                ui::step_ok(&ctx, &format!("Set {} = {} in {}", key, value, path.display()));
            } else {
                set_value(manager, &key, &value).await?;
                ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> StagecraftResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// The type a key holds in the default config, used to coerce CLI input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Bool,
    Integer,
    String,
    List,
}

/// Look up `key` in the serialized default config.
///
/// `runtime.env.<NAME>` accepts any name since the table starts empty.
fn key_kind(key: &str) -> StagecraftResult<KeyKind> {
    let unknown = || StagecraftError::User(format!("Unknown config key: {}", key));

    if let Some(name) = key.strip_prefix("runtime.env.") {
        if name.is_empty() || name.contains('.') {
            return Err(unknown());
        }
        return Ok(KeyKind::String);
    }

    let defaults = toml::Value::try_from(Config::default())?;
    let mut current = &defaults;
    for part in key.split('.') {
        current = current
            .as_table()
            .and_then(|t| t.get(part))
            .ok_or_else(unknown)?;
    }

    match current {
        toml::Value::Boolean(_) => Ok(KeyKind::Bool),
        toml::Value::Integer(_) => Ok(KeyKind::Integer),
        toml::Value::String(_) => Ok(KeyKind::String),
        toml::Value::Array(_) => Ok(KeyKind::List),
        _ => Err(StagecraftError::User(format!(
            "{} is a table; set one of its keys instead",
            key
        ))),
    }
}

fn parse_bool(value: &str) -> StagecraftResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(StagecraftError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_integer(value: &str) -> StagecraftResult<i64> {
    value
        .parse()
        .map_err(|_| StagecraftError::User(format!("Invalid number: {}", value)))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Set a key in the global config file
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> StagecraftResult<()> {
    let kind = key_kind(key)?;
    let global = manager.load().await?;
    let mut doc = toml::Value::try_from(global)?;

    let leaf = match kind {
        KeyKind::Bool => toml::Value::Boolean(parse_bool(value)?),
        KeyKind::Integer => toml::Value::Integer(parse_integer(value)?),
        KeyKind::String => toml::Value::String(value.to_string()),
        KeyKind::List => toml::Value::Array(
            split_list(value)
                .into_iter()
                .map(toml::Value::String)
                .collect(),
        ),
    };

    let parts: Vec<&str> = key.split('.').collect();
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| StagecraftError::User("Empty config key".to_string()))?;
    let mut current = &mut doc;
    for part in parents {
        current = current
            .as_table_mut()
            .ok_or_else(|| StagecraftError::User(format!("Expected table at key: {}", part)))?
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    current
        .as_table_mut()
        .ok_or_else(|| StagecraftError::User(format!("Expected table for key: {}", key)))?
        .insert(last.to_string(), leaf);

    let updated: Config = doc
        .try_into()
        .map_err(|e: toml::de::Error| StagecraftError::ConfigInvalid {
            path: manager.path().to_path_buf(),
            reason: e.to_string(),
        })?;
    manager.save(&updated).await
}

/// Set a key in a project-local config, keeping comments and layout
async fn set_local_value(path: &Path, key: &str, value: &str) -> StagecraftResult<()> {
    let kind = key_kind(key)?;

    let content = if path.exists() {
        fs::read_to_string(path)
            .await
            .map_err(|e| StagecraftError::io(format!("reading {}", path.display()), e))?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut = content.parse()?;

    let leaf = match kind {
        KeyKind::Bool => toml_edit::value(parse_bool(value)?),
        KeyKind::Integer => toml_edit::value(parse_integer(value)?),
        KeyKind::String => toml_edit::value(value),
        KeyKind::List => {
            let items: toml_edit::Array = split_list(value).into_iter().collect();
            toml_edit::value(items)
        }
    };

    let parts: Vec<&str> = key.split('.').collect();
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| StagecraftError::User("Empty config key".to_string()))?;
    let mut table = doc.as_table_mut();
    for part in parents {
        let mut fresh = toml_edit::Table::new();
        fresh.set_implicit(true);
        table = table
            .entry(part)
            .or_insert(toml_edit::Item::Table(fresh))
            .as_table_mut()
            .ok_or_else(|| StagecraftError::User(format!("Expected table at key: {}", part)))?;
    }
    table.insert(last, leaf);

    let rendered = doc.to_string();
    toml::from_str::<Config>(&rendered).map_err(|e| StagecraftError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    fs::write(path, rendered)
        .await
        .map_err(|e| StagecraftError::io(format!("writing {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_kinds_follow_defaults() {
        assert_eq!(key_kind("runtime.port").unwrap(), KeyKind::Integer);
        assert_eq!(key_kind("engine.pull").unwrap(), KeyKind::Bool);
        assert_eq!(key_kind("builder.base_image").unwrap(), KeyKind::String);
        assert_eq!(key_kind("builder.system_packages").unwrap(), KeyKind::List);
        assert_eq!(
            key_kind("builder.toolchain_cache.path").unwrap(),
            KeyKind::String
        );
        assert_eq!(key_kind("runtime.env.PYTHONUNBUFFERED").unwrap(), KeyKind::String);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(key_kind("vm.name").is_err());
        assert!(key_kind("runtime").is_err());
        assert!(key_kind("runtime.env.").is_err());
    }

    #[tokio::test]
    async fn set_global_value() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        set_value(&manager, "runtime.port", "9000").await.unwrap();
        set_value(&manager, "builder.system_packages", "gcc, libffi-dev")
            .await
            .unwrap();

        let config = manager.load().await.unwrap();
        assert_eq!(config.runtime.port, 9000);
        assert_eq!(config.builder.system_packages, vec!["gcc", "libffi-dev"]);
    }

    #[tokio::test]
    async fn set_global_rejects_bad_port() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        assert!(set_value(&manager, "runtime.port", "http").await.is_err());
        assert!(set_value(&manager, "runtime.port", "70000").await.is_err());
    }

    #[tokio::test]
    async fn set_local_preserves_comments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_NAME);
        std::fs::write(&path, "# keep me\n[runtime]\nport = 8000 # api\n").unwrap();

        set_local_value(&path, "runtime.port", "9000").await.unwrap();
        set_local_value(&path, "builder.toolchain_cache.enabled", "false")
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# keep me"));
        assert!(content.contains("port = 9000"));

        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.runtime.port, 9000);
        assert!(!config.builder.toolchain_cache.enabled);
    }

    #[tokio::test]
    async fn set_local_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_NAME);

        set_local_value(&path, "runtime.env.PYTHONUNBUFFERED", "1")
            .await
            .unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.runtime.env.get("PYTHONUNBUFFERED").map(String::as_str), Some("1"));
    }
}
