// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files in various locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{CatchAllConfig, MonitorConfigFile, WrapperMode};

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".cmis-monitor.json",
    ".cmis-monitor.yaml",
    ".cmis-monitor/config.json",
    "cmis-monitor.config.json",
];

/// Local config file name (for per-directory overrides).
pub const LOCAL_CONFIG_FILE: &str = ".cmis-monitor.local.json";

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".cmis-monitor";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Load global configuration from ~/.cmis-monitor/config.json.
pub fn load_global_config() -> Result<Option<MonitorConfigFile>, ConfigError> {
    match get_global_config_path() {
        Some(path) if path.exists() => load_config_file(&path).map(Some),
        _ => Ok(None),
    }
}

/// Load workspace configuration from the first of [`CONFIG_FILES`] present.
pub fn load_workspace_config(
    workspace_root: &Path,
) -> Result<Option<MonitorConfigFile>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = workspace_root.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load local configuration from .cmis-monitor.local.json.
pub fn load_local_config(workspace_root: &Path) -> Result<Option<MonitorConfigFile>, ConfigError> {
    let path = workspace_root.join(LOCAL_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Load a configuration file (JSON or YAML, by extension).
pub fn load_config_file(path: &Path) -> Result<MonitorConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

/// Write a workspace config file and return its path.
pub fn save_workspace_config(
    workspace_root: &Path,
    config: &MonitorConfigFile,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let path = workspace_root.join(filename.unwrap_or(CONFIG_FILES[0]));

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    Ok(path)
}

/// Write the example configuration unless a workspace config already exists.
pub fn init_config(workspace_root: &Path) -> Result<PathBuf, ConfigError> {
    if let Some(existing) = CONFIG_FILES
        .iter()
        .map(|f| workspace_root.join(f))
        .find(|p| p.exists())
    {
        return Err(ConfigError::invalid(
            "path",
            format!("{} already exists", existing.display()),
        ));
    }
    save_workspace_config(workspace_root, &get_example_config(), None)
}

/// Example configuration with every field spelled out.
pub fn get_example_config() -> MonitorConfigFile {
    MonitorConfigFile {
        listener_name: Some("CMIS V 1.1 monitoring extension".to_string()),
        listener_version: Some("0.1".to_string()),
        container: Some("cmisContainer".to_string()),
        event_class: None,
        operations: Some(vec![
            "query".to_string(),
            "getChildren".to_string(),
            "getContentStream".to_string(),
        ]),
        accumulator_suffix: Some("Time".to_string()),
        catch_all: Some(CatchAllConfig {
            enabled: Some(true),
            event_name: Some("allEvents".to_string()),
        }),
        wrapper_mode: Some(WrapperMode::Shared),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_files_order() {
        assert_eq!(CONFIG_FILES[0], ".cmis-monitor.json");
    }

    #[test]
    fn test_global_config_dir() {
        if let Some(dir) = get_global_config_dir() {
            assert!(dir.ends_with(".cmis-monitor"));
        }
    }

    #[test]
    fn test_load_workspace_config_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(load_workspace_config(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_workspace_config_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".cmis-monitor.json"),
            r#"{"container": "docs", "operations": ["query"]}"#,
        )
        .unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.container, Some("docs".to_string()));
        assert_eq!(config.operations, Some(vec!["query".to_string()]));
    }

    #[test]
    fn test_load_workspace_config_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".cmis-monitor.yaml"),
            "container: archive\nwrapperMode: perRequest\ncatchAll:\n  enabled: false\n",
        )
        .unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.container, Some("archive".to_string()));
        assert_eq!(config.wrapper_mode, Some(WrapperMode::PerRequest));
        assert_eq!(config.catch_all.unwrap().enabled, Some(false));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".cmis-monitor.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        assert!(load_local_config(temp.path()).unwrap().is_none());

        std::fs::write(
            temp.path().join(LOCAL_CONFIG_FILE),
            r#"{"listenerVersion": "0.2"}"#,
        )
        .unwrap();
        let local = load_local_config(temp.path()).unwrap().unwrap();
        assert_eq!(local.listener_version, Some("0.2".to_string()));
    }

    #[test]
    fn test_init_config() {
        let temp = TempDir::new().unwrap();
        let path = init_config(temp.path()).unwrap();
        assert!(path.exists());

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.container, Some("cmisContainer".to_string()));

        // A second init refuses to overwrite.
        assert!(init_config(temp.path()).is_err());
    }
}
