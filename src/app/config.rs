use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notification::UiEndpoint;
use crate::reconcile::{GroupingPolicy, Renderer};

/// Sync action tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Quiet period after the last action before changes are published
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_settle_delay_ms() -> u64 {
    1000
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Notification content settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub grouping: GroupingPolicy,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_error_app_name")]
    pub error_app_name: String,
    /// Registry of live desktop notifications (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,
}

fn default_app_name() -> String {
    "Email".to_string()
}

fn default_error_app_name() -> String {
    "Warnings".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            grouping: GroupingPolicy::default(),
            app_name: default_app_name(),
            error_app_name: default_error_app_name(),
            registry_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bus socket the daemon listens on
    #[serde(default = "crate::ipc::socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Mail UI targeted by notification actions
    #[serde(default)]
    pub ui: UiEndpoint,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: crate::ipc::socket_path(),
            log_level: default_log_level(),
            actions: ActionsConfig::default(),
            notifications: NotificationsConfig::default(),
            ui: UiEndpoint::default(),
        }
    }
}

impl Config {
    /// Load the configuration file, writing defaults on first start
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Failed to save default config: {}", e);
            }
            Ok(config)
        }
    }

    /// ~/.config/mailbox-notifier/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/mailbox-notifier/config.toml"))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.actions.settle_delay_ms)
    }

    pub fn renderer(&self) -> Renderer {
        Renderer {
            endpoint: self.ui.clone(),
            app_name: self.notifications.app_name.clone(),
            error_app_name: self.notifications.error_app_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_falls_back_per_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n\n[notifications]\ngrouping = \"per_sender\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.notifications.grouping, GroupingPolicy::PerSender);
        assert_eq!(config.notifications.app_name, "Email");
        assert_eq!(config.settle_delay(), Duration::from_secs(1));
        assert_eq!(config.ui, UiEndpoint::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[notifications]\ngrouping = \"per_thread\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_renderer_uses_configured_names() {
        let mut config = Config::default();
        config.notifications.app_name = "Mail".to_string();
        config.ui.service = "org.example.mail".to_string();

        let renderer = config.renderer();
        assert_eq!(renderer.app_name, "Mail");
        assert_eq!(renderer.error_app_name, "Warnings");
        assert_eq!(renderer.endpoint.service, "org.example.mail");
    }
}
