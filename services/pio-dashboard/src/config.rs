//! Configuration types for the dashboard

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub task_polling: TaskPollingConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

/// Where the REST backend lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Dashboard HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    /// Open profile editors kept between requests; the least recently used go first
    #[serde(default = "default_max_editor_sessions")]
    pub max_editor_sessions: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
            max_editor_sessions: default_max_editor_sessions(),
        }
    }
}

/// Backing file for client-side preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

/// How long and how often to wait on asynchronous backend tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Attempts spent inside one page request before the loading view is served
    #[serde(default = "default_request_attempts")]
    pub request_attempts: u32,
}

impl Default for TaskPollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            request_attempts: default_request_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4999".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_dashboard_port() -> u16 {
    8085
}

fn default_max_editor_sessions() -> usize {
    16
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("pio-dashboard-settings.json")
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    120
}

fn default_request_attempts() -> u32 {
    8
}

fn default_page_size() -> usize {
    50
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::DashboardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    if config.logs.page_size == 0 {
        return Err(crate::DashboardError::Config(
            "logs.page_size must be greater than zero".to_string(),
        ));
    }
    Ok(config)
}
