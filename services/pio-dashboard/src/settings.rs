//! Client-side preference store
//!
//! The dashboard keeps a handful of user preferences across sessions. They
//! are stored as a flat JSON object of string values in a single file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::LogLevel;
use crate::DashboardError;

const LOG_LEVEL_KEY: &str = "logLevel";

/// Typed accessors over persisted preferences
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`. A missing or unreadable file starts empty.
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Could not read settings file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };

        tracing::debug!("Opened settings store {:?} ({} keys)", path, values.len());
        Self {
            path: Some(path.to_path_buf()),
            values,
        }
    }

    /// Selected log level, `INFO` when unset or unrecognised
    pub fn log_level(&self) -> LogLevel {
        match self.values.get(LOG_LEVEL_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Stored log level '{}' is not valid, using default", raw);
                LogLevel::default()
            }),
            None => LogLevel::default(),
        }
    }

    pub async fn set_log_level(&mut self, level: LogLevel) -> crate::Result<()> {
        self.values
            .insert(LOG_LEVEL_KEY.to_string(), level.as_str().to_string());
        self.persist().await
    }

    async fn persist(&self) -> crate::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DashboardError::Settings(format!("Creating {:?}: {}", parent, e))
            })?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| DashboardError::Settings(format!("Writing {:?}: {}", path, e)))?;
        tracing::debug!("Persisted settings to {:?}", path);
        Ok(())
    }
}

/// Shared settings handle used by the dashboard server
pub type SettingsHandle = Arc<RwLock<SettingsStore>>;

pub fn new_settings_handle(store: SettingsStore) -> SettingsHandle {
    Arc::new(RwLock::new(store))
}
