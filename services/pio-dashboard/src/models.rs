//! Backend data types
//!
//! These mirror the JSON shapes returned by the REST backend. None of them
//! are owned by the dashboard; they are re-fetched whenever a page mounts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DashboardError;

/// Log verbosity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Notice,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 3] = [LogLevel::Notice, LogLevel::Info, LogLevel::Debug];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Whether an entry at `entry` level is visible when this level is selected
    pub fn shows(&self, entry: LogLevel) -> bool {
        entry <= *self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOTICE" => Ok(LogLevel::Notice),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(DashboardError::Validation(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

/// A log line as returned by the logs endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(alias = "pioreactor_unit")]
    pub unit: String,
    #[serde(default)]
    pub experiment: String,
    pub level: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub task: Option<String>,
}

impl LogEntry {
    /// Parsed level, if the backend used one of the dashboard's levels
    pub fn log_level(&self) -> Option<LogLevel> {
        self.level.parse().ok()
    }
}

/// Body of a user-submitted log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub message: String,
    pub level: LogLevel,
    pub source: String,
}

impl NewLogEntry {
    pub fn from_ui(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            message: message.into(),
            level,
            source: "ui".to_string(),
        }
    }
}

/// Points recorded while the calibration was performed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedData {
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<f64>,
}

impl RecordedData {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// A stored calibration curve for one device on one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub calibration_name: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub calibration_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub calibrated_on_pioreactor_unit: Option<String>,
    #[serde(default)]
    pub curve_type: Option<String>,
    #[serde(default)]
    pub curve_data_: Vec<f64>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub recorded_data: RecordedData,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Calibration {
    /// Evaluate the calibration polynomial (coefficients highest degree first)
    pub fn predict(&self, x: f64) -> Option<f64> {
        if self.curve_data_.is_empty() {
            return None;
        }
        Some(self.curve_data_.iter().fold(0.0, |acc, c| acc * x + c))
    }
}

/// One row of the historical worker assignments listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub pioreactor_unit: String,
    #[serde(default)]
    pub experiment: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<String>,
    #[serde(default)]
    pub unassigned_at: Option<String>,
}

/// Display-name override per unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelabelMap(pub BTreeMap<String, String>);

impl RelabelMap {
    /// Human-readable label for a unit, falling back to the unit name
    pub fn label_for<'a>(&'a self, unit: &'a str) -> &'a str {
        self.0.get(unit).map(String::as_str).unwrap_or(unit)
    }

    /// "label (unit)" when a label exists, otherwise just the unit
    pub fn display(&self, unit: &str) -> String {
        match self.0.get(unit) {
            Some(label) if label != unit => format!("{} ({})", label, unit),
            _ => unit.to_string(),
        }
    }
}

/// An entry of the experiment profile listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub file: String,
    #[serde(default)]
    pub experiment_profile_name: Option<String>,
}

/// Arguments for a job run request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Reference to a deferred backend computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub result_url_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[serde(alias = "in progress", alias = "in_progress", alias = "scheduled")]
    Pending,
    #[serde(alias = "succeeded", alias = "success")]
    Complete,
    #[serde(alias = "error")]
    Failed,
}

/// Payload of a task result endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}
