//! Waiting on deferred backend tasks
//!
//! Some endpoints answer with a [`TaskHandle`] instead of data. The result is
//! fetched by polling the handle's result URL until the task settles.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::BackendClient;
use crate::config::TaskPollingConfig;
use crate::models::{TaskHandle, TaskStatus};
use crate::DashboardError;

/// How often and how many times to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&TaskPollingConfig::default())
    }
}

impl PollConfig {
    /// Shorter budget for polling inside a single page request
    pub fn for_requests(config: &TaskPollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.request_attempts.clamp(1, config.max_attempts.max(1)),
        }
    }
}

impl From<&TaskPollingConfig> for PollConfig {
    fn from(config: &TaskPollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Poll until the task completes, fails, runs out of attempts, or `cancel` fires.
///
/// Returns the task's `result` payload, which may be absent.
pub async fn poll_task(
    client: &BackendClient,
    handle: &TaskHandle,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> crate::Result<Option<serde_json::Value>> {
    for attempt in 1..=config.max_attempts {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Polling task {} cancelled", handle.task_id);
                return Err(DashboardError::Cancelled);
            }
            result = client.get_task_result(handle) => result?,
        };

        match result.status {
            TaskStatus::Complete => {
                tracing::debug!(
                    "Task {} complete after {} attempt(s)",
                    handle.task_id,
                    attempt
                );
                return Ok(result.result);
            }
            TaskStatus::Failed => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "task reported failure".to_string());
                tracing::warn!("Task {} failed: {}", handle.task_id, reason);
                return Err(DashboardError::Task(reason));
            }
            TaskStatus::Pending => {
                tracing::debug!("Task {} pending (attempt {})", handle.task_id, attempt);
            }
        }

        if attempt == config.max_attempts {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Polling task {} cancelled", handle.task_id);
                return Err(DashboardError::Cancelled);
            }
        }
    }

    Err(DashboardError::Timeout(format!(
        "task {} did not finish after {} attempts",
        handle.task_id, config.max_attempts
    )))
}
