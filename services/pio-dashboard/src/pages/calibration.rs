//! Calibration detail page
//!
//! The backend computes calibration details asynchronously: the first request
//! returns a task handle which is polled until it resolves to a mapping of
//! unit to calibration.

use crate::api::BackendClient;
use crate::models::Calibration;
use crate::pages::{describe, Notice};
use crate::scope::PageScope;
use crate::task::{poll_task, PollConfig};
use crate::DashboardError;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationView {
    Loading,
    NotFound,
    Loaded(Box<Calibration>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    InFlight,
    Activated,
    Failed(String),
}

/// Pick the requested unit's calibration out of a resolved task result
pub fn resolve_calibration(
    result: Option<serde_json::Value>,
    unit: &str,
) -> crate::Result<Option<Calibration>> {
    let Some(result) = result else {
        return Ok(None);
    };
    let has_unit = result.get(unit).is_some();
    let entry = if has_unit {
        result[unit].clone()
    } else if result.get("calibration_name").is_some() {
        // Some workers answer with the calibration itself
        result
    } else {
        return Ok(None);
    };
    if entry.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(entry)?))
}

#[derive(Debug)]
pub struct CalibrationPage {
    unit: String,
    device: String,
    name: String,
    view: CalibrationView,
    activation: ActivationState,
    notices: Vec<Notice>,
    poll: PollConfig,
    scope: PageScope,
}

impl CalibrationPage {
    pub fn mount(
        unit: impl Into<String>,
        device: impl Into<String>,
        name: impl Into<String>,
        poll: PollConfig,
        scope: PageScope,
    ) -> Self {
        Self {
            unit: unit.into(),
            device: device.into(),
            name: name.into(),
            view: CalibrationView::Loading,
            activation: ActivationState::Idle,
            notices: Vec::new(),
            poll,
            scope,
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> &CalibrationView {
        &self.view
    }

    pub fn activation(&self) -> &ActivationState {
        &self.activation
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        match &self.view {
            CalibrationView::Loaded(c) => Some(c.as_ref()),
            _ => None,
        }
    }

    /// The "set active" control is enabled only for an inactive, loaded
    /// calibration with no activation in flight.
    pub fn can_activate(&self) -> bool {
        match self.calibration() {
            Some(c) => !c.is_active && self.activation != ActivationState::InFlight,
            None => false,
        }
    }

    /// Request the calibration and wait for the task to resolve
    pub async fn load(&mut self, client: &BackendClient) {
        self.view = CalibrationView::Loading;
        let result = self.fetch(client).await;

        if self.scope.is_cancelled() {
            tracing::debug!("Calibration page for '{}' unmounted mid-load", self.name);
            return;
        }

        self.view = match result {
            Ok(Some(mut calibration)) => {
                if calibration.device.is_none() {
                    calibration.device = Some(self.device.clone());
                }
                CalibrationView::Loaded(Box::new(calibration))
            }
            Ok(None) | Err(DashboardError::NotFound(_)) => {
                tracing::debug!(
                    "No calibration '{}' for {} on {}",
                    self.name,
                    self.device,
                    self.unit
                );
                CalibrationView::NotFound
            }
            Err(DashboardError::Cancelled) => CalibrationView::Loading,
            Err(DashboardError::Timeout(reason)) => {
                tracing::debug!("Calibration '{}' still loading: {}", self.name, reason);
                CalibrationView::Loading
            }
            Err(e) => {
                tracing::warn!("Loading calibration '{}' failed: {}", self.name, e);
                CalibrationView::Failed(describe(&e))
            }
        };
    }

    async fn fetch(&self, client: &BackendClient) -> crate::Result<Option<Calibration>> {
        let handle = self
            .scope
            .run(client.get_calibration_task(&self.unit, &self.device, &self.name))
            .await?;
        tracing::debug!("Calibration request queued as task {}", handle.task_id);
        let result = poll_task(client, &handle, &self.poll, self.scope.token()).await?;
        resolve_calibration(result, &self.unit)
    }

    /// Mark the calibration active. Returns whether the backend accepted it.
    pub async fn activate(&mut self, client: &BackendClient) -> bool {
        if !self.can_activate() {
            return false;
        }
        self.activation = ActivationState::InFlight;

        let result = self
            .scope
            .run(client.set_active_calibration(&self.unit, &self.device, &self.name))
            .await;

        match result {
            Ok(()) => {
                if let CalibrationView::Loaded(calibration) = &mut self.view {
                    calibration.is_active = true;
                }
                self.activation = ActivationState::Activated;
                self.notices.push(Notice::Success(format!(
                    "{} is now the active {} calibration",
                    self.name, self.device
                )));
                true
            }
            Err(DashboardError::Cancelled) => {
                self.activation = ActivationState::Idle;
                false
            }
            Err(e) => {
                tracing::warn!("Activating calibration '{}' failed: {}", self.name, e);
                let message = describe(&e);
                self.activation = ActivationState::Failed(message.clone());
                self.notices.push(Notice::Error(format!(
                    "Could not set {} active: {}",
                    self.name, message
                )));
                false
            }
        }
    }
}
