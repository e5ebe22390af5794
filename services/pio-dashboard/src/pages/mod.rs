//! Page state machines
//!
//! Each page owns its state for as long as it is mounted and re-fetches
//! everything it needs when mounted again.

pub mod calibration;
pub mod editor;
pub mod logs;

/// A message shown at the top of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

/// User-facing text for a failed backend call
pub(crate) fn describe(err: &crate::DashboardError) -> String {
    match err {
        crate::DashboardError::Status { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
