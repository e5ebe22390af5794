//! BDD step definitions for pio-dashboard

pub mod calibration_steps;
pub mod editor_steps;
pub mod ini_steps;
pub mod logs_steps;
