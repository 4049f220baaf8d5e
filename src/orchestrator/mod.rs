//! Application-level orchestration.
//!
//! This module owns the submission state machine and the run loop that drives
//! it from UI commands. Presentation layers (TUI, text, JSON) call into this
//! module to keep responsibilities separated.

mod controller;
mod workflow;

pub use controller::{run_controller, UiCommand};
pub use workflow::{now_rfc3339, SubmitDenial, Workflow};
