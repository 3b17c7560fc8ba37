//! Application-level orchestration.
//!
//! This module owns the dialog flow state machine driving a bulk run
//! (preview, installation, close) and the controller that dispatches the
//! engine on behalf of UI layers. Presentation code only observes
//! `DialogFlow` state and engine events.

mod controller;
mod dialog;

pub(crate) use controller::{run_controller, UiCommand};
pub use dialog::{Advance, DialogFlow, Page};
