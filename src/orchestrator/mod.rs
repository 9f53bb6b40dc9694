//! Application-level orchestration.
//!
//! This module owns the restore workflow (select/restore/reset) and saving of results.
//! UI/CLI layers send commands into it and render the events it emits.

mod controller;
mod download;

pub(crate) use controller::{run_controller, UiCommand};
