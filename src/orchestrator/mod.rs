//! Application-level orchestration.
//!
//! Owns the command loop between presentation layers and the upload simulator so the
//! TUI never mutates simulator state directly.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
