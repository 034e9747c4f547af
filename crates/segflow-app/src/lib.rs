//! Segflow Application
//!
//! Headless application shell: sets up a viewer session from a JSON
//! configuration, replays scripted input and reports what it changed.

mod app;
mod script;
mod shortcuts;

pub use app::{App, AppConfig, AppError, RunSummary};
pub use script::{ScriptInput, ScriptStep, drag_gesture};
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};
