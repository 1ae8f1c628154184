//! Command handlers.
//!
//! Handlers are thin wrappers that:
//! 1. Parse/validate CLI-specific input
//! 2. Call the registry
//! 3. Format output for the terminal
//!
//! Supervisor failures are converted to [`crate::CliError`] so `main` can
//! pick the exit code.

pub mod list;
pub mod logs;
pub mod run;
pub mod set_property;
pub mod status;
