//! CLI command handlers
//!
//! Argument parsing structures, command routing and command implementations.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands, ScheduleCommands};
pub use router::execute_command;
