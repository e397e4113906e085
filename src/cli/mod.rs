//! Command line interface for resumable_release.
//!
//! Parses arguments, builds the run configuration and dispatches to the
//! `release`, `status` and `rollback` commands.

mod args;
pub mod commands;
mod output;
mod prompt;

pub use args::{Args, Command};
pub use commands::execute_command;
pub use output::OutputManager;
pub use prompt::TerminalOperator;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
