//! Command execution.
//!
//! Each command reports its own progress; failures are printed here together
//! with the error's recovery suggestions and turned into exit code 1.

mod release;
mod rollback;
mod status;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;

use release::execute_release;
use rollback::execute_rollback;
use status::execute_status;

/// Execute the command selected by `args`, returning the process exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let command = args.command();
    let result = match &command {
        Command::Release => execute_release(&args, &output).await,
        Command::Status { json } => execute_status(&args, &output, *json),
        Command::Rollback { yes } => execute_rollback(&args, &output, *yes).await,
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {}", command.name(), e));
            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\nRecovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&format!("• {}", suggestion));
                }
            }
            Ok(1)
        }
    }
}
