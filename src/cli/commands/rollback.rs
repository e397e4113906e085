//! Rollback command: abandon an unfinished release.

use crate::cli::{Args, OutputManager, TerminalOperator};
use crate::controller::ReleaseController;
use crate::error::{CliError, Result};
use crate::operator::Operator;
use crate::scm::SystemGit;
use crate::state::create_state_manager;
use crate::upload::HttpSizeProbe;
use std::time::Duration;

/// Execute the rollback command
pub(super) async fn execute_rollback(args: &Args, output: &OutputManager, yes: bool) -> Result<i32> {
    let config = args.to_config()?;
    let store = create_state_manager(&config.releases_dir);
    let Some(checkpoint) = store.load_if_exists()? else {
        output.println("No release in progress");
        return Ok(0);
    };

    let operator = TerminalOperator::new();
    if !yes {
        output.println(&format!("About to roll back: {}", checkpoint.summary()));
        if !operator.confirm("Proceed with rollback?")? {
            return Err(CliError::Cancelled {
                reason: "rollback not confirmed".to_string(),
            }
            .into());
        }
    }

    let working_copy = config
        .manifest_path
        .parent()
        .unwrap_or(&config.releases_dir)
        .to_path_buf();
    let scm = SystemGit::open(&working_copy, config.public_repository.clone()).await?;
    let probe = HttpSizeProbe::new(Duration::from_secs(30))?;
    let controller = ReleaseController::new(&scm, &operator, &probe, &config, output)?;
    controller.abandon().await?;
    output.success("Rollback complete");
    Ok(0)
}
