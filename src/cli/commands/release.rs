//! Release command: start a new release or resume the one in progress.

use crate::cli::{Args, OutputManager, TerminalOperator};
use crate::controller::{ReleaseController, ReleaseOutcome};
use crate::error::Result;
use crate::scm::SystemGit;
use crate::upload::HttpSizeProbe;
use std::time::Duration;

/// Timeout for a single upload verification request
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute the release command
pub(super) async fn execute_release(args: &Args, output: &OutputManager) -> Result<i32> {
    let config = args.to_config()?;
    if let Err(reason) = config.retry.validate() {
        output.warn(&format!("Ignoring retry settings: {}", reason));
    }

    let working_copy = config
        .manifest_path
        .parent()
        .unwrap_or(&config.releases_dir)
        .to_path_buf();
    let scm = SystemGit::open(&working_copy, config.public_repository.clone()).await?;
    let probe = HttpSizeProbe::new(PROBE_TIMEOUT)?;
    let operator = TerminalOperator::new();

    let controller = ReleaseController::new(&scm, &operator, &probe, &config, output)?;
    match controller.run().await? {
        ReleaseOutcome::Published { version } => {
            output.verbose(&format!("Release {} complete", version));
        }
        ReleaseOutcome::CandidateFailed { version } => {
            output.warn(&format!("Candidate {} rejected", version));
        }
    }
    Ok(0)
}
