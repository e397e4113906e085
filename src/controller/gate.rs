//! Operator gate: publish, fail, or diff against the previous release.

use super::{ReleaseController, ReleasePaths};
use crate::archive;
use crate::error::{CliError, Result};
use crate::operator::{GateChoice, Operator};
use crate::scm::ScmAdapter;
use crate::state::ReleaseCheckpoint;
use crate::upload::RemoteSizeProbe;
use std::path::PathBuf;
use tokio::process::Command;

/// Final answer at the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum GateDecision {
    Publish,
    Fail,
}

impl<S: ScmAdapter, O: Operator, P: RemoteSizeProbe> ReleaseController<'_, S, O, P> {
    /// Ask the operator what to do with the candidate.
    ///
    /// Diffs are shown in place and the question repeated.
    pub(super) async fn operator_gate(
        &self,
        checkpoint: &ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
        previous: Option<&str>,
    ) -> Result<GateDecision> {
        if checkpoint.tagged.is_some() {
            if self.operator.confirm("Already tagged. Resume publishing?")? {
                return Ok(GateDecision::Publish);
            }
            return Err(CliError::Cancelled {
                reason: "publishing not resumed".to_string(),
            }
            .into());
        }

        self.output
            .println(&format!("\nCandidate release archive: {}", paths.archive.display()));
        self.output
            .println(&format!("(extracted to {} for inspection)", paths.extract_dir.display()));
        self.output.println("(you can also hit CTRL-C and resume when done)");

        loop {
            match self.operator.choose_gate(version, previous.is_some())? {
                GateChoice::Diff => match previous {
                    Some(previous) => self.show_diff(paths, previous).await?,
                    None => self.output.warn("No previous release to compare with"),
                },
                GateChoice::Publish => return Ok(GateDecision::Publish),
                GateChoice::Fail => return Ok(GateDecision::Fail),
            }
        }
    }

    fn previous_archive(&self, paths: &ReleasePaths, previous: &str) -> Option<PathBuf> {
        let file = archive::archive_file_name(&self.manifest.archive_base_name(), previous);
        // Older layouts kept archives directly in the releases directory
        [paths.releases_dir.join(previous).join(&file), paths.releases_dir.join(&file)]
            .into_iter()
            .find(|p| p.is_file())
    }

    async fn show_diff(&self, paths: &ReleasePaths, previous: &str) -> Result<()> {
        let Ok(diff) = which::which("diff") else {
            self.output.warn("diff is not installed; can't show diff");
            return Ok(());
        };
        let Some(previous_archive) = self.previous_archive(paths, previous) else {
            self.output.warn(&format!(
                "Archive for {} not found in {}; can't show diff",
                previous,
                paths.releases_dir.display()
            ));
            return Ok(());
        };

        let scratch = tempfile::tempdir_in(&paths.release_dir)?;
        archive::unpack_archive(&previous_archive, scratch.path()).await?;
        let previous_tree = scratch
            .path()
            .join(format!("{}-{}", self.manifest.archive_base_name(), previous));

        // diff exits 1 when the trees differ
        let status = Command::new(&diff)
            .arg("-ur")
            .arg(&previous_tree)
            .arg(&paths.extract_dir)
            .status()
            .await
            .map_err(|e| CliError::ExecutionFailed {
                command: "diff".to_string(),
                reason: e.to_string(),
            })?;
        log::debug!("diff exited with {}", status);

        archive::remove_tree(scratch.path())?;
        Ok(())
    }
}
