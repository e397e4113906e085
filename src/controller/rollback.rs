//! Failing a candidate and rolling back a broken attempt.

use super::{ReleaseController, ReleasePaths};
use crate::archive;
use crate::error::Result;
use crate::operator::Operator;
use crate::scm::{INTEGRATION_BRANCH, ScmAdapter};
use crate::upload::RemoteSizeProbe;

impl<S: ScmAdapter, O: Operator, P: RemoteSizeProbe> ReleaseController<'_, S, O, P> {
    /// Discard the candidate: back up the release directory, delete the
    /// integration branch and the checkpoint
    pub(super) async fn fail_candidate(&self, paths: &ReleasePaths) -> Result<()> {
        archive::backup_if_exists(&paths.release_dir)?;
        self.scm.delete_branch(INTEGRATION_BRANCH).await?;
        self.store.remove()?;
        self.output
            .info("Restored to state before starting release. Make your fixes and try again...");
        Ok(())
    }

    /// Best-effort rollback after a failure mid-phase.
    ///
    /// Every step is attempted; failures are logged so the original error
    /// stays the one reported.
    pub(super) async fn rollback(&self, paths: Option<&ReleasePaths>) {
        self.output.warn("Rolling back release...");

        match self.scm.current_branch().await {
            Ok(branch) => {
                if let Err(e) = self.scm.reset_hard(&branch).await {
                    log::error!("Failed to reset working tree to {}: {}", branch, e);
                }
            }
            Err(e) => log::error!("Failed to determine current branch: {}", e),
        }

        if let Some(paths) = paths {
            if let Err(e) = archive::backup_if_exists(&paths.release_dir) {
                log::error!("Failed to back up {}: {}", paths.release_dir.display(), e);
            }
        }
        if let Err(e) = self.scm.delete_branch(INTEGRATION_BRANCH).await {
            log::error!("Failed to delete branch {}: {}", INTEGRATION_BRANCH, e);
        }
        if let Err(e) = self.store.remove() {
            log::error!("Failed to remove {}: {}", self.store.path().display(), e);
        }

        self.output
            .info("Restored to state before starting release. Make your fixes and try again...");
    }
}
