//! Version control operations needed by the release controller.
//!
//! This module defines the [`ScmAdapter`] trait that specifies every
//! repository operation a release performs. The production implementation is
//! [`SystemGit`], which drives the `git` executable.

mod system_git;

pub use system_git::SystemGit;

use crate::error::{PreconditionError, Result};
use std::future::Future;
use std::path::Path;

/// Branch that holds the release and development commits until tagging
pub const INTEGRATION_BRANCH: &str = "release-tmp";

/// Prefix turning a version into a tag name
pub const TAG_PREFIX: &str = "v";

/// Tag name for a version
pub fn tag_name(version: &str) -> String {
    format!("{}{}", TAG_PREFIX, version)
}

/// Repository operations used by a release.
///
/// Each call either fully succeeds or leaves the repository unchanged.
pub trait ScmAdapter {
    /// Top-level directory of the working tree
    fn root_dir(&self) -> &Path;

    /// Revision currently checked out
    fn head_revision(&self) -> impl Future<Output = Result<String>>;

    /// Name of the checked-out branch
    fn current_branch(&self) -> impl Future<Output = Result<String>>;

    /// Fail with a precondition error if tracked files are modified
    fn ensure_no_uncommitted_changes(&self) -> impl Future<Output = Result<()>>;

    /// Fail with a precondition error if `path` is not tracked
    fn ensure_tracked(&self, path: &Path) -> impl Future<Output = Result<()>>;

    /// `file:line:text` entries for TODO/XXX/FIXME markers in tracked files
    fn find_outstanding_markers(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Commit all changes to tracked files onto `branch` with the given parent.
    ///
    /// Does not move `HEAD`. Returns the new revision.
    fn create_commit(
        &self,
        message: &str,
        branch: &str,
        parent: &str,
    ) -> impl Future<Output = Result<String>>;

    /// Tag `revision` with the version's tag; fails if the tag exists
    fn tag(&self, version: &str, revision: &str) -> impl Future<Output = Result<()>>;

    /// Delete a local branch (absent branches are not an error)
    fn delete_branch(&self, branch: &str) -> impl Future<Output = Result<()>>;

    /// Point the current branch, index and working tree at `revision`
    fn reset_hard(&self, revision: &str) -> impl Future<Output = Result<()>>;

    /// Write `revision` as a `.tar.gz` with every path under `prefix/`
    fn export_tree(
        &self,
        prefix: &str,
        archive: &Path,
        revision: &str,
    ) -> impl Future<Output = Result<()>>;

    /// Versions that have a release tag
    fn tagged_versions(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Log with file statistics for `from..to` (or all history up to `to`)
    fn diff_log(&self, from: Option<&str>, to: &str) -> impl Future<Output = Result<String>>;

    /// Whether the repository uses submodules
    fn has_submodules(&self) -> impl Future<Output = Result<bool>>;

    /// Export the checked-out submodules into `dest` at their recorded revisions
    fn export_submodules(&self, dest: &Path) -> impl Future<Output = Result<()>>;

    /// Push the current branch and the version's tag to the public repository
    fn push_head_and_tag(&self, version: &str) -> impl Future<Output = Result<()>>;
}

/// Fail if a release tag for `version` already exists
pub async fn ensure_no_tag<S: ScmAdapter>(scm: &S, version: &str) -> Result<()> {
    let tagged = scm.tagged_versions().await?;
    if tagged.iter().any(|v| v == version) {
        return Err(PreconditionError::TagExists {
            tag: tag_name(version),
        }
        .into());
    }
    Ok(())
}
