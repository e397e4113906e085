//! Changelog export from the version-control log.

use crate::error::Result;
use crate::scm::{ScmAdapter, tag_name};
use std::path::{Path, PathBuf};

/// File name of the changelog for a version
pub fn changelog_file_name(version: &str) -> String {
    format!("changelog-{}", version)
}

/// Write the log between the previous release tag and `head` into `dir`
pub async fn export_changelog<S: ScmAdapter>(
    scm: &S,
    dir: &Path,
    version: &str,
    previous_release: Option<&str>,
    head: &str,
) -> Result<PathBuf> {
    let from = previous_release.map(tag_name);
    let log = scm.diff_log(from.as_deref(), head).await?;
    let path = dir.join(changelog_file_name(version));
    std::fs::write(&path, log)?;
    Ok(path)
}
