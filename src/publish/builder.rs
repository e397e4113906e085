//! Secondary builds (binaries for other architectures).
//!
//! The build command runs in the release directory with `RELEASE_VERSION`
//! and `SRC_DESCRIPTOR` set, and leaves one descriptor per produced archive
//! in `binaries/*.json`.

use super::ArtifactDescriptor;
use crate::error::{Result, ToolError};
use crate::process::{RELEASE_VERSION_ENV, check_shell};
use std::path::{Path, PathBuf};

/// Directory (inside the release directory) holding secondary build output
pub const BINARIES_DIR: &str = "binaries";

/// Environment variable naming the source descriptor for the build command
pub const SRC_DESCRIPTOR_ENV: &str = "SRC_DESCRIPTOR";

/// Runs the configured secondary build command
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: String,
}

impl CommandBuilder {
    /// Builder for a shell command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Build binaries for `version` from the source descriptor
    pub async fn build(&self, release_dir: &Path, version: &str, src_descriptor: &Path) -> Result<()> {
        std::fs::create_dir_all(release_dir.join(BINARIES_DIR))?;
        let descriptor = src_descriptor.to_string_lossy().into_owned();
        check_shell(
            &self.command,
            &[],
            release_dir,
            &[(RELEASE_VERSION_ENV, version), (SRC_DESCRIPTOR_ENV, descriptor.as_str())],
        )
        .await
    }
}

/// Descriptors produced by secondary builds, with the archive each refers to
pub fn binary_descriptors(release_dir: &Path) -> Result<Vec<(ArtifactDescriptor, PathBuf)>> {
    let pattern = release_dir.join(BINARIES_DIR).join("*.json");
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern).map_err(|e| ToolError::CommandFailed {
        command: format!("glob {}", pattern),
        reason: e.to_string(),
    })?;

    let mut found = Vec::new();
    for path in paths {
        let path = path.map_err(|e| ToolError::CommandFailed {
            command: format!("glob {}", pattern),
            reason: e.to_string(),
        })?;
        let descriptor = ArtifactDescriptor::load(&path)?;
        let dir = path.parent().unwrap_or(release_dir);
        let archive = dir.join(&descriptor.archive.file);
        found.push((descriptor, archive));
    }
    found.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(found)
}
