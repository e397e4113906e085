//! Release manifest (`release.toml`) model.
//!
//! The manifest names the artifact, carries its current development version
//! and release date, and lists the version substitutions and lifecycle hooks
//! run during a release.

mod editor;

pub use editor::{publish, today};

use crate::error::{ManifestError, Result};
use crate::version::VersionSubstitution;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Parsed release manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseManifest {
    /// Human-readable artifact name
    pub name: String,
    /// Current version (a development `-pre`/`-post` version between releases)
    pub version: String,
    /// Release date (`YYYY-MM-DD`), empty for development versions
    #[serde(default)]
    pub released: String,
    /// Main executable, relative to the manifest's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<PathBuf>,
    /// Release management settings
    #[serde(default)]
    pub release: ReleaseManagement,
}

/// `[release]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseManagement {
    /// Put the sources in a directory named after the artifact inside the archive
    #[serde(default)]
    pub add_toplevel_directory: bool,
    /// Version substitution rules
    #[serde(default)]
    pub update_version: Vec<VersionSubstitution>,
    /// Lifecycle hooks
    #[serde(default, rename = "action")]
    pub actions: Vec<ReleaseAction>,
}

/// Phase a hook runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    /// Before the release commit, in the working copy
    CommitRelease,
    /// Inside the unpacked archive tree, before re-packing
    GenerateArchive,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::CommitRelease => write!(f, "commit-release"),
            HookPhase::GenerateArchive => write!(f, "generate-archive"),
        }
    }
}

/// A shell command bound to a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAction {
    /// When to run
    pub phase: HookPhase,
    /// Shell command line
    pub command: String,
}

impl ReleaseManifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: Self = toml::from_str(&content).map_err(|e| ManifestError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                reason: "'name' must not be empty".to_string(),
            }
            .into());
        }
        if let Some(main) = self.main.as_ref().filter(|m| m.is_absolute()) {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                reason: format!("'main' must be relative: {}", main.display()),
            }
            .into());
        }
        Ok(())
    }

    /// Archive base name: lowercased name with spaces replaced by `-`
    pub fn archive_base_name(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }

    /// Commands registered for a phase, in declaration order
    pub fn hooks(&self, phase: HookPhase) -> impl Iterator<Item = &str> {
        self.release
            .actions
            .iter()
            .filter(move |a| a.phase == phase)
            .map(|a| a.command.as_str())
    }
}
