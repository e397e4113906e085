//! Runtime configuration for a release run.
//!
//! Built by the CLI from flags and their environment fallbacks. Empty
//! strings count as unset.

mod retry;

pub use retry::RetryConfig;

use crate::error::{PreconditionError, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Variable expanded in the public URL template
pub const VERSION_PLACEHOLDER: &str = "$RELEASE_VERSION";

/// Settings for one release run
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Release manifest inside the working copy
    pub manifest_path: PathBuf,
    /// Where release directories, archives and the checkpoint live
    pub releases_dir: PathBuf,
    /// Version to release instead of asking
    pub release_version: Option<String>,
    /// Test runner, called with the extracted manifest path
    pub test_command: Option<String>,
    /// Upload command; unset means manual upload
    pub upload_command: Option<String>,
    /// URL of the directory the archives are published in
    pub public_url: Option<String>,
    /// Aggregate feed listing all releases
    pub master_feed: Option<PathBuf>,
    /// Command publishing the master feed; unset means manual
    pub feed_upload_command: Option<String>,
    /// Repository to push the tag and branch to; unset means manual
    pub public_repository: Option<String>,
    /// Command building secondary artifacts
    pub build_command: Option<String>,
    /// Upload retry policy
    pub retry: RetryConfig,
}

/// Treat empty or whitespace-only values as unset
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

impl ReleaseConfig {
    /// Configuration with every optional setting unset
    pub fn new(manifest_path: &Path, releases_dir: &Path) -> Result<Self> {
        Ok(Self {
            manifest_path: absolute(manifest_path)?,
            releases_dir: absolute(releases_dir)?,
            release_version: None,
            test_command: None,
            upload_command: None,
            public_url: None,
            master_feed: None,
            feed_upload_command: None,
            public_repository: None,
            build_command: None,
            retry: RetryConfig::default(),
        })
    }

    /// Set the master feed, made absolute
    pub fn with_master_feed(mut self, feed: Option<&Path>) -> Result<Self> {
        self.master_feed = feed.map(absolute).transpose()?;
        Ok(self)
    }

    /// Public archive directory URL for a version (with a trailing `/`)
    pub fn public_url_for(&self, version: &str) -> Result<String> {
        let template = self
            .public_url
            .as_deref()
            .ok_or(PreconditionError::MissingSetting {
                setting: "Public archive URL (--public-url)",
            })?;
        let expanded = template
            .replace("${RELEASE_VERSION}", version)
            .replace(VERSION_PLACEHOLDER, version);
        if expanded.ends_with('/') {
            Ok(expanded)
        } else {
            Ok(format!("{}/", expanded))
        }
    }

    /// Master feed path, required for publishing
    pub fn require_master_feed(&self) -> Result<&Path> {
        self.master_feed.as_deref().ok_or_else(|| {
            PreconditionError::MissingSetting {
                setting: "Master feed (--master-feed)",
            }
            .into()
        })
    }
}
