//! Command line argument parsing and validation.
//!
//! Every setting can also come from the environment, so a release directory
//! can carry its configuration in a small wrapper script.

use crate::config::{ReleaseConfig, RetryConfig, non_empty};
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resumable release tool: tag, archive, test and publish a source release
#[derive(Parser, Debug)]
#[command(
    name = "resumable_release",
    version,
    about = "Resumable release tool for version-controlled projects",
    long_about = "Cut a release from a git working copy: commit the release version, export \
and test the source archive, then tag, publish and upload it.

Progress is recorded in release-status.json inside the releases directory. Run the \
same command again to resume an interrupted release.

Usage:
  resumable_release                      # start or resume a release
  resumable_release status               # show the release in progress
  resumable_release rollback             # abandon an unfinished release"
)]
pub struct Args {
    /// Subcommand (defaults to `release`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Release manifest inside the working copy
    #[arg(long, global = true, env = "RELEASE_MANIFEST", default_value = "release.toml")]
    pub manifest: PathBuf,

    /// Directory holding release directories and the status file
    #[arg(long, global = true, env = "RELEASE_DIR", default_value = ".")]
    pub releases_dir: PathBuf,

    /// Version to release instead of asking
    #[arg(long, global = true, env = "RELEASE_VERSION")]
    pub release_version: Option<String>,

    /// Test runner, called with the extracted manifest path
    #[arg(long, global = true, env = "RELEASE_TEST_COMMAND")]
    pub test_command: Option<String>,

    /// Upload command, called with the archive paths (empty = upload by hand)
    #[arg(long, global = true, env = "RELEASE_UPLOAD_COMMAND")]
    pub upload_command: Option<String>,

    /// Public URL of the archive directory ($RELEASE_VERSION is expanded)
    #[arg(long, global = true, env = "RELEASE_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Master feed file listing every release
    #[arg(long, global = true, env = "RELEASE_MASTER_FEED")]
    pub master_feed: Option<PathBuf>,

    /// Command publishing the master feed (empty = upload by hand)
    #[arg(long, global = true, env = "RELEASE_FEED_UPLOAD_COMMAND")]
    pub feed_upload_command: Option<String>,

    /// Repository receiving the branch and tag (empty = push by hand)
    #[arg(long, global = true, env = "RELEASE_PUBLIC_REPOSITORY")]
    pub public_repository: Option<String>,

    /// Command building binaries from the source descriptor
    #[arg(long, global = true, env = "RELEASE_BUILD_COMMAND")]
    pub build_command: Option<String>,

    /// Show detailed progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new release or resume the one in progress
    Release,

    /// Show the release in progress
    Status {
        /// Print the raw status file
        #[arg(long)]
        json: bool,
    },

    /// Abandon an unfinished (untagged) release
    Rollback {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Command {
    /// Name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Release => "release",
            Command::Status { .. } => "status",
            Command::Rollback { .. } => "rollback",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Release)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = non_empty(self.release_version.clone()) {
            if version.chars().any(char::is_whitespace) {
                return Err(format!("release version '{}' contains whitespace", version));
            }
        }
        if self.manifest.as_os_str().is_empty() {
            return Err("manifest path must not be empty".to_string());
        }
        Ok(())
    }

    /// Build the run configuration; empty values count as unset
    pub fn to_config(&self) -> Result<ReleaseConfig> {
        let mut config = ReleaseConfig::new(&self.manifest, &self.releases_dir)?
            .with_master_feed(self.master_feed.as_deref().filter(|p| !p.as_os_str().is_empty()))?;
        config.release_version = non_empty(self.release_version.clone());
        config.test_command = non_empty(self.test_command.clone());
        config.upload_command = non_empty(self.upload_command.clone());
        config.public_url = non_empty(self.public_url.clone());
        config.feed_upload_command = non_empty(self.feed_upload_command.clone());
        config.public_repository = non_empty(self.public_repository.clone());
        config.build_command = non_empty(self.build_command.clone());
        config.retry = RetryConfig::from_env();
        Ok(config)
    }
}
