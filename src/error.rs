//! Error types for release operations.
//!
//! Every fatal condition surfaces as a single [`ReleaseError`] carrying a
//! human-readable explanation and recovery suggestions for the operator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// A precondition did not hold; nothing was changed
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Live repository state diverged from the checkpoint
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Version control errors
    #[error("SCM error: {0}")]
    Scm(#[from] ScmError),

    /// External tool failures (tests, hooks, builds)
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Checkpoint persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Release manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Version parsing and substitution errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Upload verification errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// CLI and operator interaction errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML editing errors
    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),
}

/// Conditions checked before any state is mutated
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// Working tree has uncommitted changes
    #[error("Uncommitted changes in working tree:\n{files}")]
    DirtyWorkingTree {
        /// Porcelain status of the changed files
        files: String,
    },

    /// Working tree has uncommitted changes while a release is checkpointed
    #[error(
        "Uncommitted changes in working tree during the release started at {head_before_release}:\n{files}"
    )]
    DirtyReleaseTree {
        /// Porcelain status of the changed files
        files: String,
        /// Checkpointed head
        head_before_release: String,
    },

    /// A file the release needs is not under version control
    #[error("'{path}' is not under version control")]
    Untracked {
        /// Path that must be tracked
        path: PathBuf,
    },

    /// Release tag is already taken
    #[error("Release tag '{tag}' already exists")]
    TagExists {
        /// Tag name
        tag: String,
    },

    /// A checkpoint already exists
    #[error("Release already in progress (checkpoint {state_file})")]
    ReleaseInProgress {
        /// Path to the existing checkpoint
        state_file: PathBuf,
    },

    /// Requested version differs from the release being resumed
    #[error(
        "Can't start release of version {requested}; we are currently releasing {in_progress}.\nDelete '{state_file}' to abort the previous release."
    )]
    VersionConflict {
        /// Version asked for on this invocation
        requested: String,
        /// Version recorded in the checkpoint
        in_progress: String,
        /// Path to the checkpoint
        state_file: PathBuf,
    },

    /// Release directory vanished between runs
    #[error("Can't resume; directory {path} missing. Try deleting '{state_file}'.")]
    ReleaseDirectoryMissing {
        /// Expected release directory
        path: PathBuf,
        /// Path to the checkpoint
        state_file: PathBuf,
    },

    /// Archive recorded as built is not on disk
    #[error("Can't resume; archive {path} recorded as built but missing. Try deleting '{state_file}'.")]
    ArchiveMissing {
        /// Expected archive file
        path: PathBuf,
        /// Path to the checkpoint
        state_file: PathBuf,
    },

    /// The extracted archive does not contain the release manifest
    #[error("Release manifest not in archive at {path}. Is it under version control?")]
    ManifestNotInArchive {
        /// Expected location inside the extracted tree
        path: PathBuf,
    },

    /// Declared main executable missing from the extracted archive
    #[error("Main executable '{path}' not found after unpacking archive")]
    MainExecutableMissing {
        /// Expected location inside the extracted tree
        path: PathBuf,
    },

    /// Master feed already lists this version
    #[error("Master feed {feed} already contains a release with version {version}")]
    AlreadyInMasterFeed {
        /// Feed file
        feed: PathBuf,
        /// Version being released
        version: String,
    },

    /// A setting needed for publishing is not configured
    #[error("{setting} is not set! Edit configuration and try again.")]
    MissingSetting {
        /// Human-readable setting name
        setting: &'static str,
    },

    /// Version suggestion needs a snapshot version
    #[error("No release version given and none can be suggested: {reason}")]
    NoReleaseVersion {
        /// Why no default exists
        reason: String,
    },
}

/// The live repository no longer matches what the checkpoint assumes
#[derive(Error, Debug)]
pub enum ConsistencyError {
    /// HEAD moved before the release commit was recorded
    #[error(
        "Something went wrong with the last run:\nHEAD revision for last run was {expected}\nHEAD revision now is {found}\nYou should revert your working copy to the previous head and try again.\nIf you're sure you want to release from the current head, delete '{state_file}'"
    )]
    HeadMoved {
        /// Checkpointed head
        expected: String,
        /// Live head
        found: String,
        /// Path to the checkpoint
        state_file: PathBuf,
    },

    /// More commits landed after the release was cut
    #[error(
        "There are more commits since we started!\nHEAD was {expected}\nHEAD now {found}\nTo include them, delete '{state_file}' and try again.\nTo leave them out, put them on a new branch and reset HEAD to the release version."
    )]
    CommitsSinceStart {
        /// Checkpointed head
        expected: String,
        /// Live head
        found: String,
        /// Path to the checkpoint
        state_file: PathBuf,
    },

    /// Re-check before tagging failed
    #[error("Changes committed since we started!\nHEAD was {expected}\nHEAD now {found}")]
    ChangesCommittedSinceStart {
        /// Checkpointed head
        expected: String,
        /// Live head
        found: String,
    },

    /// Crash between release commit and development-version commit
    #[error(
        "Something went wrong previously when setting the new snapshot version.\nSuggest you reset to the original HEAD of\n{head_before_release} and delete '{state_file}'."
    )]
    IncompleteSnapshotBump {
        /// Checkpointed head
        head_before_release: String,
        /// Path to the checkpoint
        state_file: PathBuf,
    },
}

/// Version control errors
#[derive(Error, Debug)]
pub enum ScmError {
    /// Not inside a repository
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Path that was opened
        path: PathBuf,
    },

    /// Backend command failed
    #[error("`{command}` failed: {stderr}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Captured stderr
        stderr: String,
    },

    /// Backend produced output we could not interpret
    #[error("Unexpected output from `{command}`: {reason}")]
    UnexpectedOutput {
        /// Command line
        command: String,
        /// What was wrong
        reason: String,
    },

    /// Push requested without a public repository
    #[error("No public repository configured for push")]
    NoPublicRepository,
}

/// External tool failures
#[derive(Error, Debug)]
pub enum ToolError {
    /// Test runner reported failure
    #[error("Self-test failed with exit status {}", display_code(*.code))]
    TestsFailed {
        /// Exit code (None when killed by a signal)
        code: Option<i32>,
    },

    /// A lifecycle hook failed
    #[error("Hook for phase '{phase}' failed ({command}) with exit status {}", display_code(*.code))]
    HookFailed {
        /// Hook phase
        phase: String,
        /// Hook command
        command: String,
        /// Exit code
        code: Option<i32>,
    },

    /// Any other external command failed
    #[error("Command `{command}` failed: {reason}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Why it failed
        reason: String,
    },

    /// Archive could not be produced or read
    #[error("Archive error for {path}: {reason}")]
    Archive {
        /// Archive or directory involved
        path: PathBuf,
        /// Why it failed
        reason: String,
    },
}

fn display_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "(signal)".to_string())
}

/// Checkpoint persistence errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State file corrupted
    #[error("State file corrupted: {reason}")]
    Corrupted {
        /// Reason for the error
        reason: String,
    },

    /// State file not found
    #[error("State file not found. No release in progress.")]
    NotFound,

    /// State version mismatch
    #[error("State file version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },

    /// A write-once field was given a different value
    #[error("Checkpoint field '{field}' is already '{current}', refusing to change it to '{requested}'")]
    ImmutableField {
        /// Field name
        field: &'static str,
        /// Recorded value
        current: String,
        /// Rejected value
        requested: String,
    },

    /// Failed to save state
    #[error("Failed to save state: {reason}")]
    SaveFailed {
        /// Reason for the error
        reason: String,
    },

    /// Failed to load state
    #[error("Failed to load state: {reason}")]
    LoadFailed {
        /// Reason for the error
        reason: String,
    },
}

/// Release manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest could not be read
    #[error("Cannot read release manifest {path}: {reason}")]
    Unreadable {
        /// Manifest path
        path: PathBuf,
        /// Why
        reason: String,
    },

    /// Manifest content is invalid
    #[error("Invalid release manifest {path}: {reason}")]
    Invalid {
        /// Manifest path
        path: PathBuf,
        /// Why
        reason: String,
    },
}

/// Version grammar and substitution errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Invalid version format
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// Suggestion needs a `-pre` or `-post` version
    #[error("Version '{version}' is not a snapshot version (should end in -pre or -post)")]
    NotSnapshot {
        /// Version string
        version: String,
    },

    /// Incrementing a version component would overflow
    #[error("Cannot increment version '{version}': component too large")]
    ComponentOverflow {
        /// Version string
        version: String,
    },

    /// Substitution path escapes the implementation directory
    #[error("Version substitution path must be relative: {path}")]
    AbsolutePath {
        /// Offending path
        path: PathBuf,
    },

    /// Substitution pattern has the wrong number of groups
    #[error("Regex '{pattern}' must have exactly one matching () group")]
    BadPattern {
        /// Pattern source
        pattern: String,
    },

    /// Substitution pattern did not match
    #[error("No matches for regex '{pattern}' in '{path}'")]
    NoMatch {
        /// Pattern source
        pattern: String,
        /// File searched
        path: PathBuf,
    },
}

/// Upload verification errors
#[derive(Error, Debug)]
pub enum UploadError {
    /// Remote size could not be determined
    #[error("Can't get size of '{url}': {reason}")]
    ProbeFailed {
        /// URL probed
        url: String,
        /// Why
        reason: String,
    },

    /// Automatic retries ran out with uploads still missing
    #[error("Uploads still not verified after {passes} pass(es): {}", .pending.join(", "))]
    RetriesExhausted {
        /// Passes performed in this run
        passes: u32,
        /// Artifacts still needed
        pending: Vec<String>,
    },
}

/// CLI and operator interaction errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Operator aborted a prompt
    #[error("Cancelled by operator: {reason}")]
    Cancelled {
        /// What was being asked
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Precondition(PreconditionError::DirtyWorkingTree { .. }) => vec![
                "Commit pending changes: git commit -a".to_string(),
                "Stash changes temporarily: git stash".to_string(),
            ],
            ReleaseError::Precondition(PreconditionError::DirtyReleaseTree {
                head_before_release,
                ..
            }) => vec![
                format!(
                    "Discard edits left by the interrupted release: git reset --hard {}",
                    head_before_release
                ),
                "Or abandon the release with `rollback`".to_string(),
                format!(
                    "Don't commit them: the release expects HEAD to stay at {}",
                    head_before_release
                ),
            ],
            ReleaseError::Precondition(PreconditionError::ReleaseInProgress { state_file })
            | ReleaseError::Precondition(PreconditionError::VersionConflict {
                state_file, ..
            }) => vec![
                "Run again without a version to resume the release in progress".to_string(),
                format!("Abort it with `rollback` or delete {}", state_file.display()),
            ],
            ReleaseError::Precondition(PreconditionError::TagExists { tag }) => vec![
                format!("Choose a version other than {}", tag),
                format!("Inspect the existing tag: git show {}", tag),
            ],
            ReleaseError::Consistency(ConsistencyError::CommitsSinceStart { expected, .. })
            | ReleaseError::Consistency(ConsistencyError::ChangesCommittedSinceStart {
                expected,
                ..
            }) => vec![
                format!("Move the new commits to a branch and reset to {}", expected),
                "Or discard the checkpoint with `rollback` and start again".to_string(),
            ],
            ReleaseError::Consistency(ConsistencyError::HeadMoved { expected, .. })
            | ReleaseError::Consistency(ConsistencyError::IncompleteSnapshotBump {
                head_before_release: expected,
                ..
            }) => vec![
                format!("Reset the working copy: git reset --hard {}", expected),
                "Then discard the checkpoint with `rollback`".to_string(),
            ],
            ReleaseError::Tool(ToolError::TestsFailed { .. }) => vec![
                "The release was rolled back; fix the failing tests and run again".to_string(),
            ],
            ReleaseError::Upload(UploadError::RetriesExhausted { .. }) => vec![
                "Check the upload command and the public URL".to_string(),
                "Run again to resume upload verification".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if re-running may succeed without operator changes
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ReleaseError::Consistency(_)
                | ReleaseError::State(StateError::Corrupted { .. })
                | ReleaseError::State(StateError::VersionMismatch { .. })
                | ReleaseError::Precondition(PreconditionError::TagExists { .. })
                | ReleaseError::Precondition(PreconditionError::AlreadyInMasterFeed { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tests_failed_message_names_exit_code() {
        let err = ReleaseError::from(ToolError::TestsFailed { code: Some(1) });
        assert!(err.to_string().contains("exit status 1"));
    }

    #[test]
    fn test_signal_exit_is_described() {
        let err = ToolError::TestsFailed { code: None };
        assert!(err.to_string().contains("(signal)"));
    }

    #[test]
    fn test_consistency_errors_are_not_recoverable() {
        let err = ReleaseError::from(ConsistencyError::ChangesCommittedSinceStart {
            expected: "a".to_string(),
            found: "b".to_string(),
        });
        assert!(!err.is_recoverable());
        assert!(err.recovery_suggestions()[0].contains("reset to a"));
    }

    #[test]
    fn test_dirty_tree_during_release_suggests_reset_not_commit() {
        let err = ReleaseError::from(PreconditionError::DirtyReleaseTree {
            files: " M demo.sh".to_string(),
            head_before_release: "abc123".to_string(),
        });
        let suggestions = err.recovery_suggestions();
        assert_eq!(
            suggestions[0],
            "Discard edits left by the interrupted release: git reset --hard abc123"
        );
        assert!(suggestions.iter().any(|s| s.contains("rollback")));
        assert!(!suggestions.iter().any(|s| s.contains("git commit")));

        let plain = ReleaseError::from(PreconditionError::DirtyWorkingTree {
            files: " M demo.sh".to_string(),
        });
        assert!(plain.recovery_suggestions()[0].contains("git commit -a"));
    }

    #[test]
    fn test_retries_exhausted_lists_pending() {
        let err = UploadError::RetriesExhausted {
            passes: 2,
            pending: vec!["a.tar.gz".to_string(), "b.tar.gz".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Uploads still not verified after 2 pass(es): a.tar.gz, b.tar.gz"
        );
    }
}
