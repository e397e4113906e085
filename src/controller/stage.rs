//! Resume decision: where does this invocation pick up?

use crate::error::{ConsistencyError, Result, StateError};
use crate::state::ReleaseCheckpoint;
use std::fmt;
use std::path::Path;

/// Stage a run starts in, computed once from the checkpoint and the live head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    /// No checkpoint: start a new release
    Fresh,
    /// Only the starting revision was recorded and HEAD has not moved
    Restart,
    /// Release and development commits exist; tests still to run
    TestCandidate,
    /// Tests passed; waiting for the operator's decision
    AwaitDecision,
    /// Tagged; finish the idempotent publishing steps
    Publishing,
}

impl ReleaseStage {
    /// Derive the stage.
    ///
    /// Fails with a consistency error whenever the live head contradicts what
    /// the checkpoint assumes.
    pub fn derive(
        checkpoint: Option<&ReleaseCheckpoint>,
        live_head: &str,
        state_file: &Path,
    ) -> Result<Self> {
        let Some(checkpoint) = checkpoint else {
            return Ok(ReleaseStage::Fresh);
        };
        let Some(head_before) = checkpoint.head_before_release.as_deref() else {
            return Err(StateError::Corrupted {
                reason: format!("{} has no headBeforeRelease", state_file.display()),
            }
            .into());
        };

        if checkpoint.release_version.is_none() {
            if live_head == head_before {
                return Ok(ReleaseStage::Restart);
            }
            return Err(ConsistencyError::HeadMoved {
                expected: head_before.to_string(),
                found: live_head.to_string(),
                state_file: state_file.to_path_buf(),
            }
            .into());
        }

        if checkpoint.tagged.is_some() {
            return Ok(ReleaseStage::Publishing);
        }

        if checkpoint.new_snapshot_version_revision.is_none() {
            return Err(ConsistencyError::IncompleteSnapshotBump {
                head_before_release: head_before.to_string(),
                state_file: state_file.to_path_buf(),
            }
            .into());
        }

        if live_head != head_before {
            return Err(ConsistencyError::CommitsSinceStart {
                expected: head_before.to_string(),
                found: live_head.to_string(),
                state_file: state_file.to_path_buf(),
            }
            .into());
        }

        if checkpoint.src_tests_passed.is_none() {
            Ok(ReleaseStage::TestCandidate)
        } else {
            Ok(ReleaseStage::AwaitDecision)
        }
    }

    /// Whether this run creates the release and development commits
    pub fn is_first_run(self) -> bool {
        matches!(self, ReleaseStage::Fresh | ReleaseStage::Restart)
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStage::Fresh => write!(f, "Fresh"),
            ReleaseStage::Restart => write!(f, "Restart"),
            ReleaseStage::TestCandidate => write!(f, "Test candidate"),
            ReleaseStage::AwaitDecision => write!(f, "Await decision"),
            ReleaseStage::Publishing => write!(f, "Publishing"),
        }
    }
}
