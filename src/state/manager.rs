//! Checkpoint persistence.
//!
//! The checkpoint lives in a single JSON file that is replaced atomically on
//! every save (temp file, fsync, rename), so a crash leaves either the old or
//! the new record on disk, never a torn one.

use crate::error::{PreconditionError, Result, StateError};
use crate::state::ReleaseCheckpoint;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Loads, saves and removes the checkpoint file
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Path to state file
    state_file_path: PathBuf,
}

impl StateManager {
    /// Create a state manager for the given file
    pub fn new<P: AsRef<Path>>(state_file_path: P) -> Self {
        Self {
            state_file_path: state_file_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    /// Whether a checkpoint exists
    pub fn exists(&self) -> bool {
        self.state_file_path.exists()
    }

    /// Persist the checkpoint atomically
    pub fn save(&self, checkpoint: &ReleaseCheckpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to serialize state: {}", e),
        })?;

        let temp_file_path = self.state_file_path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_file_path).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create temp file: {}", e),
            })?;
            file.write_all(json.as_bytes())
                .map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to write state: {}", e),
                })?;
            file.sync_all().map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to sync state: {}", e),
            })?;
        }

        // Atomic rename
        fs::rename(&temp_file_path, &self.state_file_path).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to rename temp file: {}", e),
        })?;

        log::debug!("Saved checkpoint: {}", checkpoint.summary());
        Ok(())
    }

    /// Load and validate the checkpoint
    pub fn load(&self) -> Result<ReleaseCheckpoint> {
        if !self.exists() {
            return Err(StateError::NotFound.into());
        }
        let content = fs::read_to_string(&self.state_file_path).map_err(|e| {
            StateError::LoadFailed {
                reason: format!("Failed to read {}: {}", self.state_file_path.display(), e),
            }
        })?;
        let checkpoint: ReleaseCheckpoint =
            serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
                reason: format!("{}: {}", self.state_file_path.display(), e),
            })?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Load the checkpoint if one exists
    pub fn load_if_exists(&self) -> Result<Option<ReleaseCheckpoint>> {
        if self.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Start a new release by persisting its first field.
    ///
    /// Refuses when a checkpoint already exists; the caller must resume instead.
    pub fn begin_release(&self, head_before_release: &str) -> Result<ReleaseCheckpoint> {
        if self.exists() {
            return Err(PreconditionError::ReleaseInProgress {
                state_file: self.state_file_path.clone(),
            }
            .into());
        }
        let mut checkpoint = ReleaseCheckpoint::new();
        checkpoint.set_head_before_release(head_before_release)?;
        self.save(&checkpoint)?;
        Ok(checkpoint)
    }

    /// Delete the checkpoint (publish or abandon)
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.state_file_path) {
            Ok(()) => {
                log::debug!("Removed checkpoint {}", self.state_file_path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::SaveFailed {
                reason: format!("Failed to remove {}: {}", self.state_file_path.display(), e),
            }
            .into()),
        }
    }
}
