//! Checkpoint state for release operations.
//!
//! This module provides the persisted checkpoint record and its store,
//! enabling interrupted releases to resume without repeating steps.

mod checkpoint;
mod manager;

pub use checkpoint::{ReleaseCheckpoint, STATE_FORMAT_VERSION};
pub use manager::StateManager;

use std::path::{Path, PathBuf};

/// Name of the checkpoint file inside the releases directory
pub const STATE_FILE_NAME: &str = "release-status.json";

/// Path of the checkpoint file for a releases directory
pub fn state_file_path(releases_dir: &Path) -> PathBuf {
    releases_dir.join(STATE_FILE_NAME)
}

/// Create a state manager for the releases directory
pub fn create_state_manager(releases_dir: &Path) -> StateManager {
    StateManager::new(state_file_path(releases_dir))
}
