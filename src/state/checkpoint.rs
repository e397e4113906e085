//! The persisted release checkpoint.
//!
//! A field being present means the corresponding phase completed. Fields are
//! only ever added during a release; the whole record is deleted when the
//! release is published or abandoned.

use crate::error::{Result, StateError};
use crate::upload::{UploadRecord, UploadStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the checkpoint file format
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Flat record of how far a release has progressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseCheckpoint {
    /// Version of the file format
    pub format_version: u32,
    /// Revision of HEAD when the release started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_before_release: Option<String>,
    /// Version being released
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    /// Development version before the release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_snapshot_version: Option<String>,
    /// Revision of the release commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_at_release: Option<String>,
    /// Revision of the `-post` development commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_snapshot_version_revision: Option<String>,
    /// Source archive produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_archive: Option<DateTime<Utc>>,
    /// Tests on the extracted archive succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_tests_passed: Option<DateTime<Utc>>,
    /// Release commit tagged and working branch restored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagged: Option<DateTime<Utc>>,
    /// Master feed updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_master_feed: Option<DateTime<Utc>>,
    /// Per-artifact upload status, in artifact order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_uploads: Option<Vec<UploadRecord>>,
}

impl Default for ReleaseCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

fn set_once(field: &'static str, slot: &mut Option<String>, value: &str) -> Result<()> {
    match slot {
        Some(current) if current != value => Err(StateError::ImmutableField {
            field,
            current: current.clone(),
            requested: value.to_string(),
        }
        .into()),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

fn mark(slot: &mut Option<DateTime<Utc>>) {
    if slot.is_none() {
        *slot = Some(Utc::now());
    }
}

impl ReleaseCheckpoint {
    /// Empty checkpoint in the current format
    pub fn new() -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            head_before_release: None,
            release_version: None,
            old_snapshot_version: None,
            head_at_release: None,
            new_snapshot_version_revision: None,
            created_archive: None,
            src_tests_passed: None,
            tagged: None,
            updated_master_feed: None,
            verified_uploads: None,
        }
    }

    /// Record the starting revision (write-once)
    pub fn set_head_before_release(&mut self, rev: &str) -> Result<()> {
        set_once("headBeforeRelease", &mut self.head_before_release, rev)
    }

    /// Record the release version (write-once)
    pub fn set_release_version(&mut self, version: &str) -> Result<()> {
        set_once("releaseVersion", &mut self.release_version, version)
    }

    /// Record the previous development version
    pub fn set_old_snapshot_version(&mut self, version: &str) -> Result<()> {
        set_once("oldSnapshotVersion", &mut self.old_snapshot_version, version)
    }

    /// Record the release commit
    pub fn set_head_at_release(&mut self, rev: &str) -> Result<()> {
        set_once("headAtRelease", &mut self.head_at_release, rev)
    }

    /// Record the development-version commit
    pub fn set_new_snapshot_version_revision(&mut self, rev: &str) -> Result<()> {
        set_once(
            "newSnapshotVersionRevision",
            &mut self.new_snapshot_version_revision,
            rev,
        )
    }

    /// Mark the archive as built
    pub fn mark_created_archive(&mut self) {
        mark(&mut self.created_archive);
    }

    /// Mark the candidate's tests as passed
    pub fn mark_src_tests_passed(&mut self) {
        mark(&mut self.src_tests_passed);
    }

    /// Mark the release as tagged
    pub fn mark_tagged(&mut self) {
        mark(&mut self.tagged);
    }

    /// Mark the master feed as updated
    pub fn mark_updated_master_feed(&mut self) {
        mark(&mut self.updated_master_feed);
    }

    /// Validate format and internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_FORMAT_VERSION,
                found: self.format_version,
            }
            .into());
        }
        if self.head_before_release.is_none() && self.release_version.is_some() {
            return Err(StateError::Corrupted {
                reason: "releaseVersion recorded without headBeforeRelease".to_string(),
            }
            .into());
        }
        if self.release_version.is_none()
            && (self.created_archive.is_some() || self.tagged.is_some())
        {
            return Err(StateError::Corrupted {
                reason: "phase markers recorded without releaseVersion".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Human-readable progress line
    pub fn summary(&self) -> String {
        let version = self.release_version.as_deref().unwrap_or("(not chosen)");
        let mut done = Vec::new();
        if self.new_snapshot_version_revision.is_some() {
            done.push("committed");
        }
        if self.created_archive.is_some() {
            done.push("archived");
        }
        if self.src_tests_passed.is_some() {
            done.push("tested");
        }
        if self.tagged.is_some() {
            done.push("tagged");
        }
        if self.updated_master_feed.is_some() {
            done.push("feed updated");
        }
        let uploads = self
            .verified_uploads
            .as_ref()
            .map(|records| {
                let verified = records
                    .iter()
                    .filter(|r| r.status == UploadStatus::Verified)
                    .count();
                format!(", uploads {}/{} verified", verified, records.len())
            })
            .unwrap_or_default();

        let progress = if done.is_empty() {
            "started".to_string()
        } else {
            done.join(", ")
        };
        format!("Release {} - {}{}", version, progress, uploads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_omitted() {
        let mut cp = ReleaseCheckpoint::new();
        cp.set_head_before_release("abc").unwrap();

        let json = serde_json::to_value(&cp).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["headBeforeRelease"], "abc");
        assert_eq!(obj["formatVersion"], STATE_FORMAT_VERSION);
    }

    #[test]
    fn test_write_once_fields() {
        let mut cp = ReleaseCheckpoint::new();
        cp.set_release_version("1.0").unwrap();
        cp.set_release_version("1.0").unwrap();
        let err = cp.set_release_version("1.1").unwrap_err();
        assert!(err.to_string().contains("releaseVersion"));
        assert_eq!(cp.release_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_markers_keep_first_timestamp() {
        let mut cp = ReleaseCheckpoint::new();
        cp.mark_tagged();
        let first = cp.tagged;
        cp.mark_tagged();
        assert_eq!(cp.tagged, first);
    }

    #[test]
    fn test_validate_rejects_other_format() {
        let mut cp = ReleaseCheckpoint::new();
        cp.format_version = STATE_FORMAT_VERSION + 1;
        assert!(cp.validate().is_err());
    }

    #[test]
    fn test_summary_mentions_progress() {
        let mut cp = ReleaseCheckpoint::new();
        cp.set_head_before_release("a").unwrap();
        cp.set_release_version("1.0").unwrap();
        cp.mark_created_archive();
        cp.verified_uploads = Some(vec![UploadRecord {
            name: "demo-1.0.tar.gz".to_string(),
            status: UploadStatus::Verified,
        }]);
        let summary = cp.summary();
        assert!(summary.starts_with("Release 1.0 - archived"));
        assert!(summary.ends_with("uploads 1/1 verified"));
    }
}
