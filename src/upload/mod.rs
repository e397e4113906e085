//! Upload verification.
//!
//! Each artifact moves `needed → attempted → verified`, or back to `needed`
//! when the remote copy is missing or has the wrong size. Statuses are
//! persisted after every transition so an interrupted run resumes without
//! re-uploading what may already be there.

mod action;
mod probe;
mod verifier;

pub use action::{CommandUpload, ConfiguredUpload, ManualUpload, UploadAction};
pub use probe::{HttpSizeProbe, RemoteSizeProbe};
pub use verifier::{PassReport, UploadVerifier};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Per-artifact upload state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Not uploaded (or last check failed)
    Needed,
    /// Upload action invoked, not yet verified
    Attempted,
    /// Remote size matches the local file
    Verified,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Needed => write!(f, "needed"),
            UploadStatus::Attempted => write!(f, "attempted"),
            UploadStatus::Verified => write!(f, "verified"),
        }
    }
}

/// Persisted `{name, status}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Artifact file name
    pub name: String,
    /// Last known status
    pub status: UploadStatus,
}

/// An artifact to publish, derived fresh on every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    /// Artifact file name (the persistence key)
    pub name: String,
    /// Local file
    pub local_path: PathBuf,
    /// Where the file must appear once uploaded
    pub url: String,
    /// Size of the local file in bytes
    pub expected_size: u64,
    /// Current status
    pub status: UploadStatus,
}

impl UploadEntry {
    /// Entry for a local file, sized from disk
    pub fn from_file(local_path: &Path, url: String) -> Result<Self> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| local_path.display().to_string());
        Ok(Self {
            name,
            local_path: local_path.to_path_buf(),
            url,
            expected_size: std::fs::metadata(local_path)?.len(),
            status: UploadStatus::Needed,
        })
    }
}

/// Apply persisted statuses to freshly derived entries, keyed by name.
///
/// Names with no record start `needed`; records for artifacts that no longer
/// exist are dropped by the next [`to_records`].
pub fn reconcile(records: Option<&[UploadRecord]>, entries: &mut [UploadEntry]) {
    let known: HashMap<&str, UploadStatus> = records
        .unwrap_or_default()
        .iter()
        .map(|r| (r.name.as_str(), r.status))
        .collect();
    for entry in entries.iter_mut() {
        entry.status = known
            .get(entry.name.as_str())
            .copied()
            .unwrap_or(UploadStatus::Needed);
    }
}

/// Records to persist for the current entries, in entry order
pub fn to_records(entries: &[UploadEntry]) -> Vec<UploadRecord> {
    entries
        .iter()
        .map(|e| UploadRecord {
            name: e.name.clone(),
            status: e.status,
        })
        .collect()
}

/// Names of entries not yet verified
pub fn pending_names(entries: &[UploadEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.status != UploadStatus::Verified)
        .map(|e| e.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> UploadEntry {
        UploadEntry {
            name: name.to_string(),
            local_path: PathBuf::from(name),
            url: format!("http://example.com/{}", name),
            expected_size: 1,
            status: UploadStatus::Needed,
        }
    }

    #[test]
    fn test_reconcile_by_name() {
        let records = vec![
            UploadRecord {
                name: "gone.tar.gz".to_string(),
                status: UploadStatus::Verified,
            },
            UploadRecord {
                name: "b.tar.gz".to_string(),
                status: UploadStatus::Attempted,
            },
        ];
        let mut entries = vec![entry("a.tar.gz"), entry("b.tar.gz")];

        reconcile(Some(&records), &mut entries);

        assert_eq!(entries[0].status, UploadStatus::Needed);
        assert_eq!(entries[1].status, UploadStatus::Attempted);
        let names: Vec<_> = to_records(&entries).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a.tar.gz", "b.tar.gz"]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&UploadRecord {
            name: "x".to_string(),
            status: UploadStatus::Attempted,
        })
        .unwrap();
        assert_eq!(json, r#"{"name":"x","status":"attempted"}"#);
    }
}
