//! The upload/verify loop.

use super::{UploadAction, UploadEntry, UploadStatus, pending_names};
use crate::config::RetryConfig;
use crate::error::{CliError, ReleaseError, Result, UploadError};
use crate::upload::RemoteSizeProbe;
use std::path::PathBuf;

/// What happened in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Artifacts handed to the upload action
    pub uploaded: Vec<String>,
    /// Artifacts verified in this pass
    pub verified: Vec<String>,
    /// Artifacts that failed verification, with a diagnostic
    pub failed: Vec<(String, String)>,
}

/// Drives uploads until every artifact is verified
pub struct UploadVerifier<'a, A: UploadAction, P: RemoteSizeProbe> {
    action: &'a A,
    probe: &'a P,
    retry: &'a RetryConfig,
}

impl<'a, A: UploadAction, P: RemoteSizeProbe> UploadVerifier<'a, A, P> {
    /// Create a verifier
    pub fn new(action: &'a A, probe: &'a P, retry: &'a RetryConfig) -> Self {
        Self {
            action,
            probe,
            retry,
        }
    }

    /// One pass: upload everything `needed`, then check everything `attempted`.
    ///
    /// `persist` is called after marking uploads as attempted and again after
    /// verification.
    pub async fn run_pass<F>(&self, entries: &mut [UploadEntry], persist: &mut F) -> Result<PassReport>
    where
        F: FnMut(&[UploadEntry]) -> Result<()>,
    {
        let mut report = PassReport::default();

        let mut batch: Vec<PathBuf> = Vec::new();
        for entry in entries.iter_mut().filter(|e| e.status == UploadStatus::Needed) {
            entry.status = UploadStatus::Attempted;
            batch.push(entry.local_path.clone());
            report.uploaded.push(entry.name.clone());
        }

        if !batch.is_empty() {
            persist(entries)?;
            match self.action.upload(&batch).await {
                Ok(()) => {}
                Err(e @ ReleaseError::Cli(CliError::Cancelled { .. })) => return Err(e),
                // Verification decides whether the upload worked
                Err(e) => log::warn!("Upload action failed: {}", e),
            }
        }

        for entry in entries.iter_mut().filter(|e| e.status == UploadStatus::Attempted) {
            match self.probe.remote_size(&entry.url).await {
                Ok(Some(size)) if size == entry.expected_size => {
                    entry.status = UploadStatus::Verified;
                    report.verified.push(entry.name.clone());
                }
                outcome => {
                    let reason = match outcome {
                        Ok(Some(size)) => format!(
                            "{} is {} bytes, but the local file is {} bytes",
                            entry.url, size, entry.expected_size
                        ),
                        Ok(None) => format!("{} does not exist", entry.url),
                        Err(e) => e.to_string(),
                    };
                    log::warn!("Upload of {} not verified: {}", entry.name, reason);
                    entry.status = UploadStatus::Needed;
                    report.failed.push((entry.name.clone(), reason));
                }
            }
        }

        persist(entries)?;
        Ok(report)
    }

    /// Repeat passes until all entries are verified.
    ///
    /// Command uploads are retried with exponential backoff up to the retry
    /// budget. Manual uploads prompt again on every pass.
    pub async fn run<F>(&self, entries: &mut [UploadEntry], persist: &mut F) -> Result<()>
    where
        F: FnMut(&[UploadEntry]) -> Result<()>,
    {
        let mut passes = 0u32;
        loop {
            if entries.iter().all(|e| e.status == UploadStatus::Verified) {
                return Ok(());
            }

            let report = self.run_pass(entries, persist).await?;
            passes += 1;
            log::info!(
                "Upload pass {}: {} uploaded, {} verified, {} failed",
                passes,
                report.uploaded.len(),
                report.verified.len(),
                report.failed.len()
            );

            if entries.iter().all(|e| e.status == UploadStatus::Verified) {
                return Ok(());
            }
            if self.action.is_manual() {
                continue;
            }
            if passes > self.retry.file_uploads {
                return Err(UploadError::RetriesExhausted {
                    passes,
                    pending: pending_names(entries),
                }
                .into());
            }
            let delay = self.retry.backoff(passes);
            log::info!("Retrying uploads in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
