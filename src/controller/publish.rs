//! Accepting a candidate: tag, update the master feed, upload and push.
//!
//! Every step is guarded by a checkpoint field so a resumed run repeats
//! only what has not completed.

use super::phases::Artifacts;
use super::{ReleaseController, ReleasePaths};
use crate::error::{ConsistencyError, Result, StateError};
use crate::operator::Operator;
use crate::process;
use crate::publish::{MasterFeed, archive_url, merge_descriptors};
use crate::scm::{INTEGRATION_BRANCH, ScmAdapter};
use crate::state::ReleaseCheckpoint;
use crate::upload::{
    self, CommandUpload, ConfiguredUpload, ManualUpload, RemoteSizeProbe, UploadEntry, UploadVerifier,
};
use std::path::Path;

impl<S: ScmAdapter, O: Operator, P: RemoteSizeProbe> ReleaseController<'_, S, O, P> {
    /// Publish an accepted candidate and remove the checkpoint
    pub(super) async fn tag_and_publish(
        &self,
        checkpoint: &mut ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
        artifacts: &Artifacts,
        previous: Option<&str>,
    ) -> Result<()> {
        // Settings and the feed are checked before anything irreversible happens
        let public_base = self.config.public_url_for(version)?;
        let feed_path = self.config.require_master_feed()?;
        if checkpoint.updated_master_feed.is_none() {
            MasterFeed::load_or_new(feed_path, &self.manifest.name)?.ensure_absent(feed_path, version)?;
        }

        if checkpoint.tagged.is_some() {
            self.output.info("Already tagged. Not re-tagging.");
        } else {
            self.tag_release(checkpoint, version).await?;
        }

        if checkpoint.updated_master_feed.is_some() {
            self.output.info("Already added to master feed. Not changing.");
        } else {
            self.update_master_feed(checkpoint, feed_path, version, artifacts, &public_base, previous)?;
        }

        self.upload_artifacts(checkpoint, paths, version, artifacts, &public_base)
            .await?;
        self.upload_feed(feed_path, version).await?;

        self.output.info("Push changes to public repository...");
        if self.config.public_repository.is_some() {
            self.scm.push_head_and_tag(version).await?;
        } else {
            self.output
                .note("No public repository set => you'll have to push the tag and branch yourself.");
        }

        self.store.remove()
    }

    async fn tag_release(&self, checkpoint: &mut ReleaseCheckpoint, version: &str) -> Result<()> {
        let (Some(head_before), Some(head_at_release)) = (
            checkpoint.head_before_release.clone(),
            checkpoint.head_at_release.clone(),
        ) else {
            return Err(StateError::Corrupted {
                reason: "cannot tag without headBeforeRelease and headAtRelease".to_string(),
            }
            .into());
        };

        self.scm.ensure_no_uncommitted_changes().await?;
        let head = self.scm.head_revision().await?;
        if head != head_before {
            return Err(ConsistencyError::ChangesCommittedSinceStart {
                expected: head_before,
                found: head,
            }
            .into());
        }

        self.scm.tag(version, &head_at_release).await?;
        self.scm.reset_hard(INTEGRATION_BRANCH).await?;
        self.scm.delete_branch(INTEGRATION_BRANCH).await?;

        checkpoint.mark_tagged();
        self.store.save(checkpoint)?;
        self.output.success(&format!("Tagged {}", crate::scm::tag_name(version)));
        Ok(())
    }

    fn update_master_feed(
        &self,
        checkpoint: &mut ReleaseCheckpoint,
        feed_path: &Path,
        version: &str,
        artifacts: &Artifacts,
        public_base: &str,
        previous: Option<&str>,
    ) -> Result<()> {
        let mut feed = MasterFeed::load_or_new(feed_path, &self.manifest.name)?;
        feed.ensure_absent(feed_path, version)?;

        if let Some(previous) = previous.filter(|p| feed.is_testing(p)) {
            let question = format!(
                "The previous release, version {}, is still marked as 'testing'. Set to stable?",
                previous
            );
            if self.operator.confirm(&question)? {
                feed.promote_to_stable(previous);
            }
        }

        let binaries: Vec<_> = artifacts.binaries.iter().map(|(d, _)| d.clone()).collect();
        let implementations = merge_descriptors(&artifacts.source, &binaries, public_base);
        feed.add_release(version, &artifacts.source.released, implementations);
        feed.save(feed_path)?;

        checkpoint.mark_updated_master_feed();
        self.store.save(checkpoint)?;
        self.output
            .success(&format!("Added {} to {}", version, feed_path.display()));
        Ok(())
    }

    async fn upload_artifacts(
        &self,
        checkpoint: &mut ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
        artifacts: &Artifacts,
        public_base: &str,
    ) -> Result<()> {
        let mut entries = Vec::with_capacity(1 + artifacts.binaries.len());
        let source_file = artifacts.source.archive.file.as_str();
        entries.push(UploadEntry::from_file(
            &artifacts.source_archive,
            archive_url(public_base, source_file),
        )?);
        for (descriptor, archive) in &artifacts.binaries {
            entries.push(UploadEntry::from_file(
                archive,
                archive_url(public_base, &descriptor.archive.file),
            )?);
        }
        upload::reconcile(checkpoint.verified_uploads.as_deref(), &mut entries);

        let action = match &self.config.upload_command {
            Some(command) => ConfiguredUpload::Command(CommandUpload::new(
                command.as_str(),
                &paths.release_dir,
                version,
            )),
            None => ConfiguredUpload::Manual(ManualUpload::new(self.operator, public_base)),
        };
        let verifier = UploadVerifier::new(&action, self.probe, &self.config.retry);
        let mut persist = |entries: &[UploadEntry]| -> Result<()> {
            checkpoint.verified_uploads = Some(upload::to_records(entries));
            self.store.save(checkpoint)
        };
        verifier.run(&mut entries, &mut persist).await?;
        self.output
            .success(&format!("All {} upload(s) verified", entries.len()));
        Ok(())
    }

    async fn upload_feed(&self, feed_path: &Path, version: &str) -> Result<()> {
        let feed_dir = feed_path.parent().unwrap_or(&self.config.releases_dir);
        match &self.config.feed_upload_command {
            Some(command) => {
                let feed_arg = feed_path.to_string_lossy().into_owned();
                process::check_shell(
                    command,
                    &[feed_arg.as_str()],
                    feed_dir,
                    &[(process::RELEASE_VERSION_ENV, version)],
                )
                .await
            }
            None => {
                self.output.note(&format!(
                    "No feed upload command set => you'll have to upload {} yourself!",
                    feed_path.display()
                ));
                Ok(())
            }
        }
    }
}
