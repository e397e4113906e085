//! The resumable release state machine.
//!
//! [`ReleaseController::run`] loads the checkpoint, derives the
//! [`ReleaseStage`] from it and the live head, then runs the remaining phases
//! in order, persisting the checkpoint after each one:
//!
//! 1. preflight (no persisted effect)
//! 2. enter release: release commit on the integration branch
//! 3. build archive
//! 4. snapshot bump: `-post` development commit (first run only)
//! 5. test candidate
//! 6. publish artifacts: descriptors, secondary builds, changelog
//! 7. operator gate
//! 8. tag and publish, or fail the candidate
//!
//! A phase whose checkpoint field is set never runs again.

mod gate;
mod phases;
mod publish;
mod rollback;
mod stage;

pub use stage::ReleaseStage;

use gate::GateDecision;

use crate::cli::OutputManager;
use crate::config::ReleaseConfig;
use crate::error::{CliError, ManifestError, PreconditionError, Result, StateError};
use crate::manifest::ReleaseManifest;
use crate::operator::Operator;
use crate::scm::ScmAdapter;
use crate::state::{self, ReleaseCheckpoint, StateManager};
use crate::upload::RemoteSizeProbe;
use crate::version::previous_release;
use std::path::{Path, PathBuf};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Tagged, published, uploads verified, checkpoint removed
    Published {
        /// Released version
        version: String,
    },
    /// Operator rejected the candidate; checkpoint removed
    CandidateFailed {
        /// Rejected version
        version: String,
    },
}

/// File system layout of one release
#[derive(Debug, Clone)]
pub struct ReleasePaths {
    /// Directory holding every release and the checkpoint
    pub releases_dir: PathBuf,
    /// `<releases_dir>/<version>`
    pub release_dir: PathBuf,
    /// `<archive base>-<version>`, also the top-level directory inside the archive
    pub archive_name: String,
    /// The source archive
    pub archive: PathBuf,
    /// Prefix of every path in the archive
    pub export_prefix: String,
    /// Where the archive is extracted for inspection
    pub extract_dir: PathBuf,
    /// Manifest path relative to the repository root
    pub manifest_in_tree: PathBuf,
}

impl ReleasePaths {
    /// Layout for `version`
    pub fn new(
        config: &ReleaseConfig,
        manifest: &ReleaseManifest,
        scm_root: &Path,
        version: &str,
    ) -> Result<Self> {
        let base = manifest.archive_base_name();
        let archive_name = format!("{}-{}", base, version);
        let release_dir = config.releases_dir.join(version);
        let export_prefix = if manifest.release.add_toplevel_directory {
            format!("{}/{}", archive_name, base)
        } else {
            archive_name.clone()
        };

        let manifest_real = std::fs::canonicalize(&config.manifest_path)?;
        let root_real = std::fs::canonicalize(scm_root)?;
        let manifest_in_tree = manifest_real
            .strip_prefix(&root_real)
            .map_err(|_| ManifestError::Invalid {
                path: config.manifest_path.clone(),
                reason: format!("not inside the repository at {}", scm_root.display()),
            })?
            .to_path_buf();

        Ok(Self {
            releases_dir: config.releases_dir.clone(),
            archive: release_dir.join(crate::archive::archive_file_name(&base, version)),
            extract_dir: release_dir.join(&archive_name),
            release_dir,
            archive_name,
            export_prefix,
            manifest_in_tree,
        })
    }

    /// Manifest inside the extracted archive
    pub fn extracted_manifest(&self) -> PathBuf {
        self.release_dir
            .join(&self.export_prefix)
            .join(&self.manifest_in_tree)
    }
}

/// Drives one release from whatever state the checkpoint records
pub struct ReleaseController<'a, S: ScmAdapter, O: Operator, P: RemoteSizeProbe> {
    scm: &'a S,
    operator: &'a O,
    probe: &'a P,
    config: &'a ReleaseConfig,
    output: &'a OutputManager,
    manifest: ReleaseManifest,
    store: StateManager,
}

impl<'a, S: ScmAdapter, O: Operator, P: RemoteSizeProbe> ReleaseController<'a, S, O, P> {
    /// Create a controller; loads the release manifest
    pub fn new(
        scm: &'a S,
        operator: &'a O,
        probe: &'a P,
        config: &'a ReleaseConfig,
        output: &'a OutputManager,
    ) -> Result<Self> {
        let manifest = ReleaseManifest::load(&config.manifest_path)?;
        std::fs::create_dir_all(&config.releases_dir)?;
        Ok(Self {
            scm,
            operator,
            probe,
            config,
            output,
            manifest,
            store: state::create_state_manager(&config.releases_dir),
        })
    }

    /// Checkpoint store used by this controller
    pub fn store(&self) -> &StateManager {
        &self.store
    }

    /// Run (or resume) the release until it is published, failed, or an
    /// error stops it.
    pub async fn run(&self) -> Result<ReleaseOutcome> {
        let existing = self.store.load_if_exists()?;
        let head = self.scm.head_revision().await?;
        let stage = ReleaseStage::derive(existing.as_ref(), &head, self.store.path())?;
        self.check_requested_version(existing.as_ref())?;
        log::info!("Release stage: {}", stage);

        match (&stage, existing.as_ref().and_then(|c| c.release_version.as_deref())) {
            (ReleaseStage::Fresh, _) => {
                self.output.section(&format!("Releasing {}", self.manifest.name));
            }
            (ReleaseStage::Restart, _) => self.output.info(&format!(
                "Restarting release of {} (HEAD revision has not changed)",
                self.manifest.name
            )),
            (_, Some(version)) => {
                self.output.section(&format!("Resuming release of {} {}", self.manifest.name, version));
            }
            (_, None) => {}
        }

        self.preflight(existing.as_ref()).await?;

        let mut checkpoint = match existing {
            Some(checkpoint) if !stage.is_first_run() => checkpoint,
            existing => self.enter_release(existing, &head).await?,
        };
        let version = checkpoint
            .release_version
            .clone()
            .ok_or_else(|| StateError::Corrupted {
                reason: "release version missing after entering release".to_string(),
            })?;
        let paths = ReleasePaths::new(self.config, &self.manifest, self.scm.root_dir(), &version)?;

        if !stage.is_first_run() && !paths.release_dir.is_dir() {
            return Err(PreconditionError::ReleaseDirectoryMissing {
                path: paths.release_dir.clone(),
                state_file: self.store.path().to_path_buf(),
            }
            .into());
        }

        if checkpoint.created_archive.is_none() {
            self.build_archive(&mut checkpoint, &paths, &version).await?;
        } else if !paths.archive.is_file() {
            return Err(PreconditionError::ArchiveMissing {
                path: paths.archive.clone(),
                state_file: self.store.path().to_path_buf(),
            }
            .into());
        } else {
            self.output.info("Archive already created");
        }

        if stage.is_first_run() {
            self.snapshot_bump(&mut checkpoint, &version).await?;
        }

        let candidate = self.test_candidate(&mut checkpoint, &paths, &version).await?;

        let tags = self.scm.tagged_versions().await?;
        let previous = previous_release(&version, &tags)?;
        let artifacts = self
            .publish_artifacts(&checkpoint, &paths, &version, &candidate, previous.as_deref())
            .await?;

        let choice = self
            .operator_gate(&checkpoint, &paths, &version, previous.as_deref())
            .await?;

        log::info!("Deleting extracted archive {}", paths.extract_dir.display());
        crate::archive::remove_tree(&paths.extract_dir)?;

        match choice {
            GateDecision::Publish => {
                self.tag_and_publish(&mut checkpoint, &paths, &version, &artifacts, previous.as_deref())
                    .await?;
                self.output.success(&format!("Released {} {}", self.manifest.name, version));
                Ok(ReleaseOutcome::Published { version })
            }
            GateDecision::Fail => {
                self.fail_candidate(&paths).await?;
                Ok(ReleaseOutcome::CandidateFailed { version })
            }
        }
    }

    fn check_requested_version(&self, existing: Option<&ReleaseCheckpoint>) -> Result<()> {
        let in_progress = existing.and_then(|c| c.release_version.as_deref());
        match (self.config.release_version.as_deref(), in_progress) {
            (Some(requested), Some(in_progress)) if requested != in_progress => {
                Err(PreconditionError::VersionConflict {
                    requested: requested.to_string(),
                    in_progress: in_progress.to_string(),
                    state_file: self.store.path().to_path_buf(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Abandon an unfinished release: restore the working tree, back up the
    /// release directory, delete the integration branch and the checkpoint.
    pub async fn abandon(&self) -> Result<()> {
        let checkpoint = self.store.load()?;
        if checkpoint.tagged.is_some() {
            return Err(CliError::ExecutionFailed {
                command: "rollback".to_string(),
                reason: "the release is already tagged; run `release` to finish publishing".to_string(),
            }
            .into());
        }
        match checkpoint.release_version.as_deref() {
            Some(version) => {
                let paths = ReleasePaths::new(self.config, &self.manifest, self.scm.root_dir(), version)?;
                self.rollback(Some(&paths)).await;
            }
            None => self.rollback(None).await,
        }
        if self.store.exists() {
            return Err(StateError::SaveFailed {
                reason: format!("could not remove {}", self.store.path().display()),
            }
            .into());
        }
        Ok(())
    }
}
