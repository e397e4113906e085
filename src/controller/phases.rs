//! Phases up to the operator gate: preflight, release commit, archive,
//! development commit, candidate testing and artifact generation.

use super::{ReleaseController, ReleasePaths};
use crate::archive;
use crate::error::{PreconditionError, ReleaseError, Result, StateError};
use crate::manifest::{self, HookPhase, ReleaseManifest};
use crate::operator::Operator;
use crate::process::{self, TestOutcome};
use crate::publish::{
    ArchiveRef, ArtifactDescriptor, CommandBuilder, SOURCE_ARCH, binary_descriptors,
    export_changelog, source_descriptor_name,
};
use crate::scm::{INTEGRATION_BRANCH, ScmAdapter, ensure_no_tag};
use crate::state::ReleaseCheckpoint;
use crate::upload::RemoteSizeProbe;
use crate::version::{ReleaseVersion, apply_substitutions};
use std::path::{Path, PathBuf};

/// Branches that do not trigger the "releasing from a side branch" warning
const MAINLINE_BRANCHES: &[&str] = &["master", "main"];

/// What the tested candidate says about itself
#[derive(Debug, Clone)]
pub(super) struct Candidate {
    /// Main executable relative to the extraction directory
    pub main: Option<PathBuf>,
    /// Release date recorded in the archived manifest
    pub released: String,
}

/// Everything the publish phase uploads or merges
#[derive(Debug, Clone)]
pub(super) struct Artifacts {
    pub source: ArtifactDescriptor,
    pub source_archive: PathBuf,
    pub binaries: Vec<(ArtifactDescriptor, PathBuf)>,
}

impl<S: ScmAdapter, O: Operator, P: RemoteSizeProbe> ReleaseController<'_, S, O, P> {
    fn manifest_dir(&self) -> &Path {
        self.config
            .manifest_path
            .parent()
            .unwrap_or_else(|| self.scm.root_dir())
    }

    /// Checks that run on every invocation, before anything is modified
    pub(super) async fn preflight(&self, existing: Option<&ReleaseCheckpoint>) -> Result<()> {
        let head_before = existing.and_then(|c| c.head_before_release.as_deref());
        self.scm
            .ensure_no_uncommitted_changes()
            .await
            .map_err(|e| match (e, head_before) {
                (ReleaseError::Precondition(PreconditionError::DirtyWorkingTree { files }), Some(head)) => {
                    PreconditionError::DirtyReleaseTree {
                        files,
                        head_before_release: head.to_string(),
                    }
                    .into()
                }
                (e, _) => e,
            })?;
        self.scm.ensure_tracked(&self.config.manifest_path).await?;
        self.output.info("No uncommitted changes. Good.");

        let markers = self.scm.find_outstanding_markers().await?;
        if !markers.is_empty() {
            self.output.warn(&format!("{} outstanding TODO/XXX/FIXME marker(s):", markers.len()));
            for marker in &markers {
                self.output.indent(marker);
            }
        }

        let branch = self.scm.current_branch().await?;
        if !MAINLINE_BRANCHES.contains(&branch.as_str()) {
            self.output.warn(&format!(
                "You are currently on the '{}' branch. The release will be made from that branch.",
                branch
            ));
        }
        Ok(())
    }

    fn pick_version(&self) -> Result<String> {
        if let Some(version) = &self.config.release_version {
            return Ok(version.clone());
        }
        let current = &self.manifest.version;
        let suggested = ReleaseVersion::parse(current)
            .and_then(|v| v.suggest_release())
            .map(|v| v.to_string())
            .ok();
        self.operator.choose_version(current, suggested.as_deref())
    }

    /// Create the release commit on the integration branch.
    ///
    /// `existing` is the checkpoint of an interrupted attempt that never got
    /// past recording its starting revision.
    pub(super) async fn enter_release(
        &self,
        existing: Option<ReleaseCheckpoint>,
        head: &str,
    ) -> Result<ReleaseCheckpoint> {
        let version = self.pick_version()?;
        ReleaseVersion::parse(&version)?;
        ensure_no_tag(self.scm, &version).await?;

        let mut checkpoint = match existing {
            Some(checkpoint) => checkpoint,
            None => self.store.begin_release(head)?,
        };

        let manifest_dir = self.manifest_dir();
        apply_substitutions(manifest_dir, &self.manifest.release.update_version, &version)?;
        process::run_hooks(&self.manifest, HookPhase::CommitRelease, manifest_dir, &version).await?;

        self.output.info(&format!("Releasing version {}", version));
        let old_version = manifest::publish(&self.config.manifest_path, &version, Some(&manifest::today()))?;

        let release_dir = self.config.releases_dir.join(&version);
        archive::backup_if_exists(&release_dir)?;
        std::fs::create_dir_all(&release_dir)?;

        let revision = self
            .scm
            .create_commit(&format!("Release {}", version), INTEGRATION_BRANCH, "HEAD")
            .await?;

        checkpoint.set_old_snapshot_version(&old_version)?;
        checkpoint.set_release_version(&version)?;
        checkpoint.set_head_at_release(&revision)?;
        self.store.save(&checkpoint)?;
        Ok(checkpoint)
    }

    /// Export the release commit as the source archive, running
    /// `generate-archive` hooks and adding submodules when needed
    pub(super) async fn build_archive(
        &self,
        checkpoint: &mut ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
    ) -> Result<()> {
        let head_at_release = checkpoint
            .head_at_release
            .clone()
            .ok_or_else(|| StateError::Corrupted {
                reason: "headAtRelease missing while building the archive".to_string(),
            })?;

        archive::backup_if_exists(&paths.archive)?;
        self.scm
            .export_tree(&paths.export_prefix, &paths.archive, &head_at_release)
            .await?;

        let has_hooks = self.manifest.hooks(HookPhase::GenerateArchive).next().is_some();
        let has_submodules = self.scm.has_submodules().await?;
        if has_hooks || has_submodules {
            if let Err(e) = self.regenerate_archive(paths, version, has_submodules).await {
                self.rollback(Some(paths)).await;
                return Err(e);
            }
        }

        checkpoint.mark_created_archive();
        self.store.save(checkpoint)?;
        self.output.success(&format!("Created {}", paths.archive.display()));
        Ok(())
    }

    async fn regenerate_archive(&self, paths: &ReleasePaths, version: &str, has_submodules: bool) -> Result<()> {
        archive::remove_tree(&paths.extract_dir)?;
        archive::unpack_archive(&paths.archive, &paths.release_dir).await?;
        if has_submodules {
            self.scm
                .export_submodules(&paths.release_dir.join(&paths.export_prefix))
                .await?;
        }
        process::run_hooks(&self.manifest, HookPhase::GenerateArchive, &paths.extract_dir, version).await?;

        self.output
            .info("Regenerating archive (may have been modified by generate-archive hooks)...");
        archive::pack_tree(&paths.release_dir, &paths.archive_name, &paths.archive).await?;
        archive::remove_tree(&paths.extract_dir)
    }

    /// Commit the `-post` development version on top of the release commit,
    /// then put the working tree back on the original branch
    pub(super) async fn snapshot_bump(&self, checkpoint: &mut ReleaseCheckpoint, version: &str) -> Result<()> {
        let snapshot = ReleaseVersion::parse(version)?.post_release();
        manifest::publish(&self.config.manifest_path, &snapshot, Some(""))?;
        apply_substitutions(self.manifest_dir(), &self.manifest.release.update_version, &snapshot)?;

        let revision = self
            .scm
            .create_commit(
                &format!("Start development series {}", snapshot),
                INTEGRATION_BRANCH,
                INTEGRATION_BRANCH,
            )
            .await?;

        // Fixes made before the tag must land on the original branch
        let branch = self.scm.current_branch().await?;
        self.scm.reset_hard(&branch).await?;

        // Recorded only once the working tree is clean again
        checkpoint.set_new_snapshot_version_revision(&revision)?;
        self.store.save(checkpoint)?;
        Ok(())
    }

    /// Extract the archive and run the tests against the read-only tree
    pub(super) async fn test_candidate(
        &self,
        checkpoint: &mut ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
    ) -> Result<Candidate> {
        archive::remove_tree(&paths.extract_dir)?;
        archive::unpack_archive(&paths.archive, &paths.release_dir).await?;

        let extracted_manifest = paths.extracted_manifest();
        if !extracted_manifest.is_file() {
            return Err(PreconditionError::ManifestNotInArchive {
                path: extracted_manifest,
            }
            .into());
        }
        let extracted = ReleaseManifest::load(&extracted_manifest)?;
        let main = self.locate_main(&extracted, &extracted_manifest, paths)?;

        if checkpoint.src_tests_passed.is_some() {
            self.output.info("Unit-tests already passed - not running again");
        } else {
            archive::make_readonly_recursive(&paths.extract_dir)?;
            let outcome = process::run_unit_tests(
                self.config.test_command.as_deref(),
                &extracted_manifest,
                &paths.extract_dir,
                version,
            )
            .await;
            match outcome {
                Ok(TestOutcome::Passed) => self.output.success("Tests passed"),
                Ok(TestOutcome::NoTests) => self.output.warn("SKIPPED unit tests (none defined)"),
                Ok(TestOutcome::NotConfigured) => {
                    self.output.warn("No test command configured; unit tests not run")
                }
                Err(e) => {
                    self.output.println("(leaving extracted directory for examination)");
                    self.rollback(Some(paths)).await;
                    return Err(e);
                }
            }
            checkpoint.mark_src_tests_passed();
            self.store.save(checkpoint)?;
        }

        // Tests may have changed the tree despite the permissions
        archive::remove_tree(&paths.extract_dir)?;
        archive::unpack_archive(&paths.archive, &paths.release_dir).await?;

        Ok(Candidate {
            main,
            released: extracted.released,
        })
    }

    fn locate_main(
        &self,
        extracted: &ReleaseManifest,
        extracted_manifest: &Path,
        paths: &ReleasePaths,
    ) -> Result<Option<PathBuf>> {
        let Some(main) = &extracted.main else {
            return Ok(None);
        };
        let manifest_dir = extracted_manifest.parent().unwrap_or(&paths.extract_dir);
        let abs_main = manifest_dir.join(main);
        if !abs_main.exists() {
            return Err(PreconditionError::MainExecutableMissing { path: abs_main }.into());
        }
        let relative = abs_main
            .strip_prefix(&paths.extract_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| main.clone());
        if &relative != main {
            self.output.verbose(&format!(
                "Adjusting main: '{}' inside the archive, '{}' externally",
                main.display(),
                relative.display()
            ));
        }
        Ok(Some(relative))
    }

    /// Source descriptor, secondary builds and changelog
    pub(super) async fn publish_artifacts(
        &self,
        checkpoint: &ReleaseCheckpoint,
        paths: &ReleasePaths,
        version: &str,
        candidate: &Candidate,
        previous: Option<&str>,
    ) -> Result<Artifacts> {
        let archive_file = paths
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = ArtifactDescriptor {
            name: self.manifest.name.clone(),
            version: version.to_string(),
            released: candidate.released.clone(),
            arch: SOURCE_ARCH.to_string(),
            main: candidate.main.clone(),
            archive: ArchiveRef {
                file: archive_file,
                url: None,
                size: archive::file_size(&paths.archive)?,
                sha256: archive::sha256_file(&paths.archive)?,
                extract: Some(paths.archive_name.clone()),
            },
        };
        let descriptor_path = paths
            .release_dir
            .join(source_descriptor_name(&self.manifest.archive_base_name(), version));
        source.save(&descriptor_path)?;
        self.output
            .info(&format!("Wrote source descriptor as {}", descriptor_path.display()));

        if let Some(command) = &self.config.build_command {
            CommandBuilder::new(command.as_str())
                .build(&paths.release_dir, version, &descriptor_path)
                .await?;
        }
        let binaries = binary_descriptors(&paths.release_dir)?;
        for (descriptor, _) in &binaries {
            self.output
                .verbose(&format!("Binary for {}: {}", descriptor.arch, descriptor.archive.file));
        }

        let head_before_release = checkpoint.head_before_release.as_deref().unwrap_or("HEAD");
        match export_changelog(self.scm, &paths.release_dir, version, previous, head_before_release).await {
            Ok(path) => self.output.info(&format!(
                "Wrote changelog from {} to here as {}",
                previous.unwrap_or("start"),
                path.display()
            )),
            Err(e) => self.output.warn(&format!("Failed to generate changelog: {}", e)),
        }

        Ok(Artifacts {
            source,
            source_archive: paths.archive.clone(),
            binaries,
        })
    }
}
