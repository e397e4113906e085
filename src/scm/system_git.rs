//! System git backend.
//!
//! Every operation shells out to `git -C <work tree>`. Commits are built with
//! plumbing (`write-tree`, `commit-tree`, `branch -f`) so that the release
//! commits never move `HEAD`.

use super::{ScmAdapter, TAG_PREFIX, tag_name};
use crate::error::{PreconditionError, Result, ScmError, ToolError};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Git backend using the `git` executable
#[derive(Debug, Clone)]
pub struct SystemGit {
    /// Working tree root
    work_tree: PathBuf,
    /// Repository to push releases to
    public_repository: Option<String>,
}

impl SystemGit {
    /// Open the repository containing `path`
    pub async fn open(path: &Path, public_repository: Option<String>) -> Result<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await
            .map_err(|e| ToolError::CommandFailed {
                command: "git rev-parse --show-toplevel".to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ScmError::NotRepository {
                path: path.to_path_buf(),
            }
            .into());
        }

        let work_tree = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        log::debug!("Opened git repository at {}", work_tree.display());
        Ok(Self {
            work_tree,
            public_repository,
        })
    }

    /// Create a git command scoped to the work tree.
    ///
    /// Repository-selecting variables from the caller's environment are
    /// removed so that hooks invoking us cannot redirect the commands.
    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.work_tree);
        cmd.env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE");
        cmd.arg("-c").arg("core.quotePath=false");
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.stdin(Stdio::null());
        cmd
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        self.git_cmd()
            .args(args)
            .output()
            .await
            .map_err(|e| {
                ToolError::CommandFailed {
                    command: format!("git {}", args.join(" ")),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Run git and return stdout, failing on a non-zero exit
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        check(args, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_with_stdin(&self, args: &[&str], input: &str) -> Result<String> {
        let failed = |e: std::io::Error| ToolError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            reason: e.to_string(),
        };
        let mut child = self
            .git_cmd()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(failed)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await.map_err(failed)?;
        }
        let output = child.wait_with_output().await.map_err(failed)?;
        check(args, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", branch);
        let output = self
            .output(&["rev-parse", "--verify", "--quiet", &reference])
            .await?;
        Ok(output.status.success())
    }
}

fn check(args: &[&str], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(ScmError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
    .into())
}

/// Parse `git submodule status` lines into `(revision, path)` pairs
fn parse_submodule_status(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter(|line| line.len() > 1)
        .filter_map(|line| {
            // First column is a status flag (' ', '-', '+', 'U')
            let mut fields = line[1..].split_whitespace();
            let rev = fields.next()?.to_string();
            let path = fields.next()?.to_string();
            Some((rev, path))
        })
        .collect()
}

impl ScmAdapter for SystemGit {
    fn root_dir(&self) -> &Path {
        &self.work_tree
    }

    async fn head_revision(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    async fn current_branch(&self) -> Result<String> {
        let branch = self.run(&["symbolic-ref", "--short", "HEAD"]).await?;
        Ok(branch.trim().to_string())
    }

    async fn ensure_no_uncommitted_changes(&self) -> Result<()> {
        let status = self.run(&["status", "--porcelain", "-uno"]).await?;
        if !status.trim().is_empty() {
            return Err(PreconditionError::DirtyWorkingTree {
                files: status.trim_end().to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_tracked(&self, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        let output = self
            .output(&["ls-files", "--error-unmatch", "--", &path_str])
            .await?;
        if !output.status.success() {
            return Err(PreconditionError::Untracked {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(())
    }

    async fn find_outstanding_markers(&self) -> Result<Vec<String>> {
        let args = ["grep", "-I", "-n", "-E", r"\b(TODO|XXX|FIXME)\b"];
        let output = self.output(&args).await?;
        // git grep exits 1 when nothing matches
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect()),
            Some(1) => Ok(Vec::new()),
            _ => {
                check(&args, &output)?;
                Ok(Vec::new())
            }
        }
    }

    async fn create_commit(&self, message: &str, branch: &str, parent: &str) -> Result<String> {
        self.run(&["add", "-u"]).await?;
        let tree = self.run(&["write-tree"]).await?;
        let tree = tree.trim();
        let child = self
            .run_with_stdin(&["commit-tree", tree, "-p", parent], message)
            .await?;
        let child = child.trim().to_string();
        self.run(&["branch", "-f", branch, &child]).await?;
        log::debug!("Committed {} on {} (parent {})", child, branch, parent);
        Ok(child)
    }

    async fn tag(&self, version: &str, revision: &str) -> Result<()> {
        let tag = tag_name(version);
        let message = format!("Release {}", version);
        self.run(&["tag", "-a", "-m", &message, &tag, revision]).await?;
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        if !self.branch_exists(branch).await? {
            log::debug!("Branch {} does not exist; nothing to delete", branch);
            return Ok(());
        }
        self.run(&["branch", "-D", branch]).await?;
        Ok(())
    }

    async fn reset_hard(&self, revision: &str) -> Result<()> {
        self.run(&["reset", "--hard", revision]).await?;
        Ok(())
    }

    async fn export_tree(&self, prefix: &str, archive: &Path, revision: &str) -> Result<()> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let archive_str = archive.to_string_lossy();
        self.run(&[
            "archive",
            "--format=tar.gz",
            "--prefix",
            &prefix,
            "-o",
            &archive_str,
            revision,
        ])
        .await?;
        Ok(())
    }

    async fn tagged_versions(&self) -> Result<Vec<String>> {
        let pattern = format!("{}*", TAG_PREFIX);
        let tags = self.run(&["tag", "-l", &pattern]).await?;
        Ok(tags
            .lines()
            .filter_map(|t| t.trim().strip_prefix(TAG_PREFIX))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn diff_log(&self, from: Option<&str>, to: &str) -> Result<String> {
        let range = match from {
            Some(from) => format!("{}..{}", from, to),
            None => to.to_string(),
        };
        self.run(&["log", "--stat", &range]).await
    }

    async fn has_submodules(&self) -> Result<bool> {
        if !self.work_tree.join(".gitmodules").exists() {
            return Ok(false);
        }
        let status = self.run(&["submodule", "status", "--recursive"]).await?;
        Ok(!parse_submodule_status(&status).is_empty())
    }

    async fn export_submodules(&self, dest: &Path) -> Result<()> {
        let status = self.run(&["submodule", "status", "--recursive"]).await?;
        for (rev, rel_path) in parse_submodule_status(&status) {
            let sub = SystemGit {
                work_tree: self.work_tree.join(&rel_path),
                public_repository: None,
            };
            let prefix = format!("{}/", rel_path);
            let output = sub
                .output(&["archive", "--format=tar", "--prefix", &prefix, &rev])
                .await?;
            check(&["archive", &rev], &output)?;
            tar::Archive::new(output.stdout.as_slice())
                .unpack(dest)
                .map_err(|e| ToolError::Archive {
                    path: dest.to_path_buf(),
                    reason: format!("unpacking submodule {}: {}", rel_path, e),
                })?;
            log::info!("Exported submodule {} at {}", rel_path, rev);
        }
        Ok(())
    }

    async fn push_head_and_tag(&self, version: &str) -> Result<()> {
        let repository = self
            .public_repository
            .as_deref()
            .ok_or(ScmError::NoPublicRepository)?;
        let branch = self.current_branch().await?;
        let tag = tag_name(version);
        self.run(&["push", repository, &branch, "tag", &tag]).await?;
        Ok(())
    }
}
