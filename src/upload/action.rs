//! Ways of getting files onto the public server.

use crate::error::{CliError, Result};
use crate::operator::Operator;
use crate::process::{RELEASE_VERSION_ENV, check_shell};
use std::future::Future;
use std::path::{Path, PathBuf};

/// "Upload these files now."
///
/// Success of `upload` means nothing by itself; only the remote check
/// decides whether a file is verified.
pub trait UploadAction {
    /// Whether a human performs the upload
    fn is_manual(&self) -> bool;

    /// Upload one batch of files
    fn upload(&self, files: &[PathBuf]) -> impl Future<Output = Result<()>>;
}

/// Runs the configured upload command with the files as arguments
#[derive(Debug, Clone)]
pub struct CommandUpload {
    command: String,
    cwd: PathBuf,
    version: String,
}

impl CommandUpload {
    /// Upload command run in `cwd`, with `RELEASE_VERSION` set
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            version: version.into(),
        }
    }
}

fn relative_to<'p>(path: &'p Path, base: &Path) -> &'p Path {
    path.strip_prefix(base).unwrap_or(path)
}

impl UploadAction for CommandUpload {
    fn is_manual(&self) -> bool {
        false
    }

    async fn upload(&self, files: &[PathBuf]) -> Result<()> {
        let args: Vec<String> = files
            .iter()
            .map(|f| relative_to(f, &self.cwd).to_string_lossy().into_owned())
            .collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        check_shell(
            &self.command,
            &args,
            &self.cwd,
            &[(RELEASE_VERSION_ENV, self.version.as_str())],
        )
        .await
    }
}

/// Asks the operator to upload the files by hand
pub struct ManualUpload<'a, O: Operator> {
    operator: &'a O,
    destination: String,
}

impl<'a, O: Operator> ManualUpload<'a, O> {
    /// Manual upload to `destination` (shown in the prompt)
    pub fn new(operator: &'a O, destination: impl Into<String>) -> Self {
        Self {
            operator,
            destination: destination.into(),
        }
    }
}

impl<O: Operator> UploadAction for ManualUpload<'_, O> {
    fn is_manual(&self) -> bool {
        true
    }

    async fn upload(&self, files: &[PathBuf]) -> Result<()> {
        let list: Vec<String> = files.iter().map(|f| format!("  {}", f.display())).collect();
        let question = format!(
            "Upload these files to {} now:\n{}\nDone?",
            self.destination,
            list.join("\n")
        );
        if !self.operator.confirm(&question)? {
            return Err(CliError::Cancelled {
                reason: "manual upload".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Upload action chosen from configuration
pub enum ConfiguredUpload<'a, O: Operator> {
    /// `--upload-command` is set
    Command(CommandUpload),
    /// No command; the operator uploads
    Manual(ManualUpload<'a, O>),
}

impl<O: Operator> UploadAction for ConfiguredUpload<'_, O> {
    fn is_manual(&self) -> bool {
        match self {
            ConfiguredUpload::Command(c) => c.is_manual(),
            ConfiguredUpload::Manual(m) => m.is_manual(),
        }
    }

    async fn upload(&self, files: &[PathBuf]) -> Result<()> {
        match self {
            ConfiguredUpload::Command(c) => c.upload(files).await,
            ConfiguredUpload::Manual(m) => m.upload(files).await,
        }
    }
}
