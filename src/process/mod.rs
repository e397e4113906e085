//! External command execution: lifecycle hooks, test runner, shell actions.
//!
//! Commands are operator-supplied shell snippets. Extra arguments are passed
//! positionally (`sh -c '<cmd> "$@"' - args...`) so file names never need
//! quoting.

use crate::error::{Result, ToolError};
use crate::manifest::{HookPhase, ReleaseManifest};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Environment variable carrying the version to hooks and commands
pub const RELEASE_VERSION_ENV: &str = "RELEASE_VERSION";

/// Exit code a test runner uses to say there is nothing to test
pub const NO_TESTS_EXIT_CODE: i32 = 2;

/// Result of running the candidate's tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Tests ran and passed
    Passed,
    /// The runner reported that no tests exist
    NoTests,
    /// No test command is configured
    NotConfigured,
}

/// Run `cmd` through the shell with `args` appended, inheriting stdio
pub async fn run_shell(
    cmd: &str,
    args: &[&str],
    cwd: &Path,
    env: &[(&str, &str)],
) -> Result<ExitStatus> {
    log::info!("Running: {} {}", cmd, args.join(" "));
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(format!("{} \"$@\"", cmd))
        .arg("-")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::inherit());
    for (key, value) in env {
        command.env(key, value);
    }

    command.status().await.map_err(|e| {
        ToolError::CommandFailed {
            command: cmd.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Like [`run_shell`], failing unless the command exits successfully
pub async fn check_shell(
    cmd: &str,
    args: &[&str],
    cwd: &Path,
    env: &[(&str, &str)],
) -> Result<()> {
    let status = run_shell(cmd, args, cwd, env).await?;
    if !status.success() {
        return Err(ToolError::CommandFailed {
            command: cmd.to_string(),
            reason: format!("exit status {}", describe_status(&status)),
        }
        .into());
    }
    Ok(())
}

fn describe_status(status: &ExitStatus) -> String {
    status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "(signal)".to_string())
}

/// Run every hook registered for `phase`, in order, inside `cwd`
pub async fn run_hooks(
    manifest: &ReleaseManifest,
    phase: HookPhase,
    cwd: &Path,
    version: &str,
) -> Result<()> {
    let hooks: Vec<&str> = manifest.hooks(phase).collect();
    if hooks.is_empty() {
        return Ok(());
    }
    log::info!("Running hooks for phase '{}'", phase);
    for hook in hooks {
        let status = run_shell(hook, &[], cwd, &[(RELEASE_VERSION_ENV, version)]).await?;
        if !status.success() {
            return Err(ToolError::HookFailed {
                phase: phase.to_string(),
                command: hook.to_string(),
                code: status.code(),
            }
            .into());
        }
    }
    Ok(())
}

/// Run the test command against the extracted manifest.
///
/// Exit status 0 is [`TestOutcome::Passed`], [`NO_TESTS_EXIT_CODE`] is
/// [`TestOutcome::NoTests`], anything else is a [`ToolError::TestsFailed`].
pub async fn run_unit_tests(
    test_command: Option<&str>,
    manifest_path: &Path,
    cwd: &Path,
    version: &str,
) -> Result<TestOutcome> {
    let Some(test_command) = test_command else {
        return Ok(TestOutcome::NotConfigured);
    };
    let manifest_arg = manifest_path.to_string_lossy().into_owned();
    let status = run_shell(
        test_command,
        &[manifest_arg.as_str()],
        cwd,
        &[(RELEASE_VERSION_ENV, version)],
    )
    .await?;

    match status.code() {
        Some(0) => Ok(TestOutcome::Passed),
        Some(NO_TESTS_EXIT_CODE) => Ok(TestOutcome::NoTests),
        code => Err(ToolError::TestsFailed { code }.into()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    fn manifest(actions: &str) -> ReleaseManifest {
        toml::from_str(&format!("name = \"demo\"\nversion = \"1.0-pre\"\n{}", actions)).unwrap()
    }

    #[tokio::test]
    async fn test_args_are_passed_positionally() {
        let dir = tempfile::tempdir().unwrap();
        check_shell("touch", &["a file", "b"], dir.path(), &[]).await.unwrap();
        assert!(dir.path().join("a file").exists());
        assert!(dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_hooks_see_release_version() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest(
            "[[release.action]]\nphase = \"commit-release\"\ncommand = 'echo $RELEASE_VERSION > v.txt'\n",
        );
        run_hooks(&m, HookPhase::CommitRelease, dir.path(), "1.0").await.unwrap();
        run_hooks(&m, HookPhase::GenerateArchive, dir.path(), "9.9").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("v.txt")).unwrap(), "1.0\n");
    }

    #[tokio::test]
    async fn test_failing_hook_stops() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest(
            "[[release.action]]\nphase = \"generate-archive\"\ncommand = \"exit 3\"\n\n[[release.action]]\nphase = \"generate-archive\"\ncommand = \"touch ran\"\n",
        );
        let err = run_hooks(&m, HookPhase::GenerateArchive, dir.path(), "1.0")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Tool(ToolError::HookFailed { code: Some(3), .. })
        ));
        assert!(!dir.path().join("ran").exists());
    }

    #[tokio::test]
    async fn test_exit_two_means_no_tests() {
        let dir = tempfile::tempdir().unwrap();
        let m = dir.path().join("release.toml");
        let outcome = run_unit_tests(Some("exit 2 #"), &m, dir.path(), "1.0").await.unwrap();
        assert_eq!(outcome, TestOutcome::NoTests);

        let outcome = run_unit_tests(Some("test -n"), &m, dir.path(), "1.0").await.unwrap();
        assert_eq!(outcome, TestOutcome::Passed);

        let err = run_unit_tests(Some("false"), &m, dir.path(), "1.0").await.unwrap_err();
        assert!(matches!(err, ReleaseError::Tool(ToolError::TestsFailed { code: Some(1) })));

        let outcome = run_unit_tests(None, &m, dir.path(), "1.0").await.unwrap();
        assert_eq!(outcome, TestOutcome::NotConfigured);
    }
}
