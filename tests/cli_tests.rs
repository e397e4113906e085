//! Binary-level tests of the command line.

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("resumable_release").unwrap();
    for var in [
        "RELEASE_DIR",
        "RELEASE_MANIFEST",
        "RELEASE_VERSION",
        "RELEASE_UPLOAD_COMMAND",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("--releases-dir"));
}

#[test]
fn test_status_without_release() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("status")
        .arg("--releases-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No release in progress"));
}

#[test]
fn test_status_json_without_release() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["status", "--json"])
        .env("RELEASE_DIR", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no_active_release"));
}

#[test]
fn test_status_shows_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("release-status.json"),
        r#"{"formatVersion": 1, "headBeforeRelease": "abc123", "releaseVersion": "1.0"}"#,
    )
    .unwrap();

    cli()
        .arg("status")
        .arg("--releases-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Release 1.0"))
        .stdout(predicate::str::contains("abc123"));
}

#[test]
fn test_corrupted_status_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("release-status.json"), "{not json").unwrap();

    cli()
        .arg("status")
        .arg("--releases-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("status"));
}

#[test]
fn test_rollback_without_release() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["rollback", "--yes"])
        .arg("--releases-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No release in progress"));
}

#[test]
fn test_release_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("release.toml"), "name = \"Demo\"\nversion = \"1.0-pre\"\n").unwrap();

    cli()
        .current_dir(dir.path())
        .assert()
        .failure();
}
