//! Source archive handling.
//!
//! Unpacks and re-packs `.tar.gz` snapshot trees, marks extracted trees
//! read-only for testing, and keeps one `~` backup of anything a release is
//! about to overwrite.

use crate::error::{Result, ToolError};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of the source archive for a release
pub fn archive_file_name(base_name: &str, version: &str) -> String {
    format!("{}-{}.tar.gz", base_name, version)
}

/// Rename `path` to `path~`, replacing any older backup.
///
/// Returns the backup path when something was moved.
pub fn backup_if_exists(path: &Path) -> Result<Option<PathBuf>> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(None);
    }
    let mut backup = path.as_os_str().to_owned();
    backup.push("~");
    let backup = PathBuf::from(backup);

    if let Ok(meta) = fs::symlink_metadata(&backup) {
        if meta.is_dir() {
            remove_tree(&backup)?;
        } else {
            fs::remove_file(&backup)?;
        }
    }
    fs::rename(path, &backup)?;
    log::info!("Old {} backed up as {}", path.display(), backup.display());
    Ok(Some(backup))
}

fn archive_error(path: &Path, e: impl std::fmt::Display) -> ToolError {
    ToolError::Archive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Extract a `.tar.gz` archive into `dest` (created if missing)
pub async fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        fs::create_dir_all(&dest)?;
        let file = fs::File::open(&archive).map_err(|e| archive_error(&archive, e))?;
        tar::Archive::new(GzDecoder::new(file))
            .unpack(&dest)
            .map_err(|e| archive_error(&archive, e))?;
        Ok(())
    })
    .await
    .map_err(|e| ToolError::CommandFailed {
        command: "unpack archive".to_string(),
        reason: format!("Join error: {}", e),
    })?
}

/// Pack `src_root/prefix` into a `.tar.gz` whose entries all start with `prefix/`
pub async fn pack_tree(src_root: &Path, prefix: &str, dest: &Path) -> Result<()> {
    let src_dir = src_root.join(prefix);
    let prefix = prefix.to_string();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = fs::File::create(&dest).map_err(|e| archive_error(&dest, e))?;
        let enc = GzEncoder::new(file, Compression::default());
        let mut tar = tar::Builder::new(enc);
        tar.follow_symlinks(false);
        tar.append_dir_all(&prefix, &src_dir)
            .map_err(|e| archive_error(&src_dir, e))?;

        let enc = tar.into_inner().map_err(|e| archive_error(&dest, e))?;
        let mut finished = enc.finish().map_err(|e| archive_error(&dest, e))?;
        finished.flush()?;
        Ok(())
    })
    .await
    .map_err(|e| ToolError::CommandFailed {
        command: "pack archive".to_string(),
        reason: format!("Join error: {}", e),
    })?
}

/// Remove write permission from everything under `path` (symlinks untouched)
pub fn make_readonly_recursive(path: &Path) -> Result<()> {
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|e| archive_error(path, e))?;
        if entry.path_is_symlink() {
            continue;
        }
        let mut perms = entry.metadata().map_err(|e| archive_error(path, e))?.permissions();
        set_writable(&mut perms, false);
        fs::set_permissions(entry.path(), perms)?;
    }
    Ok(())
}

/// Delete a tree that may have been made read-only
pub fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| archive_error(path, e))?;
        if entry.file_type().is_dir() {
            let mut perms = entry.metadata().map_err(|e| archive_error(path, e))?.permissions();
            set_writable(&mut perms, true);
            fs::set_permissions(entry.path(), perms)?;
        }
    }
    fs::remove_dir_all(path)?;
    Ok(())
}

#[cfg(unix)]
fn set_writable(perms: &mut fs::Permissions, writable: bool) {
    use std::os::unix::fs::PermissionsExt;
    let mode = perms.mode();
    let mode = if writable { mode | 0o200 } else { mode & 0o555 };
    perms.set_mode(mode);
}

#[cfg(not(unix))]
fn set_writable(perms: &mut fs::Permissions, writable: bool) {
    perms.set_readonly(!writable);
}

/// Size in bytes of a local file
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Hex SHA-256 digest of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
