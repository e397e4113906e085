//! Rewrites version strings embedded in tracked source files.

use crate::error::{Result, VersionError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A `(path, pattern)` rule; the single capture group is replaced by the version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSubstitution {
    /// File relative to the implementation directory
    pub path: PathBuf,
    /// Regular expression with exactly one capture group (multi-line mode)
    pub pattern: String,
}

impl VersionSubstitution {
    fn compile(&self) -> Result<Regex> {
        let re = Regex::new(&format!("(?m){}", self.pattern)).map_err(|_| {
            VersionError::BadPattern {
                pattern: self.pattern.clone(),
            }
        })?;
        // captures_len counts the implicit whole-match group
        if re.captures_len() != 2 {
            return Err(VersionError::BadPattern {
                pattern: self.pattern.clone(),
            }
            .into());
        }
        Ok(re)
    }

    /// Replace the first match's group in `data` with `version`
    fn rewrite(&self, data: &str, version: &str, path: &Path) -> Result<String> {
        let re = self.compile()?;
        let group = re
            .captures(data)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| VersionError::NoMatch {
                pattern: self.pattern.clone(),
                path: path.to_path_buf(),
            })?;

        let mut out = String::with_capacity(data.len() + version.len());
        out.push_str(&data[..group.start()]);
        out.push_str(version);
        out.push_str(&data[group.end()..]);
        Ok(out)
    }
}

/// Apply every substitution under `impl_dir`.
///
/// All rules are validated and rendered before any file is written, so a bad
/// rule leaves the tree untouched.
pub fn apply_substitutions(
    impl_dir: &Path,
    substitutions: &[VersionSubstitution],
    version: &str,
) -> Result<()> {
    let mut rewritten: Vec<(PathBuf, String)> = Vec::with_capacity(substitutions.len());
    for sub in substitutions {
        if sub.path.is_absolute() {
            return Err(VersionError::AbsolutePath {
                path: sub.path.clone(),
            }
            .into());
        }
        let path = impl_dir.join(&sub.path);
        // Earlier rules may already target the same file
        let data = match rewritten.iter().rev().find(|(p, _)| *p == path) {
            Some((_, data)) => data.clone(),
            None => std::fs::read_to_string(&path)?,
        };
        let new_data = sub.rewrite(&data, version, &path)?;
        rewritten.push((path, new_data));
    }

    for (path, data) in rewritten {
        log::debug!("Setting version {} in {}", version, path.display());
        std::fs::write(&path, data)?;
    }
    Ok(())
}
