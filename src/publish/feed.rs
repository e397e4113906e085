//! The master feed: an aggregate JSON list of every release.

use super::ArtifactDescriptor;
use crate::error::{PreconditionError, Result, StateError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Stability rating of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Newly published
    Testing,
    /// Promoted by the operator
    Stable,
}

/// One release in the master feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRelease {
    /// Version
    pub version: String,
    /// Release date
    pub released: String,
    /// Stability rating
    pub stability: Stability,
    /// Source and binary artifacts
    pub implementations: Vec<ArtifactDescriptor>,
}

/// Aggregate feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterFeed {
    /// Artifact name
    pub name: String,
    /// Releases in publication order
    #[serde(default)]
    pub releases: Vec<FeedRelease>,
}

impl MasterFeed {
    /// Load the feed, or start an empty one when the file does not exist
    pub fn load_or_new(path: &Path, name: &str) -> Result<Self> {
        if !path.exists() {
            log::info!("Creating new master feed {}", path.display());
            return Ok(Self {
                name: name.to_string(),
                releases: Vec::new(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Whether the feed already lists `version`
    pub fn contains_version(&self, version: &str) -> bool {
        self.releases.iter().any(|r| r.version == version)
    }

    /// Fail if the feed already lists `version`
    pub fn ensure_absent(&self, path: &Path, version: &str) -> Result<()> {
        if self.contains_version(version) {
            return Err(PreconditionError::AlreadyInMasterFeed {
                feed: path.to_path_buf(),
                version: version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Whether `version` is listed and still rated testing
    pub fn is_testing(&self, version: &str) -> bool {
        self.releases
            .iter()
            .any(|r| r.version == version && r.stability == Stability::Testing)
    }

    /// Rate `version` stable; returns whether anything changed
    pub fn promote_to_stable(&mut self, version: &str) -> bool {
        let mut changed = false;
        for release in self.releases.iter_mut().filter(|r| r.version == version) {
            if release.stability != Stability::Stable {
                release.stability = Stability::Stable;
                changed = true;
            }
        }
        changed
    }

    /// Append a new testing release
    pub fn add_release(&mut self, version: &str, released: &str, implementations: Vec<ArtifactDescriptor>) {
        self.releases.push(FeedRelease {
            version: version.to_string(),
            released: released.to_string(),
            stability: Stability::Testing,
            implementations,
        });
    }

    /// Write the feed atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.new");
        {
            let mut file = std::fs::File::create(&temp_path).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create {}: {}", temp_path.display(), e),
            })?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed_add_promote_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");

        let mut feed = MasterFeed::load_or_new(&path, "demo").unwrap();
        feed.add_release("1.0", "2024-01-01", Vec::new());
        feed.add_release("1.1", "2024-02-01", Vec::new());
        assert!(feed.is_testing("1.0"));
        assert!(feed.ensure_absent(&path, "1.1").is_err());

        assert!(feed.promote_to_stable("1.0"));
        assert!(!feed.promote_to_stable("1.0"));
        feed.save(&path).unwrap();

        let reloaded = MasterFeed::load_or_new(&path, "ignored").unwrap();
        assert_eq!(reloaded, feed);
        assert_eq!(reloaded.releases[0].stability, Stability::Stable);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"testing\""));
    }
}
