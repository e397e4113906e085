//! Release descriptors: the JSON record of one published artifact.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Architecture tag of a source release
pub const SOURCE_ARCH: &str = "*-src";

/// Archive referenced by a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    /// Archive file name, relative to the descriptor's directory
    pub file: String,
    /// Public download URL, filled in when merging into the master feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 digest
    pub sha256: String,
    /// Top-level directory to extract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,
}

/// One release artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Artifact name
    pub name: String,
    /// Released version
    pub version: String,
    /// Release date
    pub released: String,
    /// Target architecture (`*-src` for sources)
    pub arch: String,
    /// Main executable inside the extracted tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<PathBuf>,
    /// The archive itself
    pub archive: ArchiveRef,
}

impl ArtifactDescriptor {
    /// Read a descriptor file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a descriptor file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Copy of this descriptor with the public URL filled in
    pub fn with_url(&self, public_base: &str) -> Self {
        let mut published = self.clone();
        published.archive.url = Some(archive_url(public_base, &self.archive.file));
        published
    }
}

/// Public URL of an archive; `public_base` ends with `/`
pub fn archive_url(public_base: &str, file: &str) -> String {
    let name = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    format!("{}{}", public_base, name)
}

/// Descriptor file name of the source release
pub fn source_descriptor_name(archive_base: &str, version: &str) -> String {
    format!("{}-{}-src.json", archive_base, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_url_uses_file_name() {
        let d = ArtifactDescriptor {
            name: "demo".to_string(),
            version: "1.0".to_string(),
            released: "2024-05-01".to_string(),
            arch: SOURCE_ARCH.to_string(),
            main: None,
            archive: ArchiveRef {
                file: "binaries/demo-1.0-linux.tar.gz".to_string(),
                url: None,
                size: 10,
                sha256: "00".to_string(),
                extract: None,
            },
        };
        let published = d.with_url("https://example.com/1.0/");
        assert_eq!(
            published.archive.url.as_deref(),
            Some("https://example.com/1.0/demo-1.0-linux.tar.gz")
        );
        assert!(d.archive.url.is_none());
    }
}
