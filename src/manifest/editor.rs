//! Format-preserving edits of the release manifest.

use crate::error::{ManifestError, Result};
use std::path::Path;
use toml_edit::{DocumentMut, value};

/// Set `version` and `released` in the manifest, keeping comments and layout.
///
/// `released` of `None` clears the date (development versions); `Some(date)`
/// records it. Returns the previous version.
pub fn publish(path: &Path, version: &str, released: Option<&str>) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut doc = content.parse::<DocumentMut>()?;

    let previous = doc
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ManifestError::Invalid {
            path: path.to_path_buf(),
            reason: "missing 'version'".to_string(),
        })?;

    doc["version"] = value(version);
    doc["released"] = value(released.unwrap_or(""));

    std::fs::write(path, doc.to_string())?;
    log::debug!("{}: version {} -> {}", path.display(), previous, version);
    Ok(previous)
}

/// Today's date in manifest format
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(
            &path,
            "# Demo manifest\nname = \"demo\"\nversion = \"1.0-pre\" # bumped by release\nreleased = \"\"\n",
        )
        .unwrap();

        let previous = publish(&path, "1.0", Some("2024-05-01")).unwrap();
        assert_eq!(previous, "1.0-pre");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Demo manifest\n"));
        assert!(text.contains("version = \"1.0\""));
        assert!(text.contains("released = \"2024-05-01\""));
    }

    #[test]
    fn test_publish_adds_missing_released_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(&path, "name = \"demo\"\nversion = \"1.0\"\n").unwrap();

        publish(&path, "1.0-post", None).unwrap();
        let parsed: toml::Value = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["version"].as_str(), Some("1.0-post"));
        assert_eq!(parsed["released"].as_str(), Some(""));
    }

    #[test]
    fn test_today_format() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").is_ok());
    }
}
