//! Release version grammar and in-tree version substitution.
//!
//! Versions are dotted number lists separated by modifiers
//! (`1.0`, `1.0-pre`, `2.1-rc3`, `0.9-post`, `1-2`). Ordering follows
//! `pre < rc < (none) < post`, so `1.0-pre < 1.0-rc1 < 1.0 < 1.0-post`.

mod substitution;

pub use substitution::{apply_substitutions, VersionSubstitution};

use crate::error::{Result, VersionError};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Modifier following a dotted number list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    /// `-pre`
    Pre,
    /// `-rc`
    Rc,
    /// No modifier, or a bare `-`
    None,
    /// `-post`
    Post,
}

impl Modifier {
    /// Split a `-`-separated segment into its modifier and the number list after it
    fn split_segment(segment: &str) -> (Self, &str) {
        for (tag, modifier) in [("pre", Modifier::Pre), ("rc", Modifier::Rc), ("post", Modifier::Post)] {
            if let Some(rest) = segment.strip_prefix(tag) {
                return (modifier, rest);
            }
        }
        (Modifier::None, segment)
    }

    fn tag(self) -> &'static str {
        match self {
            Modifier::Pre => "pre",
            Modifier::Rc => "rc",
            Modifier::None => "",
            Modifier::Post => "post",
        }
    }
}

/// A parsed release version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    parts: Vec<(Vec<u64>, Modifier)>,
}

fn parse_list(version: &str, list: &str) -> Result<Vec<u64>> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split('.')
        .map(|n| {
            n.parse::<u64>().map_err(|_| {
                VersionError::InvalidVersion {
                    version: version.to_string(),
                    reason: format!("'{}' is not a number", n),
                }
                .into()
            })
        })
        .collect()
}

impl ReleaseVersion {
    /// Parse a version string
    pub fn parse(version: &str) -> Result<Self> {
        if version.is_empty() {
            return Err(VersionError::InvalidVersion {
                version: String::new(),
                reason: "empty version string".to_string(),
            }
            .into());
        }

        let mut segments = version.split('-');
        let mut list = segments.next().unwrap_or_default();
        let mut parts = Vec::new();
        for segment in segments {
            let (modifier, rest) = Modifier::split_segment(segment);
            parts.push((parse_list(version, list)?, modifier));
            list = rest;
        }
        // A trailing modifier closes the version; otherwise the last list stands alone.
        if !list.is_empty() || parts.is_empty() {
            parts.push((parse_list(version, list)?, Modifier::None));
        }

        if parts.first().is_none_or(|(list, _)| list.is_empty()) {
            return Err(VersionError::InvalidVersion {
                version: version.to_string(),
                reason: "must start with a number".to_string(),
            }
            .into());
        }

        Ok(Self { parts })
    }

    /// Modifier of the last component
    pub fn last_modifier(&self) -> Modifier {
        self.parts.last().map(|(_, m)| *m).unwrap_or(Modifier::None)
    }

    /// Suggest the release version for a development version.
    ///
    /// `X-pre` and `X-rc` become `X`; `X-post` increments the last number.
    pub fn suggest_release(&self) -> Result<ReleaseVersion> {
        let mut parts = self.parts.clone();
        let not_snapshot = || VersionError::NotSnapshot {
            version: self.to_string(),
        };
        let (list, modifier) = parts.last_mut().ok_or_else(not_snapshot)?;
        match *modifier {
            Modifier::None => return Err(not_snapshot().into()),
            Modifier::Pre | Modifier::Rc => *modifier = Modifier::None,
            Modifier::Post => {
                *modifier = Modifier::None;
                let last = list.last_mut().ok_or_else(not_snapshot)?;
                *last = last.checked_add(1).ok_or_else(|| VersionError::ComponentOverflow {
                    version: self.to_string(),
                })?;
            }
        }
        Ok(Self { parts })
    }

    /// The development version that follows a release (`<version>-post`)
    pub fn post_release(&self) -> String {
        format!("{}-post", self)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl FromStr for ReleaseVersion {
    type Err = crate::error::ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.parts.len().saturating_sub(1);
        for (i, (list, modifier)) in self.parts.iter().enumerate() {
            let dotted: Vec<String> = list.iter().map(u64::to_string).collect();
            write!(f, "{}", dotted.join("."))?;
            if i < last || *modifier != Modifier::None {
                write!(f, "-{}", modifier.tag())?;
            }
        }
        Ok(())
    }
}

/// Highest tagged version strictly below `this_version`.
///
/// Tags that do not parse as versions are ignored.
pub fn previous_release<'a, I>(this_version: &str, tags: I) -> Result<Option<String>>
where
    I: IntoIterator<Item = &'a String>,
{
    let current = ReleaseVersion::parse(this_version)?;
    Ok(tags
        .into_iter()
        .filter_map(|t| ReleaseVersion::parse(t).ok())
        .filter(|v| *v < current)
        .max()
        .map(|v| v.to_string()))
}
