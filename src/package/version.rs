//! Package versions as published on legacy feeds.
//!
//! Feed versions are a superset of SemVer: they allow one to four numeric
//! parts (`1.0`, `1.0.0`, `1.0.0.0`), and release labels compare
//! case-insensitively.

use semver::{BuildMetadata, Prerelease};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid package version '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

impl VersionParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed package version.
///
/// Equality and ordering ignore build metadata and the case of the
/// release label, so `1.0-Beta+abc` equals `1.0.0-beta`.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    release: String,
    release_key: Prerelease,
    metadata: Option<String>,
    original: String,
}

impl PackageVersion {
    /// Creates a release version from its numeric parts.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release: String::new(),
            release_key: Prerelease::EMPTY,
            metadata: None,
            original: format!("{}.{}.{}", major, minor, patch),
        }
    }

    /// Parses a version string.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::new(input, "version is empty"));
        }

        let (rest, metadata) = match trimmed.split_once('+') {
            Some((rest, meta)) => {
                BuildMetadata::new(meta)
                    .map_err(|e| VersionParseError::new(input, e.to_string()))?;
                (rest, Some(meta.to_string()))
            }
            None => (trimmed, None),
        };

        let (numbers, release) = match rest.split_once('-') {
            Some((numbers, release)) => (numbers, release),
            None => (rest, ""),
        };

        let parts = numbers
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionParseError::new(
                        input,
                        format!("'{}' is not a number", part),
                    ));
                }
                part.parse::<u64>()
                    .map_err(|e| VersionParseError::new(input, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if parts.len() > 4 {
            return Err(VersionParseError::new(
                input,
                "at most four numeric parts are allowed",
            ));
        }

        let release_key = if release.is_empty() {
            if rest.ends_with('-') {
                return Err(VersionParseError::new(input, "release label is empty"));
            }
            Prerelease::EMPTY
        } else {
            Prerelease::new(&release.to_ascii_lowercase())
                .map_err(|e| VersionParseError::new(input, e.to_string()))?
        };

        let part = |index: usize| parts.get(index).copied().unwrap_or(0);

        Ok(Self {
            major: part(0),
            minor: part(1),
            patch: part(2),
            revision: part(3),
            release: release.to_string(),
            release_key,
            metadata,
            original: trimmed.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The release label without the leading `-`, empty for stable versions.
    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// The string this version was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_prerelease(&self) -> bool {
        !self.release.is_empty()
    }

    /// Renders `major.minor.patch[.revision][-release]`.
    ///
    /// The revision is only included when it is non-zero.
    pub fn to_normalized_string(&self) -> String {
        let mut s = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision > 0 {
            s.push_str(&format!(".{}", self.revision));
        }
        if !self.release.is_empty() {
            s.push('-');
            s.push_str(&self.release);
        }
        s
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.release_key.as_str().hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| {
                // A stable version sorts after any pre-release of the same numbers.
                match (self.release_key.is_empty(), other.release_key.is_empty()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => self.release_key.cmp(&other.release_key),
                }
            })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_normalized_string())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_normalized_string())
    }
}
