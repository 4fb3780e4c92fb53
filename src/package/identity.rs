use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::PackageVersion;

/// An `(id, version)` pair naming one published package version.
///
/// The id compares case-insensitively: `Newtonsoft.Json` and
/// `newtonsoft.json` name the same package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageIdentity {
    pub id: String,
    pub version: PackageVersion,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Returns true if `id` names this package, ignoring case.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.has_id(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .to_ascii_lowercase()
            .cmp(&other.id.to_ascii_lowercase())
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
