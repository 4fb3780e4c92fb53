use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::package::{FeedDependency, PackageIdentity, PackageVersion, parse_dependencies};

/// Metadata for one package version, as listed by a feed entry.
///
/// Only `identity` and `download_url` are guaranteed; every other field is
/// whatever the server sent, or `None`/empty when it sent nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPackageRecord {
    pub identity: PackageIdentity,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub owners: Vec<String>,
    pub icon_url: Option<String>,
    pub license_url: Option<String>,
    pub project_url: Option<String>,
    pub report_abuse_url: Option<String>,
    pub tags: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub dependencies_raw: Option<String>,
    pub require_license_acceptance: bool,
    pub download_url: String,
    pub download_count: Option<String>,
    pub package_hash: Option<String>,
    pub package_hash_algorithm: Option<String>,
    pub min_client_version: Option<PackageVersion>,
}

impl FeedPackageRecord {
    /// A record with only the required fields set.
    pub fn new(identity: PackageIdentity, download_url: impl Into<String>) -> Self {
        Self {
            identity,
            title: None,
            summary: None,
            description: None,
            authors: Vec::new(),
            owners: Vec::new(),
            icon_url: None,
            license_url: None,
            project_url: None,
            report_abuse_url: None,
            tags: None,
            published: None,
            dependencies_raw: None,
            require_license_acceptance: false,
            download_url: download_url.into(),
            download_count: None,
            package_hash: None,
            package_hash_algorithm: None,
            min_client_version: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.identity.version
    }

    /// Tokenizes [`Self::dependencies_raw`].
    pub fn dependencies(&self) -> Vec<FeedDependency> {
        self.dependencies_raw
            .as_deref()
            .map(parse_dependencies)
            .unwrap_or_default()
    }

    /// Dependencies that apply to `framework`.
    ///
    /// A dependency group with no target framework applies to every
    /// framework, and an empty `framework` selects every dependency.
    /// Otherwise framework names must match exactly, ignoring ASCII case;
    /// no framework compatibility mapping is attempted.
    pub fn dependencies_for(&self, framework: &str) -> Vec<FeedDependency> {
        let framework = framework.trim();
        self.dependencies()
            .into_iter()
            .filter(|dep| match dep.target_framework.as_deref() {
                None => true,
                Some(_) if framework.is_empty() => true,
                Some(target) => target.eq_ignore_ascii_case(framework),
            })
            .collect()
    }
}
