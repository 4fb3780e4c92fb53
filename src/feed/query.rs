//! Query URI construction for v2 feed endpoints.
//!
//! Values are substituted literally. Servers expect exactly this framing,
//! so nothing is percent-encoded here; callers escape special characters
//! themselves.

use crate::source::PackageSource;

const FIND_PACKAGES_BY_ID: &str = "/FindPackagesById()";
const SEARCH: &str = "/Search()";

/// `$filter` for searches that exclude pre-release versions.
pub const IS_LATEST_VERSION: &str = "IsLatestVersion";

/// `$filter` for searches that include pre-release versions.
pub const IS_ABSOLUTE_LATEST_VERSION: &str = "IsAbsoluteLatestVersion";

/// Options narrowing a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub supported_frameworks: Vec<String>,
    pub include_prerelease: bool,
}

impl SearchFilter {
    pub fn new(include_prerelease: bool) -> Self {
        Self {
            supported_frameworks: Vec::new(),
            include_prerelease,
        }
    }

    /// Add a supported target framework.
    pub fn framework(mut self, framework: impl Into<String>) -> Self {
        self.supported_frameworks.push(framework.into());
        self
    }
}

/// Endpoint templates bound to one source's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    find_packages_by_id: String,
    search: String,
}

impl QueryBuilder {
    pub fn new(source: &PackageSource) -> Self {
        let base = source.base_url();
        Self {
            find_packages_by_id: format!("{}{}", base, FIND_PACKAGES_BY_ID),
            search: format!("{}{}", base, SEARCH),
        }
    }

    /// `{base}/FindPackagesById()?Id='{id}'`
    pub fn find_packages_by_id(&self, id: &str) -> String {
        format!("{}?Id='{}'", self.find_packages_by_id, id)
    }

    /// `{base}/Search()?$filter=...&searchTerm='...'&targetFramework='...'&includePrerelease=...&$skip=...&$top=...`
    pub fn search(&self, term: &str, filter: &SearchFilter, skip: usize, take: usize) -> String {
        let flag = if filter.include_prerelease {
            IS_ABSOLUTE_LATEST_VERSION
        } else {
            IS_LATEST_VERSION
        };
        format!(
            "{}?$filter={}&searchTerm='{}'&targetFramework='{}'&includePrerelease={}&$skip={}&$top={}",
            self.search,
            flag,
            term,
            filter.supported_frameworks.join("/"),
            filter.include_prerelease,
            skip,
            take
        )
    }
}
