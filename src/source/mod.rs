//! Package source description.
//!
//! A [`PackageSource`] names a feed endpoint together with the credential
//! and proxy context used to reach it. Its [`SourceKey`] is what the
//! resource cache shares transports by.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Username and password for a feed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Identifies these credentials without exposing the password.
    ///
    /// The password hash comes from [`DefaultHasher`], whose output is not
    /// stable across Rust releases. A fingerprint is only meaningful within
    /// the process that computed it; never persist or compare it across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.password.hash(&mut hasher);
        format!("{}:{:016x}", self.username, hasher.finish())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*********")
            .finish()
    }
}

/// A feed endpoint plus the context needed to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    pub url: String,
    pub name: Option<String>,
    pub credentials: Option<Credentials>,
    pub proxy: Option<String>,
}

impl PackageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            credentials: None,
            proxy: None,
        }
    }

    /// Set a display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Returns true for `http://` and `https://` sources.
    pub fn is_http(&self) -> bool {
        let url = self.url.trim();
        scheme_of(url)
            .map(|scheme| scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }

    /// The source URL without surrounding whitespace or trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    /// Cache key for sharing resources between equivalent sources.
    pub fn key(&self) -> SourceKey {
        SourceKey {
            url: normalize_url(self.base_url()),
            credential: self.credentials.as_ref().map(Credentials::fingerprint),
            proxy: self.proxy.as_ref().map(|p| p.trim().to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.url),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Normalized `(url, credential fingerprint, proxy)` identity of a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    url: String,
    credential: Option<String>,
    proxy: Option<String>,
}

impl SourceKey {
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    Some(scheme).filter(|s| !s.is_empty())
}

/// Lowercases scheme and host; the path is case-sensitive on most servers.
fn normalize_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let (authority, path) = match rest.find('/') {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };
    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        path
    )
}
