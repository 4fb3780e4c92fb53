//! Credential lookup for feeds that answer with `401 Unauthorized`.

use async_trait::async_trait;
use log::debug;

use super::TransportError;
use crate::source::Credentials;

/// Environment variable holding the feed username.
pub const USERNAME_ENV: &str = "V2FEED_USERNAME";

/// Environment variable holding the feed password.
pub const PASSWORD_ENV: &str = "V2FEED_PASSWORD";

/// What a transport knows when it asks for credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub uri: String,
    pub proxy: Option<String>,
    /// Previously supplied credentials were rejected.
    pub is_retry: bool,
    /// The provider must not prompt the user.
    pub non_interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialResponse {
    Found(Credentials),
    /// This provider has nothing for the request.
    NotApplicable,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self, request: &CredentialRequest) -> Result<CredentialResponse, TransportError>;
}

/// Never supplies credentials.
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn get(&self, _request: &CredentialRequest) -> Result<CredentialResponse, TransportError> {
        Ok(CredentialResponse::NotApplicable)
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads credentials from [`USERNAME_ENV`] and [`PASSWORD_ENV`].
///
/// A retry request is answered with `NotApplicable`: the environment will
/// not hold anything better the second time round.
pub struct EnvCredentialProvider {
    lookup: Lookup,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Uses `lookup` instead of the process environment.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    #[tracing::instrument(skip(self))]
    async fn get(&self, request: &CredentialRequest) -> Result<CredentialResponse, TransportError> {
        if request.is_retry {
            return Ok(CredentialResponse::NotApplicable);
        }

        match ((self.lookup)(USERNAME_ENV), (self.lookup)(PASSWORD_ENV)) {
            (Some(username), Some(password)) if !username.is_empty() => {
                debug!("Using {} for {}", USERNAME_ENV, request.uri);
                Ok(CredentialResponse::Found(Credentials::new(username, password)))
            }
            _ => Ok(CredentialResponse::NotApplicable),
        }
    }
}
