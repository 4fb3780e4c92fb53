use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use reqwest::{Client, StatusCode, Url};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::credentials::{CredentialProvider, CredentialRequest, CredentialResponse};
use super::retry::{MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy, with_retry};
use super::TransportError;
use crate::cache::ResourceFactory;
use crate::source::{Credentials, PackageSource};

/// Executes GET requests against a package source.
///
/// Implementations own authentication, proxies, timeouts and transient
/// retries. Callers see either the full response body or an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, uri: &str, cancel: &CancellationToken) -> Result<Bytes, TransportError>;

    /// Like [`Transport::get`], but gives up with
    /// [`TransportError::TooLarge`] as soon as the body is known to exceed
    /// `max_size` bytes, without reading the rest of it.
    async fn get_limited(
        &self,
        uri: &str,
        max_size: u64,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransportError>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Timeout for one request, including reading the body.
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("v2feed/{}", env!("V2FEED_VERSION")),
            timeout: Duration::from_secs(100),
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl ClientConfig {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay: self.retry_delay,
        }
    }
}

/// [`Transport`] over a pooled `reqwest` client bound to one source.
///
/// Credentials come from the source first. When the server answers
/// `401` and the source has none, the credential provider is asked once;
/// credentials it supplies are kept for later requests.
pub struct HttpTransport {
    client: Client,
    source: PackageSource,
    config: ClientConfig,
    provider: Arc<dyn CredentialProvider>,
    prompted: Mutex<Option<Credentials>>,
}

impl HttpTransport {
    pub fn new(
        source: PackageSource,
        config: ClientConfig,
        provider: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout);

        if let Some(proxy) = &source.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TransportError::Client(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            source,
            config,
            provider,
            prompted: Mutex::new(None),
        })
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn credentials(&self) -> Option<Credentials> {
        if let Some(credentials) = &self.source.credentials {
            return Some(credentials.clone());
        }
        self.prompted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn remember(&self, credentials: Credentials) {
        *self
            .prompted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credentials);
    }

    async fn get_with_retry(
        &self,
        url: &Url,
        credentials: Option<Credentials>,
        limit: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransportError> {
        with_retry(url.as_str(), self.config.retry_policy(), cancel, || {
            self.send(url.clone(), credentials.clone(), limit)
        })
        .await
    }

    async fn send(
        &self,
        url: Url,
        credentials: Option<Credentials>,
        limit: Option<u64>,
    ) -> Result<Bytes, TransportError> {
        let uri = url.to_string();
        let mut request = self.client.get(url);
        if let Some(credentials) = credentials {
            request = request.basic_auth(credentials.username, Some(credentials.password));
        }

        let mut response = request
            .send()
            .await
            .map_err(|source| TransportError::Request {
                uri: uri.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized { uri });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                uri,
                status: status.as_u16(),
            });
        }

        let Some(limit) = limit else {
            return response
                .bytes()
                .await
                .map_err(|source| TransportError::Request { uri, source });
        };

        if let Some(length) = response.content_length().filter(|length| *length > limit) {
            return Err(TransportError::TooLarge {
                uri,
                received: length,
                limit,
            });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| TransportError::Request {
                uri: uri.clone(),
                source,
            })?
        {
            let received = (body.len() + chunk.len()) as u64;
            if received > limit {
                debug!("Aborting {} after {} bytes", uri, received);
                return Err(TransportError::TooLarge {
                    uri,
                    received,
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    async fn fetch(
        &self,
        uri: &str,
        limit: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransportError> {
        let url = Url::parse(uri).map_err(|_| TransportError::InvalidUri(uri.to_string()))?;
        debug!("GET {}", url);

        let credentials = self.credentials();
        let had_credentials = credentials.is_some();

        match self.get_with_retry(&url, credentials, limit, cancel).await {
            Err(TransportError::Unauthorized { uri }) if self.source.credentials.is_none() => {
                let request = CredentialRequest {
                    uri: uri.clone(),
                    proxy: self.source.proxy.clone(),
                    is_retry: had_credentials,
                    non_interactive: true,
                };
                match self.provider.get(&request).await? {
                    CredentialResponse::Found(credentials) => {
                        debug!("Retrying {} with supplied credentials", uri);
                        let body = self
                            .get_with_retry(&url, Some(credentials.clone()), limit, cancel)
                            .await?;
                        self.remember(credentials);
                        Ok(body)
                    }
                    CredentialResponse::NotApplicable => {
                        warn!("{} requires credentials and none are available", uri);
                        Err(TransportError::Unauthorized { uri })
                    }
                }
            }
            result => result,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, cancel))]
    async fn get(&self, uri: &str, cancel: &CancellationToken) -> Result<Bytes, TransportError> {
        self.fetch(uri, None, cancel).await
    }

    #[tracing::instrument(skip(self, cancel))]
    async fn get_limited(
        &self,
        uri: &str,
        max_size: u64,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransportError> {
        self.fetch(uri, Some(max_size), cancel).await
    }
}

/// Builds one [`HttpTransport`] per source for a [`crate::cache::ResourceCache`].
pub struct HttpTransportFactory {
    config: ClientConfig,
    provider: Arc<dyn CredentialProvider>,
}

impl HttpTransportFactory {
    pub fn new(config: ClientConfig, provider: Arc<dyn CredentialProvider>) -> Self {
        Self { config, provider }
    }
}

impl ResourceFactory for HttpTransportFactory {
    type Resource = HttpTransport;
    type Error = TransportError;

    fn create(&self, source: &PackageSource) -> Result<HttpTransport, TransportError> {
        HttpTransport::new(source.clone(), self.config.clone(), Arc::clone(&self.provider))
    }
}
