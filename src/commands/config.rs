use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::ResourceCache,
    download::HttpDownloadResolver,
    feed::FeedClient,
    http::{ClientConfig, EnvCredentialProvider, HttpTransportFactory, Transport},
    source::{Credentials, PackageSource},
};

/// Connection options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub source: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub proxy: Option<String>,
    pub timeout: Option<Duration>,
}

impl SourceOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    fn package_source(&self) -> Result<PackageSource> {
        let mut source = PackageSource::new(self.source.clone());
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                debug!("Using credentials for {} from the command line", username);
                source = source.credentials(Credentials::new(username.clone(), password.clone()));
            }
            (None, None) => {}
            _ => anyhow::bail!("--username and --password must be given together"),
        }
        if let Some(proxy) = &self.proxy {
            source = source.proxy(proxy.clone());
        }
        Ok(source)
    }
}

/// Everything a command needs to talk to one feed.
pub struct Config {
    pub source: PackageSource,
    pub client: FeedClient,
    pub cancel: CancellationToken,
}

impl Config {
    pub fn new(options: &SourceOptions, cancel: CancellationToken) -> Result<Self> {
        let source = options.package_source()?;

        let mut client_config = ClientConfig::default();
        if let Some(timeout) = options.timeout {
            client_config.timeout = timeout;
        }
        debug!("Client configuration: {:?}", client_config);

        let cache = ResourceCache::new(HttpTransportFactory::new(
            client_config,
            Arc::new(EnvCredentialProvider::new()),
        ));
        let transport: Arc<dyn Transport> = cache
            .get_or_create(&source)
            .with_context(|| format!("Failed to create HTTP client for {}", source))?
            .with_context(|| format!("{} is not an HTTP(S) package source", source.url))?;

        let downloader = Arc::new(HttpDownloadResolver::new(Arc::clone(&transport)));
        let client = FeedClient::new(transport, source.clone(), downloader);

        Ok(Self {
            source,
            client,
            cancel,
        })
    }
}
