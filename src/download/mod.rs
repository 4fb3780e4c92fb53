use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{FeedError, Result};
use crate::http::{Transport, TransportError};
use crate::package::PackageIdentity;

/// Limits applied to a package download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Reject artifacts larger than this many bytes.
    pub max_size: Option<u64>,
}

/// A fetched package artifact held in memory.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub identity: PackageIdentity,
    pub url: String,
    pub content: Bytes,
}

impl DownloadResult {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Writes the artifact to `path`, creating parent directories as needed.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.content).await?;
        debug!("Wrote {} bytes of {} to {:?}", self.len(), self.identity, path);
        Ok(())
    }
}

/// Fetches the artifact for a package once its download URL is known.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloadResolver: Send + Sync {
    async fn get_download_result(
        &self,
        identity: &PackageIdentity,
        url: &str,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult>;
}

/// [`DownloadResolver`] that fetches artifacts through a [`Transport`].
pub struct HttpDownloadResolver {
    transport: Arc<dyn Transport>,
}

impl HttpDownloadResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl DownloadResolver for HttpDownloadResolver {
    #[tracing::instrument(skip(self, settings, cancel))]
    async fn get_download_result(
        &self,
        identity: &PackageIdentity,
        url: &str,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }

        info!("Downloading {} from {}...", identity, url);
        let response = match settings.max_size {
            Some(max_size) => self.transport.get_limited(url, max_size, cancel).await,
            None => self.transport.get(url, cancel).await,
        };
        let content = response.map_err(|e| match e {
            TransportError::Cancelled(_) => FeedError::Cancelled,
            TransportError::TooLarge { received, limit, .. } => FeedError::Download(format!(
                "{} is at least {} bytes, larger than the {} byte limit",
                identity, received, limit
            )),
            e => e.into(),
        })?;

        info!("Downloaded {} ({} bytes).", identity, content.len());
        Ok(DownloadResult {
            identity: identity.clone(),
            url: url.to_string(),
            content,
        })
    }
}
