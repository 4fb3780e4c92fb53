//! Client for NuGet v2 (OData/Atom) feeds.

mod pager;
pub mod parse;
mod query;
mod record;

pub use pager::FeedPager;
pub use parse::{FeedPage, parse_page};
pub use query::{IS_ABSOLUTE_LATEST_VERSION, IS_LATEST_VERSION, QueryBuilder, SearchFilter};
pub use record::FeedPackageRecord;

use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::download::{DownloadResolver, DownloadResult, DownloadSettings};
use crate::error::{FeedError, Result};
use crate::http::Transport;
use crate::package::PackageIdentity;
use crate::source::PackageSource;

/// Queries one v2 feed.
///
/// The client holds no per-query state; each call drives its own
/// [`FeedPager`], so one client can serve concurrent queries.
pub struct FeedClient {
    transport: Arc<dyn Transport>,
    source: PackageSource,
    queries: QueryBuilder,
    downloader: Arc<dyn DownloadResolver>,
}

impl FeedClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        source: PackageSource,
        downloader: Arc<dyn DownloadResolver>,
    ) -> Self {
        let queries = QueryBuilder::new(&source);
        Self {
            transport,
            source,
            queries,
            downloader,
        }
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    pub fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    /// Lazily pages through the feed starting at `uri`.
    pub fn pages(&self, uri: impl Into<String>, fallback_id: Option<String>, cancel: CancellationToken) -> FeedPager {
        FeedPager::new(Arc::clone(&self.transport), uri, fallback_id, cancel)
    }

    /// Every version of `id` the feed lists, in feed order.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn find_packages_by_id(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedPackageRecord>> {
        if id.is_empty() {
            return Err(FeedError::InvalidArgument("package id must not be empty".into()));
        }

        let uri = self.queries.find_packages_by_id(id);
        let records = self
            .pages(uri, Some(id.to_string()), cancel.clone())
            .collect_all()
            .await?;
        debug!("Found {} versions of {} on {}", records.len(), id, self.source);
        Ok(records)
    }

    /// The record for exactly `identity`, if the feed has it.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_package(
        &self,
        identity: &PackageIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<FeedPackageRecord>> {
        let records = self.find_packages_by_id(&identity.id, cancel).await?;
        Ok(records
            .into_iter()
            .find(|record| record.version() == &identity.version))
    }

    #[tracing::instrument(skip(self, filter, cancel))]
    pub async fn search(
        &self,
        term: &str,
        filter: &SearchFilter,
        skip: usize,
        take: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedPackageRecord>> {
        let uri = self.queries.search(term, filter, skip, take);
        let records = self.pages(uri, None, cancel.clone()).collect_all().await?;
        debug!("Search for '{}' returned {} records", term, records.len());
        Ok(records)
    }

    /// Downloads `identity` from a known artifact URL.
    pub async fn download_from_url(
        &self,
        identity: &PackageIdentity,
        uri: &str,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        self.downloader
            .get_download_result(identity, uri, settings, cancel)
            .await
    }

    /// Looks up `identity` and downloads its artifact.
    #[tracing::instrument(skip(self, settings, cancel))]
    pub async fn download_from_identity(
        &self,
        identity: &PackageIdentity,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        let record = self
            .get_package(identity, cancel)
            .await?
            .ok_or_else(|| FeedError::PackageNotFound(identity.clone()))?;
        info!("Resolved {} to {}", identity, record.download_url);
        self.download_from_url(&record.identity, &record.download_url, settings, cancel)
            .await
    }
}
