use futures_util::Stream;
use log::{debug, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::FeedPackageRecord;
use super::parse::parse_page;
use crate::error::{FeedError, Result};
use crate::http::{Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PagerState {
    Ready { uri: String },
    Done,
}

/// Walks a paged feed one request at a time.
///
/// Each call to [`FeedPager::next_page`] fetches and parses the current page
/// and follows its `next` link. Paging stops when a page has no `next`
/// link, or when the link points back at the page just fetched. After an
/// error the pager is done.
pub struct FeedPager {
    transport: Arc<dyn Transport>,
    fallback_id: Option<String>,
    cancel: CancellationToken,
    state: PagerState,
}

impl FeedPager {
    pub fn new(
        transport: Arc<dyn Transport>,
        uri: impl Into<String>,
        fallback_id: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            fallback_id,
            cancel,
            state: PagerState::Ready { uri: uri.into() },
        }
    }

    /// The URI the next call will fetch, if any.
    pub fn next_uri(&self) -> Option<&str> {
        match &self.state {
            PagerState::Ready { uri } => Some(uri),
            PagerState::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == PagerState::Done
    }

    /// Fetches the next page. `Ok(None)` once the feed is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<FeedPackageRecord>>> {
        let uri = match std::mem::replace(&mut self.state, PagerState::Done) {
            PagerState::Ready { uri } => uri,
            PagerState::Done => return Ok(None),
        };

        if self.cancel.is_cancelled() {
            debug!("Cancelled before fetching {}", uri);
            return Err(FeedError::Cancelled);
        }

        debug!("Fetching feed page {}", uri);
        let body = self.transport.get(&uri, &self.cancel).await.map_err(|e| match e {
            TransportError::Cancelled(_) => FeedError::Cancelled,
            e => e.into(),
        })?;

        let text = std::str::from_utf8(&body).map_err(|e| FeedError::MalformedFeed {
            uri: uri.clone(),
            message: e.to_string(),
        })?;
        let page = parse_page(text, &uri, self.fallback_id.as_deref())?;
        debug!("{} records on {}", page.records.len(), uri);

        match page.next_uri {
            Some(next) if next == uri => {
                warn!("Feed page {} links to itself as next, stopping", uri);
            }
            Some(next) if !next.is_empty() => {
                self.state = PagerState::Ready { uri: next };
            }
            _ => {}
        }

        Ok(Some(page.records))
    }

    /// Fetches every remaining page and concatenates the records in order.
    pub async fn collect_all(mut self) -> Result<Vec<FeedPackageRecord>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }

    /// Adapts the pager into a stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<FeedPackageRecord>>> + Send {
        futures_util::stream::try_unfold(self, |mut pager| async move {
            Ok(pager.next_page().await?.map(|records| (records, pager)))
        })
    }
}
