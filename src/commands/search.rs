use anyhow::{Context, Result};

use super::config::Config;
use super::{OutputFormat, print_records};
use crate::feed::SearchFilter;

/// Search the feed for packages matching `term`.
#[tracing::instrument(skip(config, filter, format))]
pub async fn search(
    config: &Config,
    term: &str,
    filter: &SearchFilter,
    skip: usize,
    take: usize,
    format: OutputFormat,
) -> Result<()> {
    let records = config
        .client
        .search(term, filter, skip, take, &config.cancel)
        .await
        .with_context(|| format!("Search for {:?} on {} failed", term, config.source))?;
    print_records(&records, format)
}
