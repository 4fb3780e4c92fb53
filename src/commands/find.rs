use anyhow::{Context, Result};
use log::debug;

use super::config::Config;
use super::{OutputFormat, print_records};
use crate::feed::FeedPackageRecord;
use crate::package::VersionRange;

/// List every version of a package, optionally narrowed to a version range.
#[tracing::instrument(skip(config, format))]
pub async fn find(config: &Config, id: &str, range: Option<&str>, format: OutputFormat) -> Result<()> {
    let records = find_versions(config, id, range).await?;
    if records.is_empty() {
        debug!("No versions of {} on {}", id, config.source);
    }
    print_records(&records, format)
}

pub(crate) async fn find_versions(
    config: &Config,
    id: &str,
    range: Option<&str>,
) -> Result<Vec<FeedPackageRecord>> {
    let range = match range {
        Some(text) => Some(
            text.parse::<VersionRange>()
                .with_context(|| format!("Invalid version range {:?}", text))?,
        ),
        None => None,
    };

    let records = config
        .client
        .find_packages_by_id(id, &config.cancel)
        .await
        .with_context(|| format!("Failed to list versions of {} from {}", id, config.source))?;

    Ok(match range {
        Some(range) => records
            .into_iter()
            .filter(|record| range.satisfies(record.version()))
            .collect(),
        None => records,
    })
}
