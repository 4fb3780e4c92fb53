use anyhow::{Context, Result};

use super::config::Config;
use super::{OutputFormat, print_records};
use crate::package::{PackageIdentity, PackageVersion};

/// Show a single package version.
#[tracing::instrument(skip(config, format))]
pub async fn get(config: &Config, id: &str, version: &str, format: OutputFormat) -> Result<()> {
    let identity = parse_identity(id, version)?;
    let record = config
        .client
        .get_package(&identity, &config.cancel)
        .await
        .with_context(|| format!("Failed to look up {} on {}", identity, config.source))?;

    match record {
        Some(record) => print_records(&[record], format),
        None => anyhow::bail!("Package {} was not found on {}", identity, config.source),
    }
}

pub(crate) fn parse_identity(id: &str, version: &str) -> Result<PackageIdentity> {
    let version = PackageVersion::parse(version)
        .with_context(|| format!("Invalid version {:?} for {}", version, id))?;
    Ok(PackageIdentity::new(id, version))
}
