use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use super::config::Config;
use super::get::parse_identity;
use crate::download::DownloadSettings;
use crate::package::PackageIdentity;

/// Download a package artifact and print where it was written.
#[tracing::instrument(skip(config, settings))]
pub async fn download(
    config: &Config,
    id: &str,
    version: &str,
    output: Option<PathBuf>,
    settings: &DownloadSettings,
) -> Result<()> {
    let path = fetch(config, id, version, output, settings).await?;
    println!("{}", path.display());
    Ok(())
}

pub(crate) async fn fetch(
    config: &Config,
    id: &str,
    version: &str,
    output: Option<PathBuf>,
    settings: &DownloadSettings,
) -> Result<PathBuf> {
    let identity = parse_identity(id, version)?;
    let path = output.unwrap_or_else(|| default_file_name(&identity));

    let result = config
        .client
        .download_from_identity(&identity, settings, &config.cancel)
        .await
        .with_context(|| format!("Failed to download {} from {}", identity, config.source))?;

    result
        .write_to(&path)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Saved {} to {:?}", result.identity, path);
    Ok(path)
}

/// `<id>.<version>.nupkg` with the normalized version.
pub(crate) fn default_file_name(identity: &PackageIdentity) -> PathBuf {
    PathBuf::from(format!(
        "{}.{}.nupkg",
        identity.id,
        identity.version.to_normalized_string()
    ))
}
