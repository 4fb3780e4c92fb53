use anyhow::Result;

use crate::feed::FeedPackageRecord;

pub mod config;
mod download;
mod find;
mod get;
mod search;

pub use download::download;
pub use find::find;
pub use get::get;
pub use search::search;

/// How records are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `id version` line per record.
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

pub(crate) fn render_records(records: &[FeedPackageRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(records
            .iter()
            .map(|record| format!("{}\n", record.identity))
            .collect()),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(records)?)),
    }
}

pub(crate) fn print_records(records: &[FeedPackageRecord], format: OutputFormat) -> Result<()> {
    print!("{}", render_records(records, format)?);
    Ok(())
}
