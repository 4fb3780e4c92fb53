use serde::Serialize;

use super::VersionRange;

/// One entry of a feed's raw `Dependencies` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedDependency {
    pub id: String,
    /// `None` when the range was omitted or could not be parsed.
    pub range: Option<VersionRange>,
    pub target_framework: Option<String>,
}

/// Splits a raw `Dependencies` value (`id:range:framework|...`).
///
/// Tokenization is best-effort: empty segments are skipped and an
/// unparsable range is dropped rather than reported.
pub fn parse_dependencies(raw: &str) -> Vec<FeedDependency> {
    raw.split('|')
        .filter_map(|segment| {
            let mut fields = segment.splitn(3, ':').map(str::trim);
            let id = fields.next().filter(|id| !id.is_empty())?;
            let range = fields
                .next()
                .filter(|r| !r.is_empty())
                .and_then(|r| VersionRange::parse(r).ok());
            let target_framework = fields
                .next()
                .filter(|f| !f.is_empty())
                .map(str::to_string);

            Some(FeedDependency {
                id: id.to_string(),
                range,
                target_framework,
            })
        })
        .collect()
}
