//! Atom/OData page parsing.
//!
//! A page looks like:
//!
//! ```xml
//! <feed xmlns="http://www.w3.org/2005/Atom"
//!       xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices"
//!       xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
//!   <entry>
//!     <title type="text">Foo</title>
//!     <summary type="text"></summary>
//!     <author><name>Jane</name></author>
//!     <content type="application/zip" src="http://x/pkg"/>
//!     <m:properties>
//!       <d:Id>Foo</d:Id>
//!       <d:Version>1.2.3</d:Version>
//!       ...
//!     </m:properties>
//!   </entry>
//!   <link rel="next" href="..."/>
//! </feed>
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use roxmltree::{Document, Node};

use super::FeedPackageRecord;
use crate::error::{FeedError, Result};
use crate::package::{PackageIdentity, PackageVersion};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const METADATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
pub const DATA_SERVICES_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";

/// The records on one page and the link to the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub records: Vec<FeedPackageRecord>,
    pub next_uri: Option<String>,
}

/// Parses one feed page fetched from `uri`.
///
/// `fallback_id` is used for entries that carry neither an `Id` property nor
/// a title. Any entry that cannot be turned into a record fails the page.
pub fn parse_page(body: &str, uri: &str, fallback_id: Option<&str>) -> Result<FeedPage> {
    let doc = Document::parse(body).map_err(|e| FeedError::MalformedFeed {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;
    let root = doc.root_element();

    let records = root
        .children()
        .filter(|node| node.has_tag_name((ATOM_NS, "entry")))
        .map(|entry| parse_entry(entry, fallback_id))
        .collect::<Result<Vec<_>>>()?;

    Ok(FeedPage {
        records,
        next_uri: next_link(root),
    })
}

/// The `href` of the first root-level `<link rel="next">`.
fn next_link(root: Node<'_, '_>) -> Option<String> {
    root.children()
        .filter(|node| node.has_tag_name((ATOM_NS, "link")))
        .filter(|link| {
            link.attribute("rel")
                .is_some_and(|rel| rel.eq_ignore_ascii_case("next"))
        })
        .find_map(|link| link.attribute("href"))
        .map(str::to_string)
}

fn parse_entry(entry: Node<'_, '_>, fallback_id: Option<&str>) -> Result<FeedPackageRecord> {
    let properties = child(entry, METADATA_NS, "properties");
    let property = |name: &str| properties.and_then(|p| child_text(p, DATA_SERVICES_NS, name));

    let title = child_text(entry, ATOM_NS, "title");

    let id = non_empty(property("Id"))
        .or_else(|| non_empty(title.clone()))
        .or_else(|| non_empty(fallback_id.map(str::to_string)))
        .ok_or_else(|| FeedError::Format("entry has no Id property, title or fallback id".into()))?;

    let version_text = property("Version")
        .ok_or_else(|| FeedError::Format(format!("entry '{}' has no Version property", id)))?;
    let version = PackageVersion::parse(&version_text)
        .map_err(|e| FeedError::Format(format!("entry '{}': {}", id, e)))?;

    let download_url = child(entry, ATOM_NS, "content")
        .and_then(|content| content.attribute("src"))
        .ok_or_else(|| {
            FeedError::Format(format!(
                "entry '{} {}' has no content src (download URL)",
                id, version
            ))
        })?
        .to_string();

    let min_client_version = property("MinClientVersion").and_then(|text| {
        PackageVersion::parse(&text)
            .inspect_err(|e| debug!("Ignoring MinClientVersion of {}: {}", id, e))
            .ok()
    });

    let published = property("Published").and_then(|text| parse_timestamp(&text));

    let authors = entry
        .children()
        .filter(|node| node.has_tag_name((ATOM_NS, "author")))
        .flat_map(|author| {
            author
                .children()
                .filter(|node| node.has_tag_name((ATOM_NS, "name")))
        })
        .map(text_of)
        .collect();

    let owners = property("Owners")
        .map(|owners| {
            owners
                .split(',')
                .map(str::trim)
                .filter(|owner| !owner.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(FeedPackageRecord {
        identity: PackageIdentity::new(id, version),
        title,
        summary: child_text(entry, ATOM_NS, "summary"),
        description: property("Description"),
        authors,
        owners,
        icon_url: property("IconUrl"),
        license_url: property("LicenseUrl"),
        project_url: property("ProjectUrl"),
        report_abuse_url: property("ReportAbuseUrl"),
        tags: property("Tags"),
        published,
        dependencies_raw: property("Dependencies"),
        require_license_acceptance: property("RequireLicenseAcceptance").as_deref() == Some("true"),
        download_url,
        download_count: property("DownloadCount"),
        package_hash: property("PackageHash"),
        package_hash_algorithm: property("PackageHashAlgorithm"),
        min_client_version,
    })
}

/// Accepts RFC 3339 and the offset-less OData form, read as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
        .ok()
}

fn child<'a, 'input>(parent: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    parent.children().find(|node| node.has_tag_name((ns, name)))
}

fn child_text(parent: Node<'_, '_>, ns: &str, name: &str) -> Option<String> {
    child(parent, ns, name).map(text_of)
}

/// All descendant text, like the element's string value in XPath.
fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "http://testsource/v2/FindPackagesById()?Id='Foo'";

    fn feed(entries: &str, links: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xml:base="http://testsource/v2/" xmlns="http://www.w3.org/2005/Atom"
      xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices"
      xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
  <title type="text">FindPackagesById</title>
  {}
  {}
</feed>"#,
            entries, links
        )
    }

    fn entry(title: Option<&str>, properties: &str) -> String {
        let title = title
            .map(|t| format!(r#"<title type="text">{}</title>"#, t))
            .unwrap_or_default();
        format!(
            r#"<entry>
    {}
    <content type="application/zip" src="http://x/pkg" />
    <m:properties>{}</m:properties>
  </entry>"#,
            title, properties
        )
    }

    fn parse(body: &str) -> Result<FeedPage> {
        parse_page(body, URI, Some("fallback"))
    }

    #[test]
    fn test_entry_without_id_uses_title() {
        let body = feed(&entry(Some("Foo"), "<d:Version>1.2.3</d:Version>"), "");
        let page = parse(&body).unwrap();

        assert_eq!(page.records.len(), 1);
        let record = &page.records[0];
        assert_eq!(record.id(), "Foo");
        assert_eq!(record.version().to_string(), "1.2.3");
        assert_eq!(record.download_url, "http://x/pkg");
        assert_eq!(page.next_uri, None);
    }

    #[test]
    fn test_id_property_wins_over_title() {
        let body = feed(
            &entry(
                Some("Friendly Title"),
                "<d:Id>Foo.Core</d:Id><d:Version>1.0</d:Version>",
            ),
            "",
        );
        let page = parse(&body).unwrap();
        assert_eq!(page.records[0].id(), "Foo.Core");
        assert_eq!(page.records[0].title.as_deref(), Some("Friendly Title"));
    }

    #[test]
    fn test_missing_id_and_title_uses_fallback() {
        let body = feed(&entry(None, "<d:Version>1.0</d:Version>"), "");
        let page = parse(&body).unwrap();
        assert_eq!(page.records[0].id(), "fallback");
        assert_eq!(page.records[0].title, None);
    }

    #[test]
    fn test_empty_id_and_title_use_fallback() {
        let body = feed(&entry(Some(""), "<d:Id></d:Id><d:Version>1.0</d:Version>"), "");
        let page = parse(&body).unwrap();
        assert_eq!(page.records[0].id(), "fallback");
    }

    #[test]
    fn test_no_id_anywhere_is_a_format_error() {
        let body = feed(&entry(None, "<d:Version>1.0</d:Version>"), "");
        let result = parse_page(&body, URI, None);
        assert!(matches!(result, Err(FeedError::Format(_))));
    }

    #[test]
    fn test_entries_in_document_order() {
        let entries = ["1.0.0", "1.1.0", "0.9.0"]
            .iter()
            .map(|v| entry(Some("Foo"), &format!("<d:Version>{}</d:Version>", v)))
            .collect::<String>();
        let page = parse(&feed(&entries, "")).unwrap();

        let versions: Vec<String> = page.records.iter().map(|r| r.version().to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0", "0.9.0"]);
    }

    #[test]
    fn test_unparsable_version_fails_whole_page() {
        let entries = format!(
            "{}{}",
            entry(Some("Foo"), "<d:Version>1.0.0</d:Version>"),
            entry(Some("Foo"), "<d:Version>not.a.version</d:Version>")
        );
        let result = parse(&feed(&entries, ""));
        match result {
            Err(FeedError::Format(message)) => assert!(message.contains("not.a.version")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_version_is_a_format_error() {
        let body = feed(&entry(Some("Foo"), "<d:Id>Foo</d:Id>"), "");
        assert!(matches!(parse(&body), Err(FeedError::Format(_))));
    }

    #[test]
    fn test_missing_properties_is_a_format_error() {
        let body = feed(
            r#"<entry><title>Foo</title><content src="http://x/pkg"/></entry>"#,
            "",
        );
        assert!(matches!(parse(&body), Err(FeedError::Format(_))));
    }

    #[test]
    fn test_missing_content_src_is_a_format_error() {
        let body = feed(
            r#"<entry><title>Foo</title><content type="application/zip"/>
               <m:properties><d:Version>1.0</d:Version></m:properties></entry>"#,
            "",
        );
        match parse(&body) {
            Err(FeedError::Format(message)) => assert!(message.contains("download URL")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_require_license_acceptance_is_exact_lowercase_true() {
        let cases = [
            ("true", true),
            ("True", false),
            ("TRUE", false),
            ("1", false),
            ("", false),
            (" true", false),
        ];
        for (text, expected) in cases {
            let body = feed(
                &entry(
                    Some("Foo"),
                    &format!(
                        "<d:Version>1.0</d:Version><d:RequireLicenseAcceptance>{}</d:RequireLicenseAcceptance>",
                        text
                    ),
                ),
                "",
            );
            let record = &parse(&body).unwrap().records[0];
            assert_eq!(
                record.require_license_acceptance, expected,
                "RequireLicenseAcceptance '{}'",
                text
            );
        }
    }

    #[test]
    fn test_best_effort_fields_degrade_to_none() {
        let body = feed(
            &entry(
                Some("Foo"),
                "<d:Version>1.0</d:Version>\
                 <d:MinClientVersion>garbage</d:MinClientVersion>\
                 <d:Published>yesterday</d:Published>",
            ),
            "",
        );
        let record = &parse(&body).unwrap().records[0];
        assert_eq!(record.min_client_version, None);
        assert_eq!(record.published, None);
    }

    #[test]
    fn test_all_optional_fields() {
        let body = feed(
            r#"<entry>
    <title type="text">WindowsAzure.Storage</title>
    <summary type="text">Azure storage client</summary>
    <author><name>Microsoft</name><name>Azure</name></author>
    <content type="application/zip" src="http://testsource/v2/package/WindowsAzure.Storage/4.3.2-preview" />
    <m:properties>
      <d:Id>WindowsAzure.Storage</d:Id>
      <d:Version>4.3.2-preview</d:Version>
      <d:Description>Storage library</d:Description>
      <d:IconUrl>http://go.microsoft.com/icon</d:IconUrl>
      <d:LicenseUrl>http://go.microsoft.com/license</d:LicenseUrl>
      <d:ProjectUrl>http://go.microsoft.com/project</d:ProjectUrl>
      <d:ReportAbuseUrl>http://testsource/abuse</d:ReportAbuseUrl>
      <d:Tags>Microsoft Azure Storage</d:Tags>
      <d:Dependencies>Microsoft.Data.OData:[5.6.2]:net40|Newtonsoft.Json:6.0.4:netcore50</d:Dependencies>
      <d:RequireLicenseAcceptance>true</d:RequireLicenseAcceptance>
      <d:DownloadCount m:type="Edm.Int32">42</d:DownloadCount>
      <d:PackageHash>abc==</d:PackageHash>
      <d:PackageHashAlgorithm>SHA512</d:PackageHashAlgorithm>
      <d:MinClientVersion>2.8.1</d:MinClientVersion>
      <d:Published m:type="Edm.DateTime">2015-03-12T18:23:49.453</d:Published>
      <d:Owners>azure-sdk, microsoft</d:Owners>
    </m:properties>
  </entry>"#,
            "",
        );
        let record = &parse(&body).unwrap().records[0];

        assert_eq!(record.id(), "WindowsAzure.Storage");
        assert_eq!(record.version().to_string(), "4.3.2-preview");
        assert_eq!(record.summary.as_deref(), Some("Azure storage client"));
        assert_eq!(record.description.as_deref(), Some("Storage library"));
        assert_eq!(record.authors, vec!["Microsoft", "Azure"]);
        assert_eq!(record.owners, vec!["azure-sdk", "microsoft"]);
        assert_eq!(record.icon_url.as_deref(), Some("http://go.microsoft.com/icon"));
        assert_eq!(record.license_url.as_deref(), Some("http://go.microsoft.com/license"));
        assert_eq!(record.project_url.as_deref(), Some("http://go.microsoft.com/project"));
        assert_eq!(record.report_abuse_url.as_deref(), Some("http://testsource/abuse"));
        assert_eq!(record.tags.as_deref(), Some("Microsoft Azure Storage"));
        assert!(record.require_license_acceptance);
        assert_eq!(record.download_count.as_deref(), Some("42"));
        assert_eq!(record.package_hash.as_deref(), Some("abc=="));
        assert_eq!(record.package_hash_algorithm.as_deref(), Some("SHA512"));
        assert_eq!(
            record.min_client_version,
            Some(PackageVersion::parse("2.8.1").unwrap())
        );
        assert_eq!(
            record.published.map(|p| p.to_rfc3339()),
            Some("2015-03-12T18:23:49.453+00:00".to_string())
        );

        let deps = record.dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].id, "Microsoft.Data.OData");
        assert_eq!(deps[1].target_framework.as_deref(), Some("netcore50"));
    }

    #[test]
    fn test_absent_optional_fields_are_none() {
        let body = feed(&entry(Some("Foo"), "<d:Version>1.0</d:Version>"), "");
        let record = &parse(&body).unwrap().records[0];
        assert_eq!(record.summary, None);
        assert_eq!(record.description, None);
        assert!(record.authors.is_empty());
        assert!(record.owners.is_empty());
        assert_eq!(record.tags, None);
        assert_eq!(record.dependencies_raw, None);
        assert_eq!(record.download_count, None);
        assert_eq!(record.package_hash, None);
    }

    #[test]
    fn test_published_with_offset() {
        assert_eq!(
            parse_timestamp("2015-03-12T18:23:49+02:00").map(|p| p.to_rfc3339()),
            Some("2015-03-12T16:23:49+00:00".to_string())
        );
        assert!(parse_timestamp("1900-01-01T00:00:00").is_some());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_next_link_is_case_insensitive() {
        let body = feed(
            &entry(Some("Foo"), "<d:Version>1.0</d:Version>"),
            r#"<link rel="self" href="http://testsource/v2/self" />
               <link rel="NEXT" href="http://testsource/v2/page2" />"#,
        );
        let page = parse(&body).unwrap();
        assert_eq!(page.next_uri.as_deref(), Some("http://testsource/v2/page2"));
    }

    #[test]
    fn test_next_link_without_href_is_skipped() {
        let body = feed(
            "",
            r#"<link rel="next" />
               <link rel="next" href="http://testsource/v2/page2" />"#,
        );
        let page = parse(&body).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.next_uri.as_deref(), Some("http://testsource/v2/page2"));
    }

    #[test]
    fn test_nested_next_link_is_ignored() {
        let body = feed(
            r#"<entry><title>Foo</title><link rel="next" href="http://elsewhere" />
               <content src="http://x/pkg"/>
               <m:properties><d:Version>1.0</d:Version></m:properties></entry>"#,
            "",
        );
        assert_eq!(parse(&body).unwrap().next_uri, None);
    }

    #[test]
    fn test_malformed_xml() {
        let result = parse("<feed><entry></feed>");
        match result {
            Err(FeedError::MalformedFeed { uri, .. }) => assert_eq!(uri, URI),
            other => panic!("expected malformed feed error, got {:?}", other),
        }
    }

    #[test]
    fn test_entries_outside_atom_namespace_are_ignored() {
        let body = r#"<feed><entry><title>Foo</title></entry></feed>"#;
        let page = parse(body).unwrap();
        assert!(page.records.is_empty());
    }
}
