//! Feed parsing for RSS and Atom documents.

use anyhow::{anyhow, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::FeedEntry;
use super::util::{cleanup_xml, strip_html};
use crate::TARGET_WEB_REQUEST;

/// Parses a decoded feed document into normalized entries, preserving feed order.
///
/// A document that fails to parse is retried once after `cleanup_xml`.
pub fn parse_feed(text: &str, rss_url: &str) -> Result<Vec<FeedEntry>> {
    let feed = match parser::parse(Cursor::new(text.as_bytes())) {
        Ok(feed) => feed,
        Err(first_err) => {
            let cleaned_xml = cleanup_xml(text);
            if !(cleaned_xml.contains("<rss") || cleaned_xml.contains("<feed") || cleaned_xml.contains("<rdf")) {
                let preview = text.chars().take(100).collect::<String>();
                return Err(anyhow!(
                    "Feed from {} doesn't appear to be RSS or Atom. Content preview: {}",
                    rss_url,
                    preview
                ));
            }

            match parser::parse(Cursor::new(cleaned_xml.as_bytes())) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed from {} parsed only after XML cleanup", rss_url);
                    feed
                }
                Err(second_err) => {
                    return Err(anyhow!(
                        "Failed to parse feed from {} after cleanup. First error: {}. Second error: {}",
                        rss_url,
                        first_err,
                        second_err
                    ))
                }
            }
        }
    };

    debug!(target: TARGET_WEB_REQUEST, "Parsed feed with {} entries", feed.entries.len());

    Ok(feed.entries.into_iter().map(normalize_entry).collect())
}

fn normalize_entry(entry: Entry) -> FeedEntry {
    let url = entry
        .links
        .first()
        .map(|link| link.href.trim().to_string())
        .unwrap_or_default();

    let title = entry
        .title
        .map(|t| strip_html(&t.content))
        .unwrap_or_default();

    let excerpt = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|raw| strip_html(&raw))
        .unwrap_or_default();

    FeedEntry {
        url,
        title,
        excerpt,
        published: entry.published.or(entry.updated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Markets</title>
    <link>https://example.com</link>
    <description>Market news</description>
    <item>
      <title>  Fed raises interest rates  </title>
      <link>https://example.com/fed</link>
      <description>&lt;p&gt;The central bank moved &lt;b&gt;again&lt;/b&gt;.&lt;/p&gt;</description>
      <pubDate>Mon, 06 Jan 2025 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>No link here</title>
      <description>Orphan entry</description>
    </item>
    <item>
      <title>Yen slides</title>
      <link>https://example.com/yen</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_preserves_order_and_normalizes() {
        let entries = parse_feed(RSS, "https://example.com/rss").unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].url, "https://example.com/fed");
        assert_eq!(entries[0].title, "Fed raises interest rates");
        assert_eq!(entries[0].excerpt, "The central bank moved again .");
        assert!(entries[0].published.is_some());

        // an entry without a link keeps an empty URL; the fetcher skips it
        assert_eq!(entries[1].url, "");
        assert_eq!(entries[2].url, "https://example.com/yen");
        assert_eq!(entries[2].excerpt, "");
    }

    #[test]
    fn test_parse_recovers_after_cleanup() {
        let dirty = format!("\u{FEFF}\n\n{}", RSS.replace("Markets", "Markets&nbsp;Daily"));
        let entries = parse_feed(&dirty, "https://example.com/rss").unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_shift_jis_feed_decodes_once() {
        use super::super::util::decode_text;

        let doc = r#"<?xml version="1.0" encoding="Shift_JIS"?>
<rss version="2.0">
  <channel>
    <title>NHK</title>
    <item>
      <title>日銀が金利据え置き</title>
      <link>https://example.jp/boj</link>
      <description>円相場は小動き</description>
    </item>
  </channel>
</rss>"#;
        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode(doc);

        for content_type in [None, Some("application/rss+xml; charset=Shift_JIS")] {
            let text = decode_text(&sjis, content_type);
            let entries = parse_feed(&text, "https://example.jp/rss").unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].title, "日銀が金利据え置き");
            assert_eq!(entries[0].excerpt, "円相場は小動き");
        }
    }

    #[test]
    fn test_non_feed_content_is_an_error() {
        let err = parse_feed("<html><body>Not a feed</body></html>", "https://example.com").unwrap_err();
        assert!(err.to_string().contains("doesn't appear to be RSS or Atom"));
    }
}
