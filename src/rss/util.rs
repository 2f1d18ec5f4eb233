//! Utility functions for RSS feed processing.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static XML_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<\?xml[^>]*encoding\s*=\s*["']([A-Za-z0-9_\-.:]+)["']"#).expect("valid xml decl regex")
});
static XML_DECL_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(<\?xml[^>]*encoding\s*=\s*["'])[A-Za-z0-9_\-.:]+(["'])"#).expect("valid xml decl regex")
});

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the document actually starts
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = cleaned[xml_start..].to_string();
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = cleaned[rss_start..].to_string();
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = cleaned[feed_start..].to_string();
    }

    // HTML entities that XML parsers reject
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&hellip;", "&#8230;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | // tab
                '\u{000A}' | // newline
                '\u{000D}' | // carriage return
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}

/// Undo any transfer compression the HTTP client did not already handle.
pub fn decode_body(bytes: &[u8], content_encoding: Option<&str>, rss_url: &str) -> Vec<u8> {
    if looks_like_markup(bytes) {
        return bytes.to_vec();
    }

    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed brotli content from {}", rss_url);
            return decoded;
        }
        debug!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}, trying other methods", rss_url);
    }
    try_decompressions(bytes, rss_url)
}

/// Try various decompression methods for a byte array
pub fn try_decompressions(bytes: &[u8], rss_url: &str) -> Vec<u8> {
    let mut decoded = Vec::new();
    if flate2::read::GzDecoder::new(bytes).read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with gzip from {}", rss_url);
        return decoded;
    }

    let mut decoded = Vec::new();
    if flate2::read::ZlibDecoder::new(bytes).read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with zlib from {}", rss_url);
        return decoded;
    }

    // raw deflate has no header, so only trust output that decodes to markup
    let mut decoded = Vec::new();
    if flate2::read::DeflateDecoder::new(bytes).read_to_end(&mut decoded).is_ok()
        && looks_like_markup(&decoded)
    {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with deflate from {}", rss_url);
        return decoded;
    }

    bytes.to_vec()
}

fn looks_like_markup(bytes: &[u8]) -> bool {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<')
}

/// Extracts the `charset=` parameter from a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .find(|part| part.trim().to_lowercase().starts_with("charset="))
        .and_then(|part| part.split('=').nth(1))
        .map(|charset| charset.trim().trim_matches('"').to_string())
        .filter(|charset| !charset.is_empty())
}

/// Decodes feed bytes to text.
///
/// Charset precedence: Content-Type header, then the XML declaration, then UTF-8.
/// The returned text is UTF-8, so its XML declaration is relabelled to match;
/// otherwise the parser would decode it a second time.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).into_owned();
            XML_ENCODING_RE
                .captures(&head)
                .map(|caps| caps[1].to_string())
        });

    let encoding = declared
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (decoded, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(target: TARGET_WEB_REQUEST, "Decoding as {} replaced invalid sequences", used.name());
    }
    XML_DECL_ENCODING_RE
        .replacen(&decoded, 1, "${1}UTF-8${2}")
        .into_owned()
}

/// Removes markup from a feed excerpt and collapses whitespace.
pub fn strip_html(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, " ");
    let unescaped = html_escape::decode_html_entities(&without_tags);
    WS_RE.replace_all(unescaped.trim(), " ").into_owned()
}

/// Truncates to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
