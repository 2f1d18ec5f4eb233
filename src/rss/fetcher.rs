//! Feed fetching: turns the source registry into this run's list of new articles.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use super::client::{create_http_client, fetch_feed_body};
use super::parser::parse_feed;
use super::types::{FeedEntry, Source};
use super::util::{decode_body, decode_text, is_valid_url};
use crate::article::{Article, Sentiment};
use crate::relevance::RelevanceClassifier;
use crate::seen::SeenSet;
use crate::TARGET_WEB_REQUEST;

/// Retrieves the normalized entries of one source, in feed order.
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn read_entries(&self, source: &Source) -> Result<Vec<FeedEntry>>;
}

pub struct HttpFeedReader {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpFeedReader {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            request_timeout,
        })
    }
}

#[async_trait]
impl FeedReader for HttpFeedReader {
    async fn read_entries(&self, source: &Source) -> Result<Vec<FeedEntry>> {
        if !is_valid_url(&source.url) {
            return Err(anyhow!("Invalid feed URL: {}", source.url));
        }

        let body = fetch_feed_body(&self.client, &source.url, self.request_timeout).await?;
        let bytes = decode_body(&body.bytes, body.content_encoding.as_deref(), &source.url);
        let text = decode_text(&bytes, body.content_type.as_deref());
        parse_feed(&text, &source.url)
    }
}

pub struct FetchOptions<'a> {
    pub max_per_source: usize,
    pub native_language: &'a str,
    pub classifier: &'a RelevanceClassifier,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub articles: Vec<Article>,
    /// The input set plus every URL observed this run, accepted or rejected.
    pub seen: SeenSet,
}

/// Fetches every source in registry order.
///
/// A failing source is logged and contributes nothing; it never aborts the run.
pub async fn fetch_articles(
    reader: &dyn FeedReader,
    sources: &[Source],
    seen: SeenSet,
    options: &FetchOptions<'_>,
) -> FetchOutcome {
    let mut seen = seen;
    let mut articles = Vec::new();

    for source in sources {
        info!(target: TARGET_WEB_REQUEST, "Fetching {} ({})", source.name, source.url);

        match reader.read_entries(source).await {
            Ok(entries) => {
                let count = collect_from_source(source, entries, &mut seen, options, &mut articles);
                info!(target: TARGET_WEB_REQUEST, "{}: {} new articles", source.name, count);
            }
            Err(err) => {
                error!(target: TARGET_WEB_REQUEST, "{}: fetch failed: {:#}", source.name, err);
            }
        }
    }

    FetchOutcome { articles, seen }
}

/// Applies dedupe, relevance and the per-source cap to one source's entries.
/// Returns the number of articles appended.
pub fn collect_from_source(
    source: &Source,
    entries: Vec<FeedEntry>,
    seen: &mut SeenSet,
    options: &FetchOptions<'_>,
    articles: &mut Vec<Article>,
) -> usize {
    let needs_filter = !source.language.eq_ignore_ascii_case(options.native_language);
    let mut emitted = 0;

    for entry in entries {
        if emitted >= options.max_per_source {
            break;
        }

        if entry.url.is_empty() || seen.contains(&entry.url) {
            continue;
        }

        // recorded before classification so a rejected entry is not re-evaluated next run
        seen.insert(&entry.url);

        if needs_filter && !options.classifier.is_relevant(&entry.title, &entry.excerpt) {
            debug!(target: TARGET_WEB_REQUEST, "{}: not relevant, skipping {}", source.name, entry.url);
            continue;
        }

        articles.push(Article {
            source: source.name.clone(),
            category: source.category.clone(),
            language: source.language.clone(),
            title: entry.title,
            url: entry.url,
            raw_excerpt: entry.excerpt,
            published: entry.published,
            ai_summary: None,
            sentiment: Sentiment::Neutral,
            companies: Vec::new(),
            tags: Vec::new(),
        });
        emitted += 1;
    }

    emitted
}
