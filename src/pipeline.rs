//! One complete run: fetch, persist the seen-set, summarize, render, notify, archive.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing::{error, info};

use crate::archive::cleanup_old_digests;
use crate::config::AppConfig;
use crate::digest::{render_digest, write_digest};
use crate::llm::LlmBackend;
use crate::notifier::{send_digest, NotifyOutcome};
use crate::rss::{fetch_articles, FeedReader, FetchOptions};
use crate::seen::SeenSet;
use crate::summarizer::summarize_all;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub articles: usize,
    pub digest_path: Option<PathBuf>,
    /// `None` when no digest was written.
    pub notification: Option<NotifyOutcome>,
    pub archived: usize,
}

/// Runs the pipeline once. `now` is taken once by the caller and used for the
/// digest file name, its date label and the retention cutoff.
pub async fn run(
    config: &AppConfig,
    reader: &dyn FeedReader,
    backend: &dyn LlmBackend,
    now: DateTime<Local>,
) -> Result<RunSummary> {
    let seen = SeenSet::load(&config.seen_file)?;
    let seen_before = seen.len();

    let options = FetchOptions {
        max_per_source: config.max_articles_per_source,
        native_language: &config.native_language,
        classifier: &config.classifier,
    };
    let outcome = fetch_articles(reader, &config.sources, seen, &options).await;

    // persisted before anything downstream can fail
    outcome.seen.save(&config.seen_file)?;
    info!(
        "Fetched {} new articles; seen-set grew from {} to {}",
        outcome.articles.len(),
        seen_before,
        outcome.seen.len()
    );

    let mut summary = RunSummary {
        articles: outcome.articles.len(),
        ..RunSummary::default()
    };

    if outcome.articles.is_empty() {
        info!("No new articles, skipping digest and notification");
    } else {
        let mut articles = outcome.articles;
        summarize_all(backend, &mut articles, &config.summary).await;

        let date_label = now.format("%Y-%m-%d").to_string();
        let html = render_digest(&articles, &date_label);
        let path = write_digest(&config.output_dir, now.naive_local(), &html)?;

        summary.notification = Some(send_digest(config.notifier.as_ref(), &path, &articles, &date_label).await);
        summary.digest_path = Some(path);
    }

    summary.archived = match cleanup_old_digests(&config.output_dir, config.retention_days, now.naive_local()) {
        Ok(count) => count,
        Err(e) => {
            error!("Archive cleanup failed: {:#}", e);
            0
        }
    };

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmProvider, LlmSettings};
    use crate::relevance::RelevanceClassifier;
    use crate::rss::{FeedEntry, Source};
    use crate::summarizer::SummarySettings;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use std::path::Path;

    struct FixedReader;

    #[async_trait]
    impl FeedReader for FixedReader {
        async fn read_entries(&self, source: &Source) -> Result<Vec<FeedEntry>> {
            if source.name == "Broken" {
                return Err(anyhow!("HTTP 503"));
            }
            Ok(vec![
                FeedEntry {
                    url: format!("{}/1", source.url),
                    title: "Central bank holds interest rates".to_string(),
                    ..FeedEntry::default()
                },
                FeedEntry {
                    url: format!("{}/2", source.url),
                    title: "Celebrity wedding photos".to_string(),
                    ..FeedEntry::default()
                },
            ])
        }
    }

    struct GarbageBackend;

    #[async_trait]
    impl LlmBackend for GarbageBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("not json".to_string())
        }
    }

    fn config(root: &Path) -> AppConfig {
        AppConfig {
            sources: vec![
                Source::new("Local", "https://local.example", "ja", "Domestic"),
                Source::new("Broken", "https://broken.example", "en", "Global"),
                Source::new("Wire", "https://wire.example", "en", "Global"),
            ],
            classifier: RelevanceClassifier::default(),
            llm: LlmSettings {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                ollama_host: "http://localhost".to_string(),
                ollama_port: 11434,
                model: "test".to_string(),
                temperature: 0.0,
                timeout: std::time::Duration::from_secs(1),
            },
            summary: SummarySettings {
                summary_max_chars: 150,
                excerpt_max_chars: 1000,
                summary_language: "Japanese".to_string(),
            },
            max_articles_per_source: 5,
            feed_timeout: std::time::Duration::from_secs(1),
            native_language: "ja".to_string(),
            output_dir: root.join("output"),
            seen_file: root.join("data").join("posted.json"),
            retention_days: 7,
            notifier: None,
        }
    }

    #[tokio::test]
    async fn test_full_run_then_idempotent_rerun() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        let now = Local.with_ymd_and_hms(2025, 1, 20, 8, 30, 0).unwrap();

        // a stale digest from a previous run
        fs::create_dir_all(&config.output_dir).unwrap();
        let stale = config.output_dir.join("20250101_0800_news.html");
        fs::write(&stale, "old").unwrap();

        let first = run(&config, &FixedReader, &GarbageBackend, now).await.unwrap();
        // both native entries plus the one relevant foreign entry
        assert_eq!(first.articles, 3);
        assert_eq!(first.archived, 1);
        assert_eq!(first.notification, Some(NotifyOutcome::Skipped));
        assert!(!stale.exists());

        let path = first.digest_path.unwrap();
        assert_eq!(path.file_name().unwrap(), "20250120_0830_news.html");
        let html = fs::read_to_string(&path).unwrap();
        // malformed model output falls back to the title
        assert!(html.contains("Central bank holds interest rates"));

        let seen = SeenSet::load(&config.seen_file).unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.contains("https://wire.example/2"));

        let later = now + Duration::minutes(5);
        let second = run(&config, &FixedReader, &GarbageBackend, later).await.unwrap();
        assert_eq!(second.articles, 0);
        assert!(second.digest_path.is_none());
        assert!(second.notification.is_none());
        assert_eq!(SeenSet::load(&config.seen_file).unwrap(), seen);
    }
}
