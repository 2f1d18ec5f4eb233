//! Email delivery of the digest through the Resend HTTP API.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use html_escape::{encode_double_quoted_attribute, encode_text};
use reqwest::Client;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::article::Article;
use crate::config::{NotifierConfig, NotifyMode};
use crate::digest::TOP_COUNT;
use crate::TARGET_NOTIFY;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub fn email_subject(date_label: &str, article_count: usize) -> String {
    format!("World Business & Economy News - {} ({} articles)", date_label, article_count)
}

/// Short HTML body used when the digest travels as an attachment.
fn preview_html(articles: &[Article], date_label: &str, filename: &str) -> String {
    let items = articles
        .iter()
        .take(TOP_COUNT)
        .map(|a| {
            format!(
                r#"<li><a href="{url}">{summary}</a><br><small>{source}: {title}</small></li>"#,
                url = encode_double_quoted_attribute(&a.url),
                summary = encode_text(a.display_summary()),
                source = encode_text(&a.source),
                title = encode_text(&a.title)
            )
        })
        .collect::<String>();

    format!(
        r#"<h2>World Business &amp; Economy News - {date}</h2>
<p>{count} new articles. Top stories:</p>
<ol>{items}</ol>
<p>The full digest is attached as {filename}.</p>"#,
        date = encode_text(date_label),
        count = articles.len(),
        items = items,
        filename = encode_text(filename)
    )
}

/// Builds the Resend request body for either delivery mode.
pub fn build_email_payload(
    config: &NotifierConfig,
    digest_html: &str,
    digest_filename: &str,
    articles: &[Article],
    date_label: &str,
) -> Value {
    let subject = email_subject(date_label, articles.len());

    match config.mode {
        NotifyMode::Inline => json!({
            "from": config.from_email,
            "to": [config.to_email],
            "subject": subject,
            "html": digest_html,
        }),
        NotifyMode::Attachment => json!({
            "from": config.from_email,
            "to": [config.to_email],
            "subject": subject,
            "html": preview_html(articles, date_label, digest_filename),
            "attachments": [{
                "filename": digest_filename,
                "content": STANDARD.encode(digest_html.as_bytes()),
            }],
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Skipped,
    Sent { id: String },
    Failed,
}

/// Sends the digest. Skipped when unconfigured; failures are logged, never returned as errors.
pub async fn send_digest(
    config: Option<&NotifierConfig>,
    digest_path: &Path,
    articles: &[Article],
    date_label: &str,
) -> NotifyOutcome {
    let Some(config) = config else {
        info!(target: TARGET_NOTIFY, "Email notification not configured, skipping");
        return NotifyOutcome::Skipped;
    };

    match try_send(config, digest_path, articles, date_label).await {
        Ok(id) => {
            info!(target: TARGET_NOTIFY, "Email sent to {} (id: {})", config.to_email, id);
            NotifyOutcome::Sent { id }
        }
        Err(err) => {
            error!(target: TARGET_NOTIFY, "Failed to send email: {:#}", err);
            NotifyOutcome::Failed
        }
    }
}

async fn try_send(
    config: &NotifierConfig,
    digest_path: &Path,
    articles: &[Article],
    date_label: &str,
) -> Result<String> {
    let digest_html = fs::read_to_string(digest_path)
        .with_context(|| format!("Failed to read digest {}", digest_path.display()))?;
    let filename = digest_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "digest.html".to_string());

    let payload = build_email_payload(config, &digest_html, &filename, articles, date_label);

    let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
    let response = client
        .post(RESEND_ENDPOINT)
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!("Resend returned {}: {}", status, error_text));
    }

    let body: Value = response.json().await.unwrap_or_else(|e| {
        warn!(target: TARGET_NOTIFY, "Unreadable Resend response body: {}", e);
        Value::Null
    });
    Ok(body["id"].as_str().unwrap_or("unknown").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Sentiment;

    fn config(mode: NotifyMode) -> NotifierConfig {
        NotifierConfig {
            api_key: "re_test".to_string(),
            from_email: "digest@example.com".to_string(),
            to_email: "me@example.com".to_string(),
            mode,
        }
    }

    fn articles(count: usize) -> Vec<Article> {
        (1..=count)
            .map(|n| Article {
                source: "BBC Business".to_string(),
                category: "World economy".to_string(),
                language: "en".to_string(),
                title: format!("Headline {}", n),
                url: format!("https://example.com/{}", n),
                raw_excerpt: String::new(),
                published: None,
                ai_summary: Some(format!("Summary {}", n)),
                sentiment: Sentiment::Neutral,
                companies: Vec::new(),
                tags: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_inline_payload_embeds_digest() {
        let payload = build_email_payload(
            &config(NotifyMode::Inline),
            "<html>digest</html>",
            "20250106_0905_news.html",
            &articles(4),
            "2025-01-06",
        );
        assert_eq!(payload["html"], "<html>digest</html>");
        assert_eq!(payload["to"], json!(["me@example.com"]));
        assert_eq!(payload["subject"], "World Business & Economy News - 2025-01-06 (4 articles)");
        assert!(payload.get("attachments").is_none());
    }

    #[test]
    fn test_attachment_payload_has_preview_and_file() {
        let payload = build_email_payload(
            &config(NotifyMode::Attachment),
            "<html>digest</html>",
            "20250106_0905_news.html",
            &articles(5),
            "2025-01-06",
        );

        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["filename"], "20250106_0905_news.html");
        let decoded = STANDARD.decode(attachment["content"].as_str().unwrap()).unwrap();
        assert_eq!(decoded, b"<html>digest</html>");

        let html = payload["html"].as_str().unwrap();
        assert!(html.contains("Summary 3"));
        assert!(!html.contains("Summary 4"));
        assert!(html.contains("5 new articles"));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_is_skipped() {
        // no config means the digest is never read, so a missing file is not a failure
        let outcome = send_digest(None, Path::new("/nonexistent/digest.html"), &articles(1), "2025-01-06").await;
        assert_eq!(outcome, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unreadable_digest_fails_without_sending() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = send_digest(
            Some(&config(NotifyMode::Inline)),
            &dir.path().join("missing_news.html"),
            &articles(1),
            "2025-01-06",
        )
        .await;
        assert_eq!(outcome, NotifyOutcome::Failed);
    }
}
