//! Per-article structured summarization with a defensive fallback.
//!
//! Every article gets exactly one request. Whatever goes wrong (transport
//! error, timeout, unparseable output) the article still leaves this stage
//! with a usable summary, so one bad response never blocks the rest.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::article::{Article, Sentiment};
use crate::llm::LlmBackend;
use crate::prompt::article_summary_prompt;
use crate::rss::truncate_chars;
use crate::TARGET_LLM_REQUEST;

pub const TAG_VOCABULARY: &[&str] = &[
    "monetary-policy",
    "rates",
    "fx",
    "equities",
    "bonds",
    "commodities",
    "earnings",
    "m&a",
    "macro",
    "geopolitics",
    "regulation",
    "technology",
    "crypto",
];

#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub summary_max_chars: usize,
    pub excerpt_max_chars: usize,
    pub summary_language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub summary: String,
    pub sentiment: Sentiment,
    pub companies: Vec<String>,
    pub tags: Vec<String>,
}

impl SummaryResult {
    /// Title as summary, neutral, no companies or tags.
    pub fn fallback(title: &str, summary_max_chars: usize) -> Self {
        Self {
            summary: truncate_chars(title.trim(), summary_max_chars),
            sentiment: Sentiment::Neutral,
            companies: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSummary {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    companies: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Finds the JSON object in a model response, tolerating code fences and surrounding prose.
fn extract_json_payload(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest
                .strip_prefix("json")
                .or_else(|| rest.strip_prefix("JSON"))
                .unwrap_or(rest);
            let rest = rest.trim_end();
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}

/// Parses and validates a model response.
///
/// An empty summary is replaced by the truncated title. Sentiment outside the
/// known labels becomes neutral and tags outside `TAG_VOCABULARY` are dropped.
pub fn parse_summary_response(response: &str, title: &str, summary_max_chars: usize) -> Result<SummaryResult> {
    let payload =
        extract_json_payload(response).ok_or_else(|| anyhow!("No JSON object found in response"))?;
    let raw: RawSummary = serde_json::from_str(payload)?;

    let summary = raw
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(&s, summary_max_chars))
        .unwrap_or_else(|| truncate_chars(title.trim(), summary_max_chars));

    let sentiment = raw
        .sentiment
        .as_deref()
        .map(Sentiment::from)
        .unwrap_or_default();

    let mut companies: Vec<String> = Vec::new();
    for company in raw.companies {
        let company = company.trim();
        if !company.is_empty() && !companies.iter().any(|c| c == company) {
            companies.push(company.to_string());
        }
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.tags {
        let tag = tag.trim().to_lowercase();
        if TAG_VOCABULARY.contains(&tag.as_str()) && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Ok(SummaryResult {
        summary,
        sentiment,
        companies,
        tags,
    })
}

/// Summarizes one article in place. Never fails.
pub async fn summarize_article(backend: &dyn LlmBackend, article: &mut Article, settings: &SummarySettings) {
    let excerpt = truncate_chars(&article.raw_excerpt, settings.excerpt_max_chars);
    let prompt = article_summary_prompt(
        &article.source,
        &article.title,
        &excerpt,
        settings.summary_max_chars,
        &settings.summary_language,
        TAG_VOCABULARY,
    );

    let result = match backend.complete(&prompt).await {
        Ok(response) => match parse_summary_response(&response, &article.title, settings.summary_max_chars) {
            Ok(result) => result,
            Err(e) => {
                warn!(target: TARGET_LLM_REQUEST, "Unparseable summary for {}: {:#}", article.url, e);
                SummaryResult::fallback(&article.title, settings.summary_max_chars)
            }
        },
        Err(e) => {
            warn!(target: TARGET_LLM_REQUEST, "Summarization failed for {}: {:#}", article.url, e);
            SummaryResult::fallback(&article.title, settings.summary_max_chars)
        }
    };

    article.ai_summary = Some(result.summary);
    article.sentiment = result.sentiment;
    article.companies = result.companies;
    article.tags = result.tags;
}

/// Summarizes every article sequentially, in list order.
pub async fn summarize_all(backend: &dyn LlmBackend, articles: &mut [Article], settings: &SummarySettings) {
    let total = articles.len();
    for (i, article) in articles.iter_mut().enumerate() {
        info!(
            target: TARGET_LLM_REQUEST,
            "[{}/{}] {}: {}",
            i + 1,
            total,
            article.source,
            truncate_chars(&article.title, 40)
        );
        summarize_article(backend, article, settings).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedBackend {
        responses: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow!("no scripted response")))
        }
    }

    fn settings() -> SummarySettings {
        SummarySettings {
            summary_max_chars: 150,
            excerpt_max_chars: 20,
            summary_language: "Japanese".to_string(),
        }
    }

    fn article(title: &str) -> Article {
        Article {
            source: "BBC Business".to_string(),
            category: "World economy".to_string(),
            language: "en".to_string(),
            title: title.to_string(),
            url: format!("https://example.com/{}", title.len()),
            raw_excerpt: "x".repeat(100),
            published: None,
            ai_summary: None,
            sentiment: Sentiment::Neutral,
            companies: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let response = r#"{"summary": "FRBが利上げ", "sentiment": "Negative", "companies": [" Apple ", "", "Apple", "Toyota"], "tags": ["Rates", "macro", "sports", "rates"]}"#;
        let result = parse_summary_response(response, "Fed raises rates", 150).unwrap();
        assert_eq!(result.summary, "FRBが利上げ");
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.companies, vec!["Apple", "Toyota"]);
        assert_eq!(result.tags, vec!["rates", "macro"]);
    }

    #[test]
    fn test_parse_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"summary\": \"円安が進行\", \"sentiment\": \"positive\"}\n```";
        let result = parse_summary_response(fenced, "Yen slides", 150).unwrap();
        assert_eq!(result.summary, "円安が進行");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert!(result.companies.is_empty());

        let wrapped = "Here is the result:\n{\"summary\": \"原油高\", \"sentiment\": \"unclear\"}\nThanks";
        let result = parse_summary_response(wrapped, "Oil climbs", 150).unwrap();
        assert_eq!(result.summary, "原油高");
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_parse_truncates_and_falls_back_to_title() {
        let result = parse_summary_response(r#"{"summary": "abcdefghij"}"#, "Title", 4).unwrap();
        assert_eq!(result.summary, "abcd");

        let result = parse_summary_response(r#"{"summary": "   ", "sentiment": "positive"}"#, "Title", 150).unwrap();
        assert_eq!(result.summary, "Title");
        assert_eq!(result.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_summary_response("I cannot help with that.", "Title", 150).is_err());
        assert!(parse_summary_response("{\"summary\": }", "Title", 150).is_err());
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let backend = ScriptedBackend::new(vec![Ok("Sure! The article says rates went up.".to_string())]);
        let mut item = article("Fed raises interest rates");

        summarize_article(&backend, &mut item, &settings()).await;

        assert_eq!(item.ai_summary.as_deref(), Some("Fed raises interest rates"));
        assert_eq!(item.sentiment, Sentiment::Neutral);
        assert!(item.companies.is_empty());
        assert!(item.tags.is_empty());
    }

    #[tokio::test]
    async fn test_each_article_summarized_once_and_errors_isolated() {
        let backend = ScriptedBackend::new(vec![
            Err(anyhow!("LLM request timed out after 60 seconds")),
            Ok(r#"{"summary": "トヨタ増益", "sentiment": "positive", "companies": ["Toyota"], "tags": ["earnings"]}"#
                .to_string()),
        ]);
        let mut articles = vec![article("Timeout article"), article("Toyota profit rises")];

        summarize_all(&backend, &mut articles, &settings()).await;

        assert_eq!(articles[0].ai_summary.as_deref(), Some("Timeout article"));
        assert_eq!(articles[0].sentiment, Sentiment::Neutral);
        assert_eq!(articles[1].ai_summary.as_deref(), Some("トヨタ増益"));
        assert_eq!(articles[1].sentiment, Sentiment::Positive);
        assert_eq!(articles[1].companies, vec!["Toyota"]);
        assert_eq!(articles[1].tags, vec!["earnings"]);

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        // the excerpt sent to the model is bounded
        assert!(prompts[0].contains(&format!("Body: {}\n", "x".repeat(20))));
        assert!(!prompts[0].contains(&"x".repeat(21)));
    }
}
