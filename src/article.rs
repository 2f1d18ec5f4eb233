//! The article record that flows through every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl From<&str> for Sentiment {
    /// Unknown labels map to neutral.
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feed entry accepted for this run.
///
/// Identity is `url`. The summary fields start empty and are filled in once by
/// the summarization stage; the record is read-only after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub source: String,
    pub category: String,
    pub language: String,
    pub title: String,
    pub url: String,
    pub raw_excerpt: String,
    pub published: Option<DateTime<Utc>>,
    pub ai_summary: Option<String>,
    pub sentiment: Sentiment,
    pub companies: Vec<String>,
    pub tags: Vec<String>,
}

impl Article {
    /// The text shown as the headline of a card: the AI summary when present, else the title.
    pub fn display_summary(&self) -> &str {
        self.ai_summary.as_deref().unwrap_or(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_parsing() {
        assert_eq!(Sentiment::from("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from(" NEGATIVE "), Sentiment::Negative);
        assert_eq!(Sentiment::from("neutral"), Sentiment::Neutral);
        assert_eq!(Sentiment::from("bullish"), Sentiment::Neutral);
        assert_eq!(Sentiment::default(), Sentiment::Neutral);
    }

    #[test]
    fn test_display_summary_falls_back_to_title() {
        let mut article = Article {
            source: "BBC Business".to_string(),
            category: "World economy".to_string(),
            language: "en".to_string(),
            title: "Oil prices climb".to_string(),
            url: "https://example.com/oil".to_string(),
            raw_excerpt: String::new(),
            published: None,
            ai_summary: None,
            sentiment: Sentiment::Neutral,
            companies: Vec::new(),
            tags: Vec::new(),
        };
        assert_eq!(article.display_summary(), "Oil prices climb");

        article.ai_summary = Some("Brent up 3%".to_string());
        assert_eq!(article.display_summary(), "Brent up 3%");
    }
}
