//! Keyword relevance filter for sources outside the native language.
//!
//! Matching is a case-insensitive substring test over title + excerpt.
//! An exclusion hit rejects regardless of inclusion hits.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

const DEFAULT_INCLUDE: &[&str] = &[
    "market",
    "stock",
    "shares",
    "equities",
    "bond",
    "treasury",
    "yield",
    "interest rate",
    "rate cut",
    "rate hike",
    "central bank",
    "federal reserve",
    "fed",
    "ecb",
    "bank of japan",
    "boj",
    "inflation",
    "cpi",
    "gdp",
    "recession",
    "economy",
    "economic",
    "unemployment",
    "payrolls",
    "tariff",
    "trade",
    "currency",
    "dollar",
    "yen",
    "euro",
    "oil",
    "gold",
    "commodit",
    "earnings",
    "profit",
    "revenue",
    "merger",
    "acquisition",
    "ipo",
    "investor",
    "bitcoin",
    "crypto",
];

const DEFAULT_EXCLUDE: &[&str] = &[
    "recipe",
    "cooking",
    "football",
    "soccer",
    "cricket",
    "tennis",
    "golf",
    "celebrity",
    "horoscope",
    "fashion",
    "royal family",
    "gardening",
    "film review",
    "tv review",
    "quiz",
];

/// Optional override file: `{"include": [...], "exclude": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct KeywordFile {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Default for RelevanceClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl RelevanceClassifier {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include: normalize_keywords(include),
            exclude: normalize_keywords(exclude),
        }
    }

    /// Loads keyword lists from a JSON file. A side missing from the file keeps its default list.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword file {}", path.display()))?;
        let parsed: KeywordFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse keyword file {}", path.display()))?;

        let defaults = Self::default();
        Ok(Self::new(
            parsed.include.unwrap_or(defaults.include),
            parsed.exclude.unwrap_or(defaults.exclude),
        ))
    }

    pub fn is_relevant(&self, title: &str, excerpt: &str) -> bool {
        let haystack = format!("{} {}", title, excerpt).to_lowercase();

        if let Some(keyword) = self.exclude.iter().find(|k| haystack.contains(k.as_str())) {
            debug!(target: TARGET_WEB_REQUEST, "Rejected by exclusion keyword {:?}: {}", keyword, title);
            return false;
        }

        self.include.iter().any(|k| haystack.contains(k.as_str()))
    }
}

fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
