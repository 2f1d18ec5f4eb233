//! Type definitions for the RSS module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub language: String,
    pub category: String,
}

impl Source {
    pub fn new(name: &str, url: &str, language: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            language: language.to_string(),
            category: category.to_string(),
        }
    }
}

/// A feed entry after normalization, in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub published: Option<DateTime<Utc>>,
}

pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
