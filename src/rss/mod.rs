//! RSS feed processing for the digest.
//!
//! This module handles fetching, decoding and parsing feeds, and turning the
//! source registry into the run's list of new articles.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::fetcher::{collect_from_source, fetch_articles, FeedReader, FetchOptions, FetchOutcome, HttpFeedReader};

pub use self::client::*;
pub use self::parser::*;
pub use self::util::*;
