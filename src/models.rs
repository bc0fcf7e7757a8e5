//! Data models shared by the extraction pipeline, the search client and the
//! analysis pipeline.
//!
//! - [`FetchResult`]: raw bytes of one article page as delivered by the fetcher
//! - [`Extraction`] / [`ExtractionOutcome`]: what the extractor made of a page
//! - [`BatchMapping`]: URL → extracted text for a whole batch
//! - [`NewsItem`]: one search hit
//! - [`AnalyzedNewsItem`] / [`NewsDigest`]: LLM-processed output

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from article URL to extracted text.
///
/// Every URL handed to the batch orchestrator appears exactly once as a key.
/// Failed extractions map to an empty string.
pub type BatchMapping = HashMap<String, String>;

/// A fetched article page, before decoding.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested.
    pub url: String,
    /// The undecoded response body.
    pub raw_bytes: Vec<u8>,
    /// Value of the `Content-Type` response header, or empty if absent.
    pub content_type: String,
}

/// Result of running the locator over one document.
///
/// The empty-string convention only appears at the batch boundary; inside the
/// pipeline a miss is an explicit variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found {
        text: String,
        strategy: String,
    },
    NotFound {
        /// Failure label; distinct from every success label.
        strategy: String,
        /// Length in characters of the best text any strategy produced.
        best_len: usize,
    },
}

impl Extraction {
    pub fn strategy(&self) -> &str {
        match self {
            Extraction::Found { strategy, .. } | Extraction::NotFound { strategy, .. } => strategy,
        }
    }

    /// Collapse to the external contract: text, or `""` on a miss.
    pub fn into_text(self) -> String {
        match self {
            Extraction::Found { text, .. } => text,
            Extraction::NotFound { .. } => String::new(),
        }
    }
}

/// Per-URL outcome of the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub url: String,
    /// Cleaned article text; empty means nothing usable was found.
    pub text: String,
    /// Diagnostic label naming the strategy that produced (or last tried) the text.
    pub matched_strategy: String,
}

/// A single news search hit, with HTML markup stripped from title and description.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Publisher's own URL for the article.
    #[serde(default)]
    pub originallink: String,
    /// Aggregator URL for the article.
    pub link: String,
    /// RFC 2822 publication date as returned by the search API.
    pub pubDate: String,
}

impl NewsItem {
    /// URL to crawl for the article body: the publisher link when present.
    pub fn article_url(&self) -> &str {
        if self.originallink.trim().is_empty() {
            &self.link
        } else {
            &self.originallink
        }
    }
}

/// Tone of an article as judged by the LLM.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Sentiment {
    /// `positive`, `neutral` or `negative`.
    pub sentiment: String,
    /// Confidence in `0.0..=1.0`.
    pub score: f64,
}

/// A search hit enriched with the extracted body and LLM output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzedNewsItem {
    #[serde(flatten)]
    pub item: NewsItem,
    /// Publication date rendered for Korean readers.
    pub published: String,
    /// Extracted article body; empty when the page could not be extracted.
    pub content: String,
    pub summary: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub keywords: Vec<String>,
}

/// All analyzed items produced for one query run.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewsDigest {
    pub query: String,
    /// Date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    pub local_time: String,
    pub items: Vec<AnalyzedNewsItem>,
}
