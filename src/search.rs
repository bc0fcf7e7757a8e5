//! Naver news search API client.
//!
//! A plain authenticated GET against `openapi.naver.com`. Credentials are
//! checked once, when the client is constructed; a client that exists can
//! always issue requests.

use crate::models::NewsItem;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const NAVER_NEWS_URL: &str = "https://openapi.naver.com/v1/search/news.json";
pub const DEFAULT_DISPLAY: u32 = 10;
const MAX_DISPLAY: u32 = 100;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").unwrap());

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search API credentials are not configured (set NAVER_CLIENT_ID and NAVER_CLIENT_SECRET)")]
    MissingCredentials,

    #[error("search request failed: {0}")]
    Network(String),

    #[error("search API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse search response: {0}")]
    Parse(String),
}

/// Result ordering offered by the search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Relevance.
    Sim,
    /// Newest first.
    Date,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Sim => "sim",
            SortOrder::Date => "date",
        }
    }
}

/// Preset topics with their search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    Economy,
    Estate,
}

impl Category {
    pub fn query(&self) -> &'static str {
        match self {
            Category::Economy => "경제",
            Category::Estate => "부동산",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<NewsItem>,
}

/// Authenticated client for the news search endpoint.
#[derive(Debug, Clone)]
pub struct NaverSearchClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    base_url: String,
}

impl NaverSearchClient {
    /// Build a client; blank or missing credentials are a configuration error.
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Result<Self, SearchError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (present(client_id), present(client_secret)) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                http_client: Client::new(),
                client_id,
                client_secret,
                base_url: NAVER_NEWS_URL.to_string(),
            }),
            _ => Err(SearchError::MissingCredentials),
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Search news for `query`, returning at most `count` items in API order.
    #[instrument(level = "info", skip(self))]
    pub async fn search(
        &self,
        query: &str,
        count: u32,
        sort: SortOrder,
    ) -> Result<Vec<NewsItem>, SearchError> {
        let t0 = Instant::now();
        let url = format!(
            "{}?query={}&display={}&sort={}",
            self.base_url,
            urlencoding::encode(query),
            count.clamp(1, MAX_DISPLAY),
            sort.as_str()
        );
        debug!(%url, "Requesting news search");

        let response = self
            .http_client
            .get(&url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "News search API error");
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let items: Vec<NewsItem> = parsed.items.into_iter().map(clean_item).collect();
        info!(
            count = items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "News search complete"
        );
        Ok(items)
    }
}

fn clean_item(mut item: NewsItem) -> NewsItem {
    item.title = strip_markup(&item.title);
    item.description = strip_markup(&item.description);
    item
}

/// Remove highlight tags (`<b>`) and decode the entities the API emits.
pub fn strip_markup(s: &str) -> String {
    let without_tags = TAG_RE.replace_all(s, "");
    without_tags
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
