//! Analysis pipeline: search hits → article bodies → LLM enrichment.
//!
//! # Flow
//!
//! 1. Every hit's [`NewsItem::article_url`] goes through one
//!    [`BatchOrchestrator::fetch_many`] call.
//! 2. Hits are enriched with summary, sentiment and keywords, a few at a time,
//!    keeping the search order.
//!
//! A transient LLM failure leaves the affected field empty and the run goes
//! on. Quota exhaustion stops the run: every remaining call would fail the
//! same way.

use crate::batch::BatchOrchestrator;
use crate::fetcher::PageFetcher;
use crate::llm::{AskAsync, LlmError, Summarizer};
use crate::models::{AnalyzedNewsItem, NewsDigest, NewsItem};
use crate::search::SearchError;
use crate::utils::{format_korean_date, truncate_for_log};
use chrono::Local;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// How many articles are sent to the LLM at the same time.
pub const LLM_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("LLM quota exhausted, aborting analysis: {0}")]
    QuotaExhausted(String),
}

/// Pair every hit with its extracted body and a readable publication date.
///
/// Hits whose page could not be extracted get an empty `content`.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn attach_bodies<F: PageFetcher>(
    items: Vec<NewsItem>,
    batch: &BatchOrchestrator<F>,
) -> Vec<AnalyzedNewsItem> {
    let mapping = batch
        .fetch_many(items.iter().map(|it| it.article_url().to_string()))
        .await;

    items
        .into_iter()
        .map(|item| {
            let content = mapping.get(item.article_url()).cloned().unwrap_or_default();
            AnalyzedNewsItem {
                published: format_korean_date(&item.pubDate),
                content,
                summary: None,
                sentiment: None,
                keywords: Vec::new(),
                item,
            }
        })
        .collect()
}

/// Extract and enrich every hit, preserving input order.
///
/// # Errors
///
/// [`AnalysisError::QuotaExhausted`] as soon as any LLM call reports an
/// exhausted quota. Other LLM failures are logged and leave the field unset.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn analyze<F, A>(
    items: Vec<NewsItem>,
    batch: &BatchOrchestrator<F>,
    summarizer: &Summarizer<A>,
) -> Result<Vec<AnalyzedNewsItem>, AnalysisError>
where
    F: PageFetcher,
    A: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let articles = attach_bodies(items, batch).await;
    let total = articles.len();

    let analyzed = stream::iter(articles.into_iter().enumerate())
        .map(|(index, article)| enrich(index, article, summarizer))
        .buffered(LLM_CONCURRENCY)
        .try_collect::<Vec<_>>()
        .await
        .inspect_err(|e| error!(error = %e, "Aborting analysis"))?;

    let summarized = analyzed.iter().filter(|a| a.summary.is_some()).count();
    info!(
        total,
        summarized,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Analysis complete"
    );
    Ok(analyzed)
}

/// Run the three LLM operations for one article.
///
/// Only quota exhaustion is returned as an error.
async fn enrich<A>(
    index: usize,
    mut article: AnalyzedNewsItem,
    summarizer: &Summarizer<A>,
) -> Result<AnalyzedNewsItem, AnalysisError>
where
    A: AskAsync<Response = String>,
{
    let has_body = !article.content.is_empty();
    let source = if has_body {
        article.content.clone()
    } else {
        article.item.description.clone()
    };

    if source.trim().is_empty() {
        warn!(index, url = %article.item.article_url(), "No body or description; skipping LLM");
        return Ok(article);
    }
    if !has_body {
        debug!(index, "Empty body; summarizing search description");
    }

    article.summary = tolerate(index, "summary", summarizer.summarize(&article.item.title, &source).await)?;

    if has_body {
        article.sentiment = tolerate(index, "sentiment", summarizer.sentiment(&source).await)?;
        article.keywords = tolerate(index, "keywords", summarizer.keywords(&source).await)?
            .unwrap_or_default();
    }

    debug!(
        index,
        summary = %truncate_for_log(article.summary.as_deref().unwrap_or(""), 80),
        "Enriched article"
    );
    Ok(article)
}

/// Keep going on transient failures; only quota exhaustion propagates.
fn tolerate<T>(
    index: usize,
    op: &str,
    result: Result<T, LlmError>,
) -> Result<Option<T>, AnalysisError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(LlmError::QuotaExhausted(body)) => Err(AnalysisError::QuotaExhausted(body)),
        Err(e) => {
            warn!(index, op, error = %e, "LLM call failed; leaving field empty");
            Ok(None)
        }
    }
}

/// Stamp analyzed items with the query and the local run date/time.
pub fn build_digest(query: &str, items: Vec<AnalyzedNewsItem>) -> NewsDigest {
    let now = Local::now();
    NewsDigest {
        query: query.to_string(),
        local_date: now.date_naive().to_string(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        items,
    }
}
