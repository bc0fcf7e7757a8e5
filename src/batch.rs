//! Concurrent extraction of many article URLs.
//!
//! Every URL gets its own fetch → extract pipeline; all of them run
//! concurrently on the caller's task and the orchestrator waits for every one
//! to settle before building the result. A failure of any kind (network error,
//! timeout, non-2xx status, missing body, even a panic while parsing) is
//! contained to its URL and recorded as an empty string.

use crate::extract::extract_article;
use crate::fetcher::{DEFAULT_TIMEOUT, PageFetcher};
use crate::models::BatchMapping;
use futures::FutureExt;
use futures::future::join_all;
use itertools::Itertools;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Fans URL lists out to a [`PageFetcher`] and the extraction pipeline.
#[derive(Debug)]
pub struct BatchOrchestrator<F> {
    fetcher: F,
    timeout: Duration,
}

impl<F> BatchOrchestrator<F>
where
    F: PageFetcher,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Per-URL deadline enforced on top of whatever the fetcher does.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract every URL concurrently.
    ///
    /// The returned mapping has exactly one key per distinct input URL;
    /// failed URLs map to `""`.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_many<I, S>(&self, urls: I) -> BatchMapping
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let t0 = Instant::now();
        let urls: Vec<String> = urls.into_iter().map(Into::into).unique().collect();
        info!(count = urls.len(), "Starting batch extraction");

        let results = join_all(urls.into_iter().map(|url| async move {
            let text = match AssertUnwindSafe(self.fetch_one(&url)).catch_unwind().await {
                Ok(text) => text,
                Err(_) => {
                    error!(%url, "Extraction panicked; recording empty result");
                    String::new()
                }
            };
            (url, text)
        }))
        .await;

        let mapping: BatchMapping = results.into_iter().collect();
        let extracted = mapping.values().filter(|t| !t.is_empty()).count();
        info!(
            total = mapping.len(),
            extracted,
            failed = mapping.len() - extracted,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Batch extraction complete"
        );
        mapping
    }

    /// Fetch and extract a single URL, collapsing every failure to `""`.
    async fn fetch_one(&self, url: &str) -> String {
        let fetched = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(e)) => {
                warn!(%url, error = %e, "Fetch failed");
                return String::new();
            }
            Err(_) => {
                warn!(%url, timeout_ms = self.timeout.as_millis() as u64, "Fetch timed out");
                return String::new();
            }
        };

        let outcome = extract_article(fetched);
        debug!(
            %url,
            strategy = %outcome.matched_strategy,
            chars = outcome.text.chars().count(),
            "Extracted article"
        );
        outcome.text
    }
}
