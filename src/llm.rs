//! LLM access with exponential backoff.
//!
//! # Architecture
//!
//! - [`AskAsync`]: one chat-completion round trip
//! - [`OpenAiClient`]: OpenAI-compatible HTTP implementation
//! - [`RetryAsk`]: decorator retrying transient failures with backoff and jitter
//! - [`Summarizer`]: the prompts this application sends (summary, sentiment, keywords)
//!
//! # Retry Strategy
//!
//! Rate limits, 5xx responses and network errors are retried up to
//! `max_retries` times with `delay = min(base * 2^(attempt-1), 30s) + jitter`.
//! Quota exhaustion (`insufficient_quota`) is returned immediately: waiting
//! does not refill a quota.

use crate::models::Sentiment;
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Article bodies are cut to this many characters before prompting.
const MAX_BODY_CHARS: usize = 4000;
const SUMMARY_MAX_TOKENS: u32 = 200;
const KEYWORD_COUNT: usize = 5;

/// Leading `1.` / `2)` list numbering some models add to keyword replies.
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s*").unwrap());

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("LLM quota exhausted; check the account's plan and billing: {0}")]
    QuotaExhausted(String),

    #[error("LLM rate limit hit: {0}")]
    RateLimited(String),

    #[error("LLM server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("LLM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("LLM request failed: {0}")]
    Network(String),

    #[error("failed to parse LLM response: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether waiting and trying again can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::Server { .. } | LlmError::Network(_)
        )
    }

    /// Map a non-2xx response to an error kind.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 if is_quota_body(&body) => LlmError::QuotaExhausted(body),
            429 => LlmError::RateLimited(body),
            500..=599 => LlmError::Server { status, body },
            _ => LlmError::Api { status, body },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn is_quota_body(body: &str) -> bool {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => [env.error.code, env.error.kind]
            .iter()
            .flatten()
            .any(|v| v == "insufficient_quota"),
        Err(_) => body.contains("insufficient_quota"),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Trait for async LLM interaction.
///
/// Implementors send one chat request and return the model's reply. The
/// abstraction lets [`RetryAsk`] wrap any backend, including test fakes.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response, LlmError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
    /// Upper bound of the random jitter added to each delay, in milliseconds.
    max_jitter_ms: u64,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = OpenAiClient::new(Some(key))?;
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter_ms = max_jitter.as_millis() as u64;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt - 1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter_ms);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response, LlmError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if !e.is_retryable() => {
                    error!(
                        attempt = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "ask() failed with non-retryable error"
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChoiceRaw>,
}

#[derive(Debug, Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
}

#[derive(Debug, Deserialize)]
struct MessageRaw {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion client.
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client; a missing or blank key is a configuration error.
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        Ok(Self {
            http_client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL (Azure, proxies, local servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl AskAsync for OpenAiClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(model = %request.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "LLM API call failed");
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, chars = content.chars().count(), "LLM call succeeded");
        Ok(content)
    }
}

/// Standard retry policy: 5 retries starting at one second.
pub fn with_backoff<T: AskAsync>(inner: T) -> RetryAsk<T> {
    RetryAsk::new(inner, 5, StdDuration::from_secs(1))
}

/// The prompts sent for each article.
#[derive(Debug)]
pub struct Summarizer<A> {
    ask: A,
    model: String,
}

impl<A> Summarizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(ask: A, model: impl Into<String>) -> Self {
        Self {
            ask,
            model: model.into(),
        }
    }

    /// Three-to-four sentence Korean summary of an article.
    #[instrument(level = "info", skip_all, fields(%title))]
    pub async fn summarize(&self, title: &str, body: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "다음 경제 뉴스를 3~4문장으로 요약해줘.\n제목: {title}\n내용: {}",
            clip(body)
        );
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system("너는 경제 전문 기자야."),
                ChatMessage::user(prompt),
            ],
            max_tokens: Some(SUMMARY_MAX_TOKENS),
        };
        let summary = self.ask.ask(&request).await?;
        Ok(summary.trim().to_string())
    }

    /// Tone of an article as `{sentiment, score}`.
    #[instrument(level = "info", skip_all)]
    pub async fn sentiment(&self, body: &str) -> Result<Sentiment, LlmError> {
        let prompt = format!(
            "다음 뉴스 내용의 감정을 분석해.\n결과는 JSON 형태로.\n\
             {{\n  \"sentiment\": \"positive|neutral|negative\",\n  \"score\": number(0~1)\n}}\n뉴스: {}",
            clip(body)
        );
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: None,
        };
        let reply = self.ask.ask(&request).await?;
        parse_sentiment(&reply)
    }

    /// The article's most relevant keywords, best first.
    #[instrument(level = "info", skip_all)]
    pub async fn keywords(&self, body: &str) -> Result<Vec<String>, LlmError> {
        let prompt = format!(
            "뉴스의 핵심 키워드를 관련도 순으로 {KEYWORD_COUNT}개만 쉼표로 구분해서 추출해줘.\n{}",
            clip(body)
        );
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: None,
        };
        let reply = self.ask.ask(&request).await?;
        let keywords = parse_keywords(&reply);
        info!(count = keywords.len(), "Extracted keywords");
        Ok(keywords)
    }
}

fn clip(body: &str) -> String {
    body.chars().take(MAX_BODY_CHARS).collect()
}

/// Parse the sentiment JSON, tolerating a Markdown code fence around it.
pub fn parse_sentiment(reply: &str) -> Result<Sentiment, LlmError> {
    let json = strip_code_fence(reply);
    let mut sentiment: Sentiment =
        serde_json::from_str(json).map_err(|e| LlmError::Parse(e.to_string()))?;
    sentiment.sentiment = sentiment.sentiment.trim().to_lowercase();
    sentiment.score = sentiment.score.clamp(0.0, 1.0);
    Ok(sentiment)
}

/// Split a comma separated keyword reply into distinct, non-empty keywords.
pub fn parse_keywords(reply: &str) -> Vec<String> {
    reply
        .split([',', '\n'])
        .map(|s| LIST_MARKER_RE.replace(s.trim(), "").trim().to_string())
        .filter(|s| !s.is_empty())
        .unique()
        .take(KEYWORD_COUNT)
        .collect()
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays scripted replies and records every request.
    #[derive(Debug, Default)]
    struct ScriptedAsk {
        replies: RefCell<VecDeque<Result<String, LlmError>>>,
        calls: Cell<usize>,
        last_request: RefCell<Option<ChatRequest>>,
    }

    impl ScriptedAsk {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                ..Self::default()
            }
        }
    }

    impl AskAsync for ScriptedAsk {
        type Response = String;

        async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_request.borrow_mut() = Some(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Network("script exhausted".to_string())))
        }
    }

    fn fast_retry(inner: ScriptedAsk, max_retries: usize) -> RetryAsk<ScriptedAsk> {
        RetryAsk::new(inner, max_retries, StdDuration::from_millis(1)).with_max_jitter(StdDuration::ZERO)
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_retries_rate_limits_then_succeeds() {
        let api = fast_retry(
            ScriptedAsk::new(vec![
                Err(LlmError::RateLimited("slow down".to_string())),
                Err(LlmError::Server { status: 503, body: String::new() }),
                Ok("done".to_string()),
            ]),
            5,
        );
        assert_eq!(api.ask(&request()).await.unwrap(), "done");
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_not_retried() {
        let api = fast_retry(
            ScriptedAsk::new(vec![
                Err(LlmError::QuotaExhausted("insufficient_quota".to_string())),
                Ok("never".to_string()),
            ]),
            5,
        );
        let err = api.ask(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::QuotaExhausted(_)));
        assert_eq!(api.inner.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let replies = (0..10)
            .map(|_| Err(LlmError::RateLimited("busy".to_string())))
            .collect();
        let api = fast_retry(ScriptedAsk::new(replies), 2);
        let err = api.ask(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited(_)));
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let api = RetryAsk::new(ScriptedAsk::default(), 10, StdDuration::from_secs(1))
            .with_max_jitter(StdDuration::ZERO);
        assert_eq!(api.backoff(1), StdDuration::from_secs(1));
        assert_eq!(api.backoff(3), StdDuration::from_secs(4));
        assert_eq!(api.backoff(9), StdDuration::from_secs(30));
    }

    #[test]
    fn test_status_classification() {
        let quota = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        assert!(matches!(LlmError::from_status(429, quota.to_string()), LlmError::QuotaExhausted(_)));
        let limit = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert!(matches!(LlmError::from_status(429, limit.to_string()), LlmError::RateLimited(_)));
        assert!(LlmError::from_status(502, String::new()).is_retryable());
        assert!(!LlmError::from_status(400, String::new()).is_retryable());
    }

    #[test]
    fn test_missing_api_key_is_a_configuration_error() {
        assert!(matches!(OpenAiClient::new(None), Err(LlmError::MissingApiKey)));
        assert!(matches!(OpenAiClient::new(Some(" ".to_string())), Err(LlmError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_openai_client_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "요약입니다." } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Some("sk-test".to_string()))
            .unwrap()
            .with_base_url(server.uri());
        assert_eq!(client.ask(&request()).await.unwrap(), "요약입니다.");
    }

    #[tokio::test]
    async fn test_openai_client_surfaces_quota_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "quota", "type": "insufficient_quota", "code": "insufficient_quota" }
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Some("sk-test".to_string()))
            .unwrap()
            .with_base_url(server.uri());
        let err = client.ask(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::QuotaExhausted(_)));
    }

    #[tokio::test]
    async fn test_summarize_sends_title_and_body() {
        let summarizer = Summarizer::new(
            ScriptedAsk::new(vec![Ok("  금리가 동결됐다.  ".to_string())]),
            DEFAULT_MODEL,
        );
        let summary = summarizer.summarize("기준금리 동결", "한국은행은 오늘...").await.unwrap();
        assert_eq!(summary, "금리가 동결됐다.");

        let sent = summarizer.ask.last_request.borrow().clone().unwrap();
        assert_eq!(sent.max_tokens, Some(SUMMARY_MAX_TOKENS));
        assert_eq!(sent.messages[0], ChatMessage::system("너는 경제 전문 기자야."));
        assert!(sent.messages[1].content.contains("제목: 기준금리 동결"));
        assert!(sent.messages[1].content.contains("한국은행은 오늘..."));
    }

    #[tokio::test]
    async fn test_sentiment_parses_fenced_json() {
        let summarizer = Summarizer::new(
            ScriptedAsk::new(vec![Ok(
                "```json\n{\"sentiment\": \"Positive\", \"score\": 1.4}\n```".to_string(),
            )]),
            DEFAULT_MODEL,
        );
        let s = summarizer.sentiment("수출이 급증했다.").await.unwrap();
        assert_eq!(s.sentiment, "positive");
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn test_sentiment_rejects_prose() {
        assert!(matches!(parse_sentiment("긍정적입니다"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_keywords_are_split_deduplicated_and_capped() {
        assert_eq!(
            parse_keywords("금리, 물가,환율 , , 금리, 수출, 반도체, 고용"),
            vec!["금리", "물가", "환율", "수출", "반도체"]
        );
        assert_eq!(parse_keywords("1. 금리\n2) 물가"), vec!["금리", "물가"]);
        assert_eq!(parse_keywords("2024년 경제전망"), vec!["2024년 경제전망"]);
    }

    #[test]
    fn test_body_is_clipped() {
        let long = "가".repeat(MAX_BODY_CHARS + 10);
        assert_eq!(clip(&long).chars().count(), MAX_BODY_CHARS);
    }
}
