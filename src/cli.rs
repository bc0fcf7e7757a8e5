//! Command-line interface definitions for News Digest.
//!
//! All credentials can come from flags or environment variables; `.env` and
//! `.env.dev` are loaded into the environment before parsing.

use crate::search::{Category, DEFAULT_DISPLAY, SortOrder};
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Latest economy headlines with article bodies
/// news_digest news --category economy -j ./json
///
/// # Summaries, sentiment and keywords for a free-form query
/// news_digest analyze --query "금리 인상" -j ./json -m ./markdown
///
/// # Just extract article text from URLs
/// news_digest extract https://www.yna.co.kr/view/AKR20240105000100001
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search news and attach extracted article bodies
    News(NewsArgs),

    /// Search news, extract bodies and run LLM summary, sentiment and keywords
    Analyze(AnalyzeArgs),

    /// Extract article text from the given URLs and print URL → text as JSON
    Extract(ExtractArgs),
}

/// What to search for and where to write the result.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Preset topic
    #[arg(long, value_enum, default_value_t = Category::Economy, conflicts_with = "query")]
    pub category: Category,

    /// Free-form search query (overrides --category)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Number of results to request (1-100)
    #[arg(short, long, default_value_t = DEFAULT_DISPLAY, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub display: u32,

    /// Result ordering
    #[arg(long, value_enum, default_value_t = SortOrder::Sim)]
    pub sort: SortOrder,

    /// Output directory for the JSON file
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown file
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Per-article fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Naver search API client id
    #[arg(long, env = "NAVER_CLIENT_ID", hide_env_values = true)]
    pub naver_client_id: Option<String>,

    /// Naver search API client secret
    #[arg(long, env = "NAVER_CLIENT_SECRET", hide_env_values = true)]
    pub naver_client_secret: Option<String>,
}

impl SearchArgs {
    /// The query actually sent to the search API.
    pub fn effective_query(&self) -> String {
        match &self.query {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => self.category.query().to_string(),
        }
    }
}

#[derive(Args, Debug)]
pub struct NewsArgs {
    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = crate::llm::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Chat model used for all LLM calls
    #[arg(long, env = "OPENAI_MODEL", default_value = crate::llm::DEFAULT_MODEL)]
    pub openai_model: String,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Article URLs to extract
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Per-article fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}
