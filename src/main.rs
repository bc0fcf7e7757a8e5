//! # News Digest
//!
//! Korean news collection and digest pipeline: searches the Naver news API,
//! extracts clean article text from the publishers' pages and, on request,
//! runs each article through an LLM for a summary, a sentiment score and
//! keywords.
//!
//! ## Usage
//!
//! ```sh
//! news_digest news --category estate -j ./json
//! news_digest analyze --query "금리" -j ./json -m ./markdown
//! news_digest extract https://www.hankyung.com/article/2024010512345
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: query the news search API for article links
//! 2. **Extraction**: fetch every link concurrently; decode, strip boilerplate,
//!    locate the article body with site rules and generic fallbacks, clean the text
//! 3. **Analysis**: summary, sentiment and keywords per article (a few at a time)
//! 4. **Output**: JSON digest and optional Markdown report

use clap::Parser;
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod batch;
mod cli;
mod extract;
mod fetcher;
mod llm;
mod models;
mod outputs;
mod search;
mod utils;

use analysis::{AnalysisError, analyze, attach_bodies, build_digest};
use batch::BatchOrchestrator;
use cli::{AnalyzeArgs, Cli, Command, ExtractArgs, SearchArgs};
use fetcher::{FetchConfig, HttpFetcher};
use llm::{OpenAiClient, Summarizer, with_backoff};
use models::NewsDigest;
use outputs::{json, markdown};
use search::NaverSearchClient;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // First file wins; neither is required. Loaded before tracing so RUST_LOG may come from them.
    let env_files: Vec<_> = [".env", ".env.dev"]
        .into_iter()
        .filter_map(|f| dotenvy::from_filename(f).ok())
        .collect();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    for path in &env_files {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let start_time = std::time::Instant::now();
    let cli = Cli::parse();
    debug!(?cli.command, "Parsed CLI arguments");

    let result = match cli.command {
        Command::News(args) => run_news(args.search).await,
        Command::Analyze(args) => run_analyze(args).await,
        Command::Extract(args) => run_extract(args).await,
    };

    match &result {
        Ok(()) => info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Done"),
        Err(e) => error!(error = %e, "Run failed"),
    }
    result
}

fn orchestrator(timeout_secs: u64) -> Result<BatchOrchestrator<HttpFetcher>, Box<dyn Error>> {
    let config = FetchConfig {
        timeout: Duration::from_secs(timeout_secs),
        ..FetchConfig::default()
    };
    let fetcher = HttpFetcher::new(&config)?;
    // Small grace period over the client timeout so reqwest reports the timeout itself.
    Ok(BatchOrchestrator::new(fetcher).with_timeout(config.timeout + Duration::from_secs(1)))
}

/// Fail before any network work if an output directory is unusable.
async fn check_output_dirs(args: &SearchArgs) -> Result<(), Box<dyn Error>> {
    for dir in [&args.json_output_dir, &args.markdown_output_dir].into_iter().flatten() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_news(args: SearchArgs) -> Result<(), Box<dyn Error>> {
    check_output_dirs(&args).await?;
    let search = NaverSearchClient::new(args.naver_client_id.clone(), args.naver_client_secret.clone())?;
    let batch = orchestrator(args.timeout_secs)?;

    let query = args.effective_query();
    let items = search.search(&query, args.display, args.sort).await?;
    let articles = attach_bodies(items, &batch).await;

    write_outputs(&build_digest(&query, articles), &args).await
}

#[instrument(level = "info", skip_all)]
async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    check_output_dirs(&args.search).await?;
    let search = NaverSearchClient::new(
        args.search.naver_client_id.clone(),
        args.search.naver_client_secret.clone(),
    )?;
    let llm_client = OpenAiClient::new(args.openai_api_key.clone())?.with_base_url(&args.openai_base_url);
    let summarizer = Summarizer::new(with_backoff(llm_client), &args.openai_model);
    let batch = orchestrator(args.search.timeout_secs)?;
    info!(model = %args.openai_model, base_url = %args.openai_base_url, "LLM configured");

    let query = args.search.effective_query();
    let items = search
        .search(&query, args.search.display, args.search.sort)
        .await
        .map_err(AnalysisError::from)?;

    let analyzed = match analyze(items, &batch, &summarizer).await {
        Ok(analyzed) => analyzed,
        Err(e @ AnalysisError::QuotaExhausted(_)) => {
            eprintln!("LLM 사용 한도를 초과했습니다. 요금제와 결제 정보를 확인하세요.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    write_outputs(&build_digest(&query, analyzed), &args.search).await
}

#[instrument(level = "info", skip_all, fields(count = args.urls.len()))]
async fn run_extract(args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let batch = orchestrator(args.timeout_secs)?;
    let mapping = batch.fetch_many(args.urls).await;

    let sorted: BTreeMap<_, _> = mapping.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);
    Ok(())
}

/// Write the digest to the configured directories, or to stdout when none is set.
async fn write_outputs(digest: &NewsDigest, args: &SearchArgs) -> Result<(), Box<dyn Error>> {
    if args.json_output_dir.is_none() && args.markdown_output_dir.is_none() {
        println!("{}", serde_json::to_string_pretty(digest)?);
        return Ok(());
    }

    if let Some(dir) = &args.json_output_dir {
        json::write_digest(digest, dir).await?;
    }
    if let Some(dir) = &args.markdown_output_dir {
        markdown::write_markdown(digest, dir).await?;
    }
    Ok(())
}
