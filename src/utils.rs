//! Utility functions for string handling, date formatting and file system checks.
//!
//! - String truncation and slugification for logging and file names
//! - Korean rendering of search-API publication dates
//! - File system validation for output directories

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

const WEEKDAYS_KO: [&str; 7] = ["일", "월", "화", "수", "목", "금", "토"];

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the characters left out.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"가".repeat(15), 10), "가가가가가가가가가가…(+5 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Convert a query or title to a file-name friendly slug.
///
/// Lowercases, drops punctuation, and joins words with hyphens. Hangul is
/// alphanumeric and is kept.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("부동산 대책!"), "부동산-대책");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Render an RFC 2822 date like `Fri, 05 Jan 2024 09:30:00 +0900` as
/// `2024년 1월 5일 (금) 09:30`, in the date's own offset.
///
/// Unparseable input is returned unchanged.
pub fn format_korean_date(date: &str) -> String {
    match DateTime::parse_from_rfc2822(date.trim()) {
        Ok(dt) => render_korean(&dt),
        Err(_) => date.to_string(),
    }
}

fn render_korean(dt: &DateTime<FixedOffset>) -> String {
    let weekday = WEEKDAYS_KO[dt.weekday().num_days_from_sunday() as usize];
    format!(
        "{}년 {}월 {}일 ({}) {:02}:{:02}",
        dt.year(),
        dt.month(),
        dt.day(),
        weekday,
        dt.hour(),
        dt.minute()
    )
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
