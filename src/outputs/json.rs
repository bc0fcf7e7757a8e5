//! JSON output of analyzed news.
//!
//! # Output Structure
//!
//! Files are organized by run date, one file per query:
//! ```text
//! json_output_dir/
//! └── 2024-01-05/
//!     ├── 경제.json
//!     └── 부동산.json
//! ```
//!
//! A later run for the same query on the same day replaces the file.

use crate::models::NewsDigest;
use crate::utils::slugify_title;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the JSON file for `digest` under `json_output_dir`.
pub fn digest_path(digest: &NewsDigest, json_output_dir: &str) -> PathBuf {
    Path::new(json_output_dir)
        .join(&digest.local_date)
        .join(format!("{}.json", slugify_title(&digest.query)))
}

/// Serialize `digest` to its dated JSON file, creating directories as needed.
///
/// # Returns
///
/// The path written, or an error if directory creation or writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, query = %digest.query))]
pub async fn write_digest(
    digest: &NewsDigest,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;
    let path = digest_path(digest, json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), items = digest.items.len(), "Wrote JSON digest");
    Ok(path)
}
