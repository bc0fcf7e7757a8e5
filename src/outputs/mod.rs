//! Output generation for analyzed news.
//!
//! - [`json`]: writes a [`crate::models::NewsDigest`] as JSON for API-style consumption
//! - [`markdown`]: renders the digest as a Markdown document for reading
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2024-01-05/
//!     └── 경제.json
//!
//! markdown_output_dir/
//! └── 2024-01-05_경제.md
//! ```

pub mod json;
pub mod markdown;
