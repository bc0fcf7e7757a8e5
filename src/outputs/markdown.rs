//! Markdown rendering of analyzed news for reading.

use crate::models::{AnalyzedNewsItem, NewsDigest};
use crate::utils::slugify_title;
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Render the whole digest as one Markdown document.
pub fn digest_to_markdown(digest: &NewsDigest) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {} 뉴스 ({} {})\n", digest.query, digest.local_date, digest.local_time);

    if digest.items.is_empty() {
        md.push_str("_검색 결과가 없습니다._\n");
        return md;
    }

    for item in &digest.items {
        write_item(&mut md, item);
    }
    md
}

fn write_item(md: &mut String, analyzed: &AnalyzedNewsItem) {
    let item = &analyzed.item;
    let _ = writeln!(md, "## [{}]({})\n", item.title, item.article_url());
    let _ = writeln!(md, "<small>{}</small>\n", analyzed.published);

    match &analyzed.summary {
        Some(summary) => {
            let _ = writeln!(md, "{summary}\n");
        }
        None if !item.description.is_empty() => {
            let _ = writeln!(md, "> {}\n", item.description);
        }
        None => {}
    }

    if let Some(s) = &analyzed.sentiment {
        let _ = writeln!(md, "- **논조**: {} ({:.2})", s.sentiment, s.score);
    }
    if !analyzed.keywords.is_empty() {
        let tags = analyzed
            .keywords
            .iter()
            .map(|k| format!("`{k}`"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(md, "- **키워드**: {tags}");
    }
    if analyzed.content.is_empty() {
        md.push_str("- _본문을 가져오지 못했습니다._\n");
    }
    md.push('\n');
}

/// Path of the Markdown file for `digest` under `markdown_output_dir`.
pub fn markdown_path(digest: &NewsDigest, markdown_output_dir: &str) -> PathBuf {
    Path::new(markdown_output_dir).join(format!(
        "{}_{}.md",
        digest.local_date,
        slugify_title(&digest.query)
    ))
}

#[instrument(level = "info", skip_all, fields(%markdown_output_dir))]
pub async fn write_markdown(
    digest: &NewsDigest,
    markdown_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(markdown_output_dir).await?;
    let path = markdown_path(digest, markdown_output_dir);
    fs::write(&path, digest_to_markdown(digest)).await?;
    info!(path = %path.display(), "Wrote Markdown digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewsItem, Sentiment};

    fn analyzed(summary: Option<&str>, content: &str) -> AnalyzedNewsItem {
        AnalyzedNewsItem {
            item: NewsItem {
                title: "기준금리 동결".to_string(),
                description: "한국은행 발표".to_string(),
                originallink: "https://www.yna.co.kr/view/1".to_string(),
                link: "https://n.news.naver.com/1".to_string(),
                pubDate: "Fri, 05 Jan 2024 09:30:00 +0900".to_string(),
            },
            published: "2024년 1월 5일 (금) 09:30".to_string(),
            content: content.to_string(),
            summary: summary.map(str::to_string),
            sentiment: Some(Sentiment {
                sentiment: "neutral".to_string(),
                score: 0.5,
            }),
            keywords: vec!["금리".to_string(), "한국은행".to_string()],
        }
    }

    fn digest(items: Vec<AnalyzedNewsItem>) -> NewsDigest {
        NewsDigest {
            query: "경제".to_string(),
            local_date: "2024-01-05".to_string(),
            local_time: "10:00:00".to_string(),
            items,
        }
    }

    #[test]
    fn test_renders_summary_sentiment_and_keywords() {
        let md = digest_to_markdown(&digest(vec![analyzed(Some("금리가 동결됐다."), "본문")]));
        assert!(md.starts_with("# 경제 뉴스 (2024-01-05 10:00:00)"));
        assert!(md.contains("## [기준금리 동결](https://www.yna.co.kr/view/1)"));
        assert!(md.contains("금리가 동결됐다."));
        assert!(md.contains("- **논조**: neutral (0.50)"));
        assert!(md.contains("`금리` `한국은행`"));
        assert!(!md.contains("본문을 가져오지 못했습니다"));
    }

    #[test]
    fn test_falls_back_to_description_and_flags_missing_body() {
        let md = digest_to_markdown(&digest(vec![analyzed(None, "")]));
        assert!(md.contains("> 한국은행 발표"));
        assert!(md.contains("본문을 가져오지 못했습니다"));
    }

    #[test]
    fn test_empty_digest() {
        assert!(digest_to_markdown(&digest(vec![])).contains("검색 결과가 없습니다"));
    }

    #[test]
    fn test_path_uses_date_and_query() {
        assert_eq!(
            markdown_path(&digest(vec![]), "md"),
            PathBuf::from("md/2024-01-05_경제.md")
        );
    }
}
