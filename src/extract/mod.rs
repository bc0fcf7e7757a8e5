//! Article content extraction.
//!
//! Turns the raw bytes of a news page into clean, human-readable body text.
//! The pipeline for one page is synchronous and runs entirely on the
//! document it parsed itself:
//!
//! 1. [`encoding::resolve`] picks UTF-8 or EUC-KR and the bytes are decoded
//! 2. [`boilerplate::strip`] removes scripts, menus, ads and summary widgets
//!    (plus any removals of the publisher's [`sites::SiteRule`])
//! 3. [`locator::locate`] walks the site / generic / structural tiers
//! 4. [`cleaner::clean`] normalises whitespace and cuts trailing boilerplate
//!
//! A page with no usable body yields an empty `text`; nothing here returns an
//! error.

pub mod boilerplate;
pub mod cleaner;
pub mod encoding;
pub mod locator;
pub mod sites;

use crate::models::{Extraction, ExtractionOutcome, FetchResult};
use scraper::Html;
use tracing::{debug, instrument, warn};
use url::Url;

/// Run the full extraction pipeline over one fetched page.
#[instrument(level = "debug", skip_all, fields(url = %fetched.url))]
pub fn extract_article(fetched: FetchResult) -> ExtractionOutcome {
    let FetchResult {
        url,
        raw_bytes,
        content_type,
    } = fetched;

    let enc = encoding::resolve(&raw_bytes, &content_type, &url);
    let html = encoding::decode(&raw_bytes, enc);
    debug!(encoding = enc.name(), bytes = raw_bytes.len(), "Decoded page");

    let host = host_of(&url);
    let mut document = Html::parse_document(&html);
    boilerplate::strip(&mut document);
    if let Some(rule) = sites::rule_for_host(&host) {
        boilerplate::strip_extra(&mut document, rule.removals);
    }

    match locator::locate(&document, &host) {
        Extraction::Found { text, strategy } => {
            let text = cleaner::clean(&text);
            if text.is_empty() {
                warn!(%url, %strategy, "Article text empty after cleaning");
            }
            ExtractionOutcome {
                url,
                text,
                matched_strategy: strategy,
            }
        }
        Extraction::NotFound { strategy, best_len } => {
            warn!(%url, %strategy, best_len, "Article body not found");
            ExtractionOutcome {
                url,
                text: String::new(),
                matched_strategy: strategy,
            }
        }
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "한국은행이 기준금리를 3.5%로 동결했다고 밝혔다. ";

    fn fetched(url: &str, content_type: &str, body: Vec<u8>) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            raw_bytes: body,
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_segye_page_returns_only_article_block() {
        let block: String = SENTENCE.repeat(6).chars().take(150).collect();
        assert_eq!(block.chars().count(), 150);

        let html = format!(
            r#"<html><head><meta charset="utf-8"><title>세계일보</title></head><body>
            <nav><ul><li>정치</li><li>경제</li><li>전체메뉴 보기</li></ul></nav>
            <div id="articleBodyContents">
                {block}
                <p class="copy">Copyright ⓒ 세계일보 무단전재 및 재배포 금지</p>
            </div>
            </body></html>"#
        );

        let outcome = extract_article(fetched(
            "https://www.segye.com/newsView/20240105500123",
            "text/html; charset=utf-8",
            html.into_bytes(),
        ));

        assert_eq!(outcome.text, block);
        assert!(!outcome.text.contains("전체메뉴"));
        assert!(!outcome.text.contains("Copyright"));
        assert_eq!(outcome.matched_strategy, "segye.com: #articleBodyContents, .article_body");
    }

    #[test]
    fn test_euc_kr_page_is_decoded_before_extraction() {
        let body = SENTENCE.repeat(5);
        let html = format!(
            r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=euc-kr"></head>
            <body><div class="article_body">{body}</div></body></html>"#
        );
        let (bytes, _, _) = encoding_rs::EUC_KR.encode(&html);

        let outcome = extract_article(fetched(
            "https://news.example.co.kr/1",
            "text/html",
            bytes.into_owned(),
        ));

        assert_eq!(outcome.text, body.trim());
        assert_eq!(outcome.matched_strategy, "general: .article_body");
    }

    #[test]
    fn test_mk_summary_widget_is_removed_by_site_rule() {
        let body = SENTENCE.repeat(5);
        let html = format!(
            r#"<html><body><div id="article_body">
                <div class="news_summary">세 줄 요약 금리 동결 닫기</div>
                {body}
                이 기사가 마음에 들었다면 구독하세요
            </div></body></html>"#
        );
        let outcome = extract_article(fetched("https://www.mk.co.kr/news/economy/1", "", html.into_bytes()));
        assert_eq!(outcome.text, body.trim());
        assert!(outcome.matched_strategy.starts_with("mk.co.kr"));
    }

    #[test]
    fn test_photo_caption_between_paragraphs_is_kept() {
        let html = format!(
            r#"<html><body><div id="articleBodyContents">
                <p>{first}</p>
                <figure><img src="a.jpg"><figcaption>이창용 한국은행 총재 ⓒ 뉴시스</figcaption></figure>
                <p>둘째 문단: 시장은 연내 인하 가능성에 주목했다.</p>
                <p class="copy">Copyright ⓒ 세계일보 무단전재 및 재배포 금지</p>
            </div></body></html>"#,
            first = SENTENCE.repeat(4).trim()
        );
        let outcome = extract_article(fetched(
            "https://www.segye.com/newsView/20240105500124",
            "text/html; charset=utf-8",
            html.into_bytes(),
        ));
        assert!(outcome.text.contains("이창용 한국은행 총재 ⓒ 뉴시스"));
        assert!(outcome.text.ends_with("둘째 문단: 시장은 연내 인하 가능성에 주목했다."));
        assert!(!outcome.text.contains("Copyright"));
    }

    #[test]
    fn test_page_without_article_yields_empty_text() {
        let html = "<html><body><nav>메뉴</nav><p>짧은 안내문.</p></body></html>";
        let outcome = extract_article(fetched("https://example.com/", "text/html", html.as_bytes().to_vec()));
        assert_eq!(outcome.text, "");
        assert_eq!(outcome.matched_strategy, locator::FAILURE_LABEL);
    }

    #[test]
    fn test_garbage_bytes_do_not_panic() {
        let outcome = extract_article(fetched("not a url", "", vec![0xff, 0xfe, 0x00, 0x3c, 0x3e]));
        assert_eq!(outcome.text, "");
    }
}
