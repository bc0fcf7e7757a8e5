//! Site-aware selection of the article body.
//!
//! The locator is an ordered list of [`Tier`]s folded with "first success
//! wins". A tier succeeds when it produces trimmed text longer than
//! [`MIN_ARTICLE_CHARS`] characters:
//!
//! 1. the publisher's [`SiteRule`], when the host has one
//! 2. a sweep over common article-container selectors
//! 3. the structural `article` / `main` / `[role="article"]` fallback
//!
//! Within a tier the first selector in priority order that qualifies wins;
//! candidates are never scored against each other.

use crate::extract::sites::{self, Probe, SiteRule, Take};
use crate::models::Extraction;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Texts at or below this many characters are not considered an article.
pub const MIN_ARTICLE_CHARS: usize = 100;

/// Common article containers, tried one by one.
const GENERIC_SELECTORS: &[&str] = &[
    "article#articleBodyContents",
    "#articleBodyContents",
    ".article_body",
    ".article-body",
    "#articleBody",
    ".articleBody",
    "#newsEndContents",
    ".news_end_body",
    ".article_view",
    "#article-view-content-div",
    "._article_body_contents",
    ".article-content",
    "#article-view",
    ".article_view_box",
    "#article_body",
    ".news_view_body",
    ".article_view_body",
];

const STRUCTURAL_SELECTOR: &str = "article, main, [role=\"article\"]";

/// Substrings that mark a candidate as menu/summary chrome rather than body.
const NOT_ARTICLE_WORDS: &[&str] = &["메뉴", "navigation", "요약"];

pub const GENERIC_LABEL: &str = "general";
pub const STRUCTURAL_LABEL: &str = "fallback: article/main";
pub const FAILURE_LABEL: &str = "none";

static GENERIC: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    GENERIC_SELECTORS
        .iter()
        .map(|css| (*css, Selector::parse(css).unwrap()))
        .collect()
});

static STRUCTURAL: Lazy<Selector> = Lazy::new(|| Selector::parse(STRUCTURAL_SELECTOR).unwrap());

/// Hangul syllables and whitespace only, no sentence punctuation: a caption or
/// heading list, not prose.
static CAPTION_LIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[가-힣\s]+$").unwrap());

/// Text found by a tier, with its diagnostic label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub label: String,
}

/// One stage of the fallback chain.
#[derive(Debug, Clone, Copy)]
pub enum Tier {
    Site(&'static SiteRule),
    Generic,
    Structural,
}

impl Tier {
    pub fn label(&self) -> String {
        match self {
            Tier::Site(rule) => format!("{} specific", rule.domain),
            Tier::Generic => GENERIC_LABEL.to_string(),
            Tier::Structural => STRUCTURAL_LABEL.to_string(),
        }
    }

    /// Run this tier alone against `document`.
    pub fn attempt(&self, document: &Html) -> Option<Candidate> {
        match self {
            Tier::Site(rule) => site_candidate(document, rule),
            Tier::Generic => generic_candidate(document),
            Tier::Structural => structural_candidate(document),
        }
    }
}

/// The tiers applied for `host`, in order.
pub fn tiers_for(host: &str) -> Vec<Tier> {
    let mut tiers = Vec::with_capacity(3);
    if let Some(rule) = sites::rule_for_host(host) {
        tiers.push(Tier::Site(rule));
    }
    tiers.push(Tier::Generic);
    tiers.push(Tier::Structural);
    tiers
}

/// Find the article body in an already stripped `document`.
///
/// Never fails; a miss is reported as [`Extraction::NotFound`] labelled
/// [`FAILURE_LABEL`], with the longest text seen.
pub fn locate(document: &Html, host: &str) -> Extraction {
    let mut best_len = 0;
    let mut last_label = FAILURE_LABEL.to_string();

    for tier in tiers_for(host) {
        last_label = tier.label();
        let Some(candidate) = tier.attempt(document) else {
            continue;
        };
        let len = candidate.text.chars().count();
        if len > MIN_ARTICLE_CHARS {
            debug!(strategy = %candidate.label, chars = len, "Located article body");
            return Extraction::Found {
                text: candidate.text,
                strategy: candidate.label,
            };
        }
        debug!(strategy = %candidate.label, chars = len, "Candidate too short; falling through");
        best_len = best_len.max(len);
    }

    debug!(%host, last_tried = %last_label, best_len, "No tier produced article text");
    Extraction::NotFound {
        strategy: FAILURE_LABEL.to_string(),
        best_len,
    }
}

/// Apply a site rule: first probe with qualifying text, then post-filters.
fn site_candidate(document: &Html, rule: &SiteRule) -> Option<Candidate> {
    for probe in rule.probes {
        let Some(text) = probe_text(document, probe) else {
            continue;
        };
        if text.chars().count() <= probe.min_chars {
            continue;
        }
        return Some(Candidate {
            text: rule.apply_post_filters(&text),
            label: rule.label(probe),
        });
    }
    None
}

fn generic_candidate(document: &Html) -> Option<Candidate> {
    GENERIC.iter().find_map(|(css, selector)| {
        document
            .select(selector)
            .next()
            .map(element_text)
            .filter(|text| is_article_like(text))
            .map(|text| Candidate {
                text,
                label: format!("{GENERIC_LABEL}: {css}"),
            })
    })
}

fn structural_candidate(document: &Html) -> Option<Candidate> {
    document
        .select(&STRUCTURAL)
        .next()
        .map(element_text)
        .filter(|text| is_article_like(text))
        .map(|text| Candidate {
            text,
            label: STRUCTURAL_LABEL.to_string(),
        })
}

fn probe_text(document: &Html, probe: &Probe) -> Option<String> {
    let selector = match Selector::parse(probe.css) {
        Ok(s) => s,
        Err(e) => {
            warn!(selector = %probe.css, error = %e, "Skipping unparseable site selector");
            return None;
        }
    };
    let text = match probe.take {
        Take::First => document.select(&selector).next().map(element_text)?,
        Take::All => document
            .select(&selector)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };
    (!text.is_empty()).then_some(text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Length filter plus the "obviously not an article" heuristic shared by the
/// generic and structural tiers.
pub fn is_article_like(text: &str) -> bool {
    text.chars().count() > MIN_ARTICLE_CHARS
        && !NOT_ARTICLE_WORDS.iter().any(|w| text.contains(w))
        && !CAPTION_LIKE_RE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A sentence of prose, 30 characters, with punctuation.
    const SENTENCE: &str = "한국은행이 기준금리를 3.5%로 동결했다고 밝혔다. ";

    fn prose(sentences: usize) -> String {
        SENTENCE.repeat(sentences).trim().to_string()
    }

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_site_rule_wins_for_known_host() {
        let doc = page(&format!(
            r#"<div id="articleBodyContents">{}</div><article>{}</article>"#,
            prose(5),
            prose(8)
        ));
        match locate(&doc, "www.segye.com") {
            Extraction::Found { text, strategy } => {
                assert_eq!(text, prose(5));
                assert_eq!(strategy, "segye.com: #articleBodyContents, .article_body");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_site_rule_all_take_joins_every_match() {
        let doc = page(&format!(
            r#"<div id="articleBodyContents">{}</div><div class="article_body">{}</div>"#,
            prose(2),
            prose(2)
        ));
        let rule = sites::rule_for_host("segye.com").unwrap();
        let candidate = Tier::Site(rule).attempt(&doc).unwrap();
        assert_eq!(candidate.text, format!("{} {}", prose(2), prose(2)));
    }

    #[test]
    fn test_site_rule_applies_post_filters() {
        let doc = page(&format!(
            r#"<div id="articleBody">{} 관련 뉴스 다른 기사 제목들</div>"#,
            prose(5)
        ));
        let extraction = locate(&doc, "www.yna.co.kr");
        assert_eq!(extraction.clone().into_text(), prose(5));
        assert!(extraction.strategy().starts_with("yna.co.kr"));
    }

    #[test]
    fn test_short_site_text_falls_through_to_generic() {
        let doc = page(&format!(
            r#"<div class="article_view">짧은 글.</div><div id="articleBody">{}</div>"#,
            prose(5)
        ));
        // mk.co.kr takes .article_view first but it is too short
        let extraction = locate(&doc, "www.mk.co.kr");
        assert_eq!(extraction.strategy(), "general: #articleBody");
    }

    #[test]
    fn test_sweep_probe_skips_short_matches() {
        let doc = page(&format!(
            r#"<div id="articleBody">짧다.</div><div class="article_view">{}</div>"#,
            prose(5)
        ));
        let rule = sites::rule_for_host("kookje.co.kr").unwrap();
        let candidate = Tier::Site(rule).attempt(&doc).unwrap();
        assert_eq!(candidate.label, "kookje.co.kr: .article_view");
    }

    #[test]
    fn test_generic_sweep_respects_priority_order() {
        let doc = page(&format!(
            r#"<div class="article-content">{}</div><div class="article_body">{}</div>"#,
            prose(6),
            prose(4)
        ));
        let extraction = locate(&doc, "news.example.com");
        assert_eq!(extraction.strategy(), "general: .article_body");
        assert_eq!(extraction.into_text(), prose(4));
    }

    #[test]
    fn test_generic_sweep_rejects_menu_like_text() {
        let doc = page(&format!(
            r#"<div id="articleBodyContents">{} 메뉴</div><div id="newsEndContents">{}</div>"#,
            prose(5),
            prose(5)
        ));
        assert_eq!(locate(&doc, "example.com").strategy(), "general: #newsEndContents");
    }

    #[test]
    fn test_structural_fallback_used_when_no_container_matches() {
        let doc = page(&format!("<main><p>{}</p></main>", prose(5)));
        let extraction = locate(&doc, "example.com");
        assert_eq!(extraction.strategy(), STRUCTURAL_LABEL);
        assert_eq!(extraction.into_text(), prose(5));
    }

    #[test]
    fn test_short_text_everywhere_is_not_found() {
        let doc = page(r#"<div id="articleBody">짧은 본문.</div><article>역시 짧다.</article>"#);
        match locate(&doc, "www.segye.com") {
            Extraction::NotFound { strategy, best_len } => {
                assert_eq!(strategy, FAILURE_LABEL);
                assert!(best_len <= MIN_ARTICLE_CHARS);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_document_is_not_found() {
        let doc = Html::parse_document("");
        assert_eq!(
            locate(&doc, "example.com"),
            Extraction::NotFound {
                strategy: FAILURE_LABEL.to_string(),
                best_len: 0
            }
        );
    }

    #[test]
    fn test_miss_label_differs_from_structural_hit() {
        let miss = locate(&page("<article>짧다.</article>"), "example.com");
        let hit = locate(&page(&format!("<article>{}</article>", prose(5))), "example.com");
        assert_eq!(miss.strategy(), FAILURE_LABEL);
        assert_eq!(hit.strategy(), STRUCTURAL_LABEL);
        assert_ne!(miss.strategy(), hit.strategy());
    }

    #[test]
    fn test_caption_like_text_is_rejected() {
        let caption = "경제 사회 정치 국제 문화 ".repeat(12);
        assert!(caption.chars().count() > MIN_ARTICLE_CHARS);
        assert!(!is_article_like(&caption));
        assert!(is_article_like(&prose(5)));
    }

    #[test]
    fn test_tiers_for_unknown_host_skip_site_rule() {
        let tiers = tiers_for("example.com");
        assert_eq!(tiers.len(), 2);
        assert!(matches!(tiers[0], Tier::Generic));
        assert_eq!(tiers_for("www.busan.com").len(), 3);
    }
}
