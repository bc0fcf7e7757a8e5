//! Final text normalisation.
//!
//! Runs after location because text assembled from several DOM nodes can
//! still carry legal notices, "related news" blocks or AI-summary teasers
//! that DOM-level stripping missed.
//!
//! [`clean`] is idempotent: `clean(clean(t)) == clean(t)`.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Fragments cut out of the middle of the text: HTML comments, inline script
/// residue, and widget blocks that open and close with known words.
static FRAGMENT_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)<!--.*?-->",
        r"(?s)googletag\..*?;",
        r"(?s)document\.addEventListener.*?\);",
        r"(?s)세 줄 요약.*?닫기",
        r"(?s)AI 요약.*?닫기",
        r"(?s)요약쏙.*?닫기",
        r"(?s)최신뉴스.*?송고",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// A `ⓒ publisher` credit followed closely by a reproduction notice. A bare
/// `ⓒ` is a photo credit and may sit mid-article.
static COPYRIGHT_NOTICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ⓒ[^ⓒ]{0,40}?(무단\s?전재|무단 배포|All rights reserved)").unwrap()
});

/// Markers after which nothing belongs to the article.
const TRAILING_MARKERS: &[&str] = &[
    "Copyright",
    "무단전재",
    "무단 전재",
    "무단 배포",
    "세 줄 요약",
    "AI 요약",
    "관련 뉴스",
    "제보는",
    "이 기사가 마음에 들었다면",
    "기사 속 종목 이야기",
    "AI가 뉴스를 읽고",
];

/// Normalise extracted article text.
///
/// 1. collapse whitespace runs to single spaces
/// 2. cut comment/script remnants and widget blocks
/// 3. truncate at the earliest trailing-boilerplate marker
/// 4. trim
pub fn clean(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let without_fragments = collapse_whitespace(&remove_fragments(collapsed));
    truncate_at_markers(&without_fragments).trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").into_owned()
}

/// Remove fragments until none are left; a removal can splice a new one together.
fn remove_fragments(mut text: String) -> String {
    loop {
        let mut changed = false;
        for re in FRAGMENT_RES.iter() {
            if re.is_match(&text) {
                text = re.replace_all(&text, "").into_owned();
                changed = true;
            }
        }
        if !changed {
            return text;
        }
    }
}

/// Everything before the first occurrence of any marker or copyright notice.
pub fn truncate_at_markers(text: &str) -> &str {
    let cut = TRAILING_MARKERS
        .iter()
        .filter_map(|m| text.find(m))
        .chain(COPYRIGHT_NOTICE_RE.find(text).map(|m| m.start()))
        .min()
        .unwrap_or(text.len());
    &text[..cut]
}
