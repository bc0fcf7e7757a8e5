//! Per-publisher extraction rules.
//!
//! Article containers are not marked up consistently across Korean
//! publishers, so known hosts get their own selector list. Rules are plain
//! data: the locator walks [`SITE_RULES`] in order and applies the first rule
//! whose host matches.

/// How a selector's matches are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    /// Only the first match in document order.
    First,
    /// Every match, texts joined with a space.
    All,
}

/// One selector attempt inside a site rule.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub css: &'static str,
    pub take: Take,
    /// Minimum length in characters for the probe to count; `0` means any
    /// non-empty text is accepted.
    pub min_chars: usize,
}

impl Probe {
    pub const fn all(css: &'static str) -> Self {
        Self { css, take: Take::All, min_chars: 0 }
    }

    pub const fn first(css: &'static str) -> Self {
        Self { css, take: Take::First, min_chars: 0 }
    }

    pub const fn first_over(css: &'static str, min_chars: usize) -> Self {
        Self { css, take: Take::First, min_chars }
    }
}

/// Text transform applied to a rule's output.
#[derive(Debug, Clone, Copy)]
pub enum PostFilter {
    /// Keep only the text before the first occurrence of the marker.
    TruncateAt(&'static str),
}

impl PostFilter {
    pub fn apply(&self, text: &str) -> String {
        match self {
            PostFilter::TruncateAt(marker) => match text.find(marker) {
                Some(idx) => text[..idx].trim().to_string(),
                None => text.trim().to_string(),
            },
        }
    }
}

/// Extraction rule for one publisher.
#[derive(Debug)]
pub struct SiteRule {
    /// Registrable domain; matches the domain itself and any subdomain.
    pub domain: &'static str,
    /// Extra elements to remove before probing.
    pub removals: &'static [&'static str],
    /// Probes in priority order; the first yielding qualifying text wins.
    pub probes: &'static [Probe],
    pub post_filters: &'static [PostFilter],
}

impl SiteRule {
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.domain
            || host
                .strip_suffix(self.domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// Label used in logs and in [`crate::models::ExtractionOutcome`].
    pub fn label(&self, probe: &Probe) -> String {
        format!("{}: {}", self.domain, probe.css)
    }

    pub fn apply_post_filters(&self, text: &str) -> String {
        self.post_filters
            .iter()
            .fold(text.trim().to_string(), |acc, f| f.apply(&acc))
    }
}

const SWEEP_MIN_CHARS: usize = 100;

/// Known publishers, most specific host first.
pub static SITE_RULES: &[SiteRule] = &[
    SiteRule {
        domain: "segye.com",
        removals: &[],
        probes: &[Probe::all("#articleBodyContents, .article_body")],
        post_filters: &[],
    },
    SiteRule {
        domain: "hankyung.com",
        removals: &[],
        probes: &[Probe::all("#articleBody, .article-body, #newsEndContents")],
        post_filters: &[],
    },
    // Must precede mk.co.kr, which would otherwise shadow it.
    SiteRule {
        domain: "mbn.mk.co.kr",
        removals: &[],
        probes: &[Probe::all(".article_view, .article-body, #articleBody")],
        post_filters: &[],
    },
    SiteRule {
        domain: "mk.co.kr",
        removals: &[
            ".news_summary, .ai-summary, .summary, .article_recommend, .article_relation, .article_tag",
        ],
        probes: &[Probe::first("#article_body, .news_view_body, #newsEndContents, .article_view")],
        post_filters: &[
            PostFilter::TruncateAt("AI가 뉴스를 읽고"),
            PostFilter::TruncateAt("기사 속 종목 이야기"),
            PostFilter::TruncateAt("이 기사가 마음에 들었다면"),
        ],
    },
    SiteRule {
        domain: "busan.com",
        removals: &[],
        probes: &[Probe::all(".article_view_box, #article-view-content-div")],
        post_filters: &[],
    },
    SiteRule {
        domain: "edaily.co.kr",
        removals: &["nav, .menu, .navigation, header, .gnb, .lnb"],
        probes: &[
            Probe::first_over("#articleBody", SWEEP_MIN_CHARS),
            Probe::first_over(".article_body", SWEEP_MIN_CHARS),
            Probe::first_over(".news_view_body", SWEEP_MIN_CHARS),
            Probe::first_over("#newsEndContents", SWEEP_MIN_CHARS),
            Probe::first_over(".article_view", SWEEP_MIN_CHARS),
            Probe::first_over(".article-content", SWEEP_MIN_CHARS),
            Probe::first_over("#content", SWEEP_MIN_CHARS),
            Probe::first_over(".content", SWEEP_MIN_CHARS),
            Probe::first_over("[class*=\"article\"]", SWEEP_MIN_CHARS),
            Probe::first_over("[id*=\"article\"]", SWEEP_MIN_CHARS),
            Probe::first("main, .content, #content"),
        ],
        post_filters: &[],
    },
    SiteRule {
        domain: "kookje.co.kr",
        removals: &[],
        probes: &[
            Probe::first_over("#articleBody", SWEEP_MIN_CHARS),
            Probe::first_over(".article_body", SWEEP_MIN_CHARS),
            Probe::first_over(".news_view_body", SWEEP_MIN_CHARS),
            Probe::first_over(".article_view", SWEEP_MIN_CHARS),
            Probe::first_over("#newsEndContents", SWEEP_MIN_CHARS),
            Probe::first_over(".article-content", SWEEP_MIN_CHARS),
            Probe::first_over("[class*=\"article\"]", SWEEP_MIN_CHARS),
            Probe::first_over("[id*=\"article\"]", SWEEP_MIN_CHARS),
        ],
        post_filters: &[],
    },
    SiteRule {
        domain: "yna.co.kr",
        removals: &[".summary, .news_summary, .ai-summary, .article_summary"],
        probes: &[Probe::first(
            "#articleBody, .article_body, .news_view_body, #article-view, .article_view",
        )],
        post_filters: &[
            PostFilter::TruncateAt("관련 뉴스"),
            PostFilter::TruncateAt("제보는 카카오톡"),
        ],
    },
];

/// First rule whose domain matches `host`.
pub fn rule_for_host(host: &str) -> Option<&'static SiteRule> {
    SITE_RULES.iter().find(|rule| rule.matches_host(host))
}
