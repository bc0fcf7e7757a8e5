//! Removal of non-article DOM structure.
//!
//! Runs before content location so that ad, menu and "AI summary" text never
//! reaches a candidate container, even when a site's body container wraps it.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Elements removed from every document.
const BOILERPLATE: &str = "script, style, noscript, iframe, \
    .ad, .advertisement, .ad-banner, \
    nav, header, footer, .menu, .navigation, .sidebar, \
    .related, .recommend, \
    .summary, .ai-summary, .news_summary, \
    .article_recommend, .article_relation, .article_tag, .article_share, \
    .comment, .reply, \
    [role=\"navigation\"], [role=\"complementary\"]";

static BOILERPLATE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(BOILERPLATE).unwrap());

/// Remove the fixed boilerplate set from `document`. Idempotent.
pub fn strip(document: &mut Html) {
    let removed = remove_matching(document, &BOILERPLATE_SELECTOR);
    debug!(removed, "Stripped boilerplate elements");
}

/// Remove elements matching any of `selectors`; used for per-site removals.
///
/// Selectors that fail to parse are logged and skipped.
pub fn strip_extra(document: &mut Html, selectors: &[&str]) {
    for css in selectors {
        match Selector::parse(css) {
            Ok(selector) => {
                remove_matching(document, &selector);
            }
            Err(e) => warn!(selector = %css, error = %e, "Skipping unparseable removal selector"),
        }
    }
}

/// Detach every element matching `selector` and return how many were detached.
fn remove_matching(document: &mut Html, selector: &Selector) -> usize {
    let ids: Vec<_> = document.select(selector).map(|el| el.id()).collect();
    let mut removed = 0;
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
            removed += 1;
        }
    }
    removed
}
