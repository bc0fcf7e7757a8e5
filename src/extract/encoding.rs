//! Character encoding resolution for article pages.
//!
//! Korean publishers still serve a fair share of pages in EUC-KR / CP949,
//! sometimes without declaring it. The resolver decides between UTF-8 and the
//! legacy Korean encoding using, in order: the `Content-Type` header, the HTML
//! meta declaration, and a short list of hosts known to mislabel their pages.

use encoding_rs::{EUC_KR, Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Number of leading bytes scanned for a meta charset declaration.
const META_SCAN_BYTES: usize = 5000;

/// Hosts that serve EUC-KR regardless of what they declare.
const FORCED_LEGACY_HOSTS: &[&str] = &["kookje.co.kr"];

static HEADER_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"';\s]+)"#).unwrap());

/// Matches both `<meta charset="...">` and the `http-equiv` content form.
static META_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s>]+)"#).unwrap());

/// Pick the encoding to decode `raw_bytes` with.
///
/// Never fails: anything unrecognised resolves to UTF-8.
pub fn resolve(raw_bytes: &[u8], content_type: &str, url: &str) -> &'static Encoding {
    if let Some(label) = header_charset(content_type) {
        if is_legacy_korean(label) {
            return EUC_KR;
        }
    }

    let head = &raw_bytes[..raw_bytes.len().min(META_SCAN_BYTES)];
    let head = String::from_utf8_lossy(head);
    if let Some(label) = META_CHARSET_RE.captures(&head).and_then(|c| c.get(1)) {
        if is_legacy_korean(label.as_str()) {
            return EUC_KR;
        }
    }

    if host_of(url).is_some_and(|host| is_forced_legacy_host(&host)) {
        return EUC_KR;
    }

    UTF_8
}

/// Decode `raw_bytes` with the given encoding, replacing malformed sequences.
pub fn decode(raw_bytes: &[u8], encoding: &'static Encoding) -> String {
    if encoding == UTF_8 {
        return String::from_utf8_lossy(raw_bytes).into_owned();
    }
    let (decoded, _used, _had_errors) = encoding.decode(raw_bytes);
    decoded.into_owned()
}

fn header_charset(content_type: &str) -> Option<&str> {
    HEADER_CHARSET_RE
        .captures(content_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Labels seen in the wild that WHATWG does not list for EUC-KR.
const EXTRA_KOREAN_LABELS: &[&str] = &["cp949", "x-windows-949", "uhc", "euckr", "ms949"];

/// True for any label of the Korean legacy encoding
/// (`euc-kr`, `cp949`, `ks_c_5601-1987`, `windows-949`, ...).
fn is_legacy_korean(label: &str) -> bool {
    let label = label.trim();
    Encoding::for_label(label.as_bytes()) == Some(EUC_KR)
        || EXTRA_KOREAN_LABELS
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn is_forced_legacy_host(host: &str) -> bool {
    FORCED_LEGACY_HOSTS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}
