//! Extraction of snapshot metadata from raw MHTML bytes.

use std::sync::LazyLock;

use regex::Regex;

use crate::store::{SNAPSHOT_EXT, Source};

// Browsers record the captured page's URL in the top-level
// `Snapshot-Content-Location` header; individual MIME parts carry their own
// `Content-Location`, which may be a cid: reference rather than a page URL.
static SNAPSHOT_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^Snapshot-Content-Location:[ \t]*(\S+)")
        .expect("snapshot location pattern compiles")
});

static CONTENT_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^Content-Location:[ \t]*(\S+)").expect("content location pattern compiles")
});

static SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^Subject:[ \t]*(.+?)[ \t]*\r?$").expect("subject pattern compiles"));

/// Public site roots backing each snapshot collection; used only when a
/// snapshot carries no location header.
const QAST_SITE_BASE: &str = "https://qast.example.org/questions";
const STOCK_SITE_BASE: &str = "https://stock.example.org/reports";

/// Best-effort original URL of an archived snapshot.
///
/// Prefers the snapshot-level location header, then the first part-level
/// `Content-Location` carrying an http(s) URL. Absence is a normal outcome,
/// not an error.
pub fn extract_source_url(payload: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(payload);

    if let Some(captures) = SNAPSHOT_LOCATION.captures(&text) {
        return Some(captures[1].trim().to_string());
    }

    for captures in CONTENT_LOCATION.captures_iter(&text) {
        let candidate = captures[1].trim();
        if candidate.starts_with("http://") || candidate.starts_with("https://") {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Page title recorded in the MIME `Subject` header, when present.
pub fn extract_title(payload: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(payload);
    SUBJECT
        .captures(&text)
        .map(|captures| captures[1].to_string())
}

/// Derive a plausible source URL from the object name when the snapshot
/// carries no location header. Each collection archives one site with a
/// stable path scheme, so the object stem doubles as the page slug.
pub fn fallback_source_url(source: Source, object_name: &str) -> String {
    let stem = object_name
        .rsplit('/')
        .next()
        .unwrap_or(object_name)
        .trim_end_matches(SNAPSHOT_EXT);
    match source {
        Source::Qast => format!("{QAST_SITE_BASE}/{stem}"),
        Source::Stock => format!("{STOCK_SITE_BASE}/{stem}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &[u8] = b"From: <Saved by Blink>\r\n\
Snapshot-Content-Location: https://example.com/articles/42\r\n\
Subject: Answer to everything\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----MultipartBoundary--x\"\r\n\
\r\n\
------MultipartBoundary--x\r\n\
Content-Type: text/html\r\n\
Content-Location: https://example.com/articles/42\r\n\
\r\n\
<html><body>42</body></html>\r\n";

    #[test]
    fn prefers_snapshot_location_header() {
        assert_eq!(
            extract_source_url(SNAPSHOT).as_deref(),
            Some("https://example.com/articles/42")
        );
    }

    #[test]
    fn falls_back_to_part_content_location() {
        let payload = b"MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Location: cid:css-1234\r\n\
\r\n\
--b\r\n\
Content-Location: https://example.com/p/7\r\n\
\r\n";
        assert_eq!(
            extract_source_url(payload).as_deref(),
            Some("https://example.com/p/7")
        );
    }

    #[test]
    fn absence_of_location_headers_is_not_an_error() {
        assert_eq!(extract_source_url(b"plain bytes, no headers"), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        assert_eq!(extract_source_url(SNAPSHOT), extract_source_url(SNAPSHOT));
        assert_eq!(extract_title(SNAPSHOT), extract_title(SNAPSHOT));
    }

    #[test]
    fn title_comes_from_the_subject_header() {
        assert_eq!(
            extract_title(SNAPSHOT).as_deref(),
            Some("Answer to everything")
        );
    }

    #[test]
    fn fallback_uses_the_object_stem() {
        assert_eq!(
            fallback_source_url(Source::Qast, "how-to-tie-knots.mhtml"),
            "https://qast.example.org/questions/how-to-tie-knots"
        );
        assert_eq!(
            fallback_source_url(Source::Stock, "archive/acme-q3.mhtml"),
            "https://stock.example.org/reports/acme-q3"
        );
    }
}
