//! Version discovery on package pages.
//!
//! Versions are dotted three-component numeric tokens such as `1.4.2`,
//! optionally written with a leading `v`. No ordering is defined between
//! versions: the relay only ever asks whether the scraped version differs
//! from the stored one.

use crate::html::{element_text, literal_regex, literal_selector, own_text};
use crate::http::HttpClient;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?i)v?(\d+\.\d+\.\d+)"));

static TITLE: LazyLock<Selector> = LazyLock::new(|| literal_selector("title"));

static MAIN_CONTENT: LazyLock<Selector> = LazyLock::new(|| {
    literal_selector("main, article, .content, #content, .entry-content")
});

static INLINE_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| literal_selector("span, p, li, strong, b, td, div"));

/// How a stored version is compared with a scraped one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionMatch {
    /// Compare the strings exactly.
    Exact,
    /// Compare after keeping only digits and dots.
    #[default]
    Normalized,
}

impl VersionMatch {
    /// Returns `true` when `stored` and `scraped` denote the same version.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_relay::version::VersionMatch;
    ///
    /// assert!(VersionMatch::Normalized.matches("v1.0.0", "1.0.0"));
    /// assert!(!VersionMatch::Exact.matches("v1.0.0", "1.0.0"));
    /// ```
    #[must_use]
    pub fn matches(self, stored: &str, scraped: &str) -> bool {
        match self {
            Self::Exact => stored == scraped,
            Self::Normalized => normalize_version(stored) == normalize_version(scraped),
        }
    }
}

/// Strips everything except ASCII digits and dots.
///
/// # Examples
///
/// ```
/// use apk_relay::version::normalize_version;
///
/// assert_eq!(normalize_version(" V2.10.3-mod "), "2.10.3");
/// ```
#[must_use]
pub fn normalize_version(version: &str) -> String {
    version
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Extracts the first version token from free text, without any prefix.
///
/// # Examples
///
/// ```
/// use apk_relay::version::extract_version;
///
/// assert_eq!(extract_version("Example App v3.2.1 MOD").as_deref(), Some("3.2.1"));
/// assert_eq!(extract_version("no version here"), None);
/// ```
#[must_use]
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_PATTERN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Extracts the package version from a page's HTML.
///
/// Locations are tried in order: the page title, the main content
/// container, any inline element whose own text carries a version, and
/// finally the whole page text.
#[must_use]
pub fn extract_page_version(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let from_title = || {
        document
            .select(&TITLE)
            .find_map(|title| extract_version(&element_text(title)))
    };
    let from_main = || {
        document
            .select(&MAIN_CONTENT)
            .find_map(|container| extract_version(&element_text(container)))
    };
    let from_inline = || {
        document
            .select(&INLINE_ELEMENTS)
            .find_map(|element| extract_version(&own_text(element)))
    };
    let from_page = || extract_version(&element_text(document.root_element()));

    from_title()
        .or_else(from_main)
        .or_else(from_inline)
        .or_else(from_page)
}

/// Fetches `url` and extracts the package version from it.
///
/// A failed fetch is logged and treated as "no version found".
pub fn package_version(http: &dyn HttpClient, url: &str) -> Option<String> {
    match http.get_text(url) {
        Ok(html) => {
            let version = extract_page_version(&html);
            log::debug!("version on {url}: {version:?}");
            version
        }
        Err(e) => {
            log::warn!("could not fetch {url} for version check: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, MockHttpClient};
    use rstest::rstest;

    #[rstest]
    #[case("Version 1.2.3", Some("1.2.3"))]
    #[case("v10.0.25 (Premium)", Some("10.0.25"))]
    #[case("V4.5.6", Some("4.5.6"))]
    #[case("build 12.3", None)]
    #[case("", None)]
    fn extract_version_reads_dotted_triples(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_version(text).as_deref(), expected);
    }

    #[test]
    fn title_wins_over_body() {
        let html = concat!(
            "<html><head><title>Example App v2.0.1 MOD APK</title></head>",
            "<body><main>Older build 1.9.9</main></body></html>"
        );
        assert_eq!(extract_page_version(html).as_deref(), Some("2.0.1"));
    }

    #[test]
    fn main_container_is_used_when_title_has_no_version() {
        let html = concat!(
            "<html><head><title>Example App</title></head><body>",
            "<nav>Menu 9.9.9 is not reached first</nav>",
            "<article><h1>Example</h1><p>Latest: 3.4.5</p></article>",
            "</body></html>"
        );
        assert_eq!(extract_page_version(html).as_deref(), Some("3.4.5"));
    }

    #[test]
    fn labelled_inline_element_is_found() {
        let html = concat!(
            "<html><head><title>Example</title></head><body>",
            "<section><span class=\"ver\">v7.8.9</span></section>",
            "</body></html>"
        );
        assert_eq!(extract_page_version(html).as_deref(), Some("7.8.9"));
    }

    #[test]
    fn whole_page_text_is_the_last_resort() {
        let html = "<html><body><section><em>Release 5.6.7</em></section></body></html>";
        assert_eq!(extract_page_version(html).as_deref(), Some("5.6.7"));
    }

    #[test]
    fn page_without_version_yields_none() {
        let html = "<html><head><title>Example</title></head><body><p>Soon</p></body></html>";
        assert_eq!(extract_page_version(html), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = "<html><head><title>App 1.0.2</title></head></html>";
        let first = extract_page_version(html);
        let second = extract_page_version(html);
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(VersionMatch::Exact, "1.0.0", "1.0.0", true)]
    #[case(VersionMatch::Exact, "v1.0.0", "1.0.0", false)]
    #[case(VersionMatch::Normalized, "v1.0.0", "1.0.0", true)]
    #[case(VersionMatch::Normalized, "1.0.0 ", "1.0.0", true)]
    #[case(VersionMatch::Normalized, "1.0.0", "1.0.2", false)]
    fn version_match_modes(
        #[case] mode: VersionMatch,
        #[case] stored: &str,
        #[case] scraped: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(mode.matches(stored, scraped), expected);
    }

    #[test]
    fn package_version_swallows_fetch_errors() {
        let mut http = MockHttpClient::new();
        http.expect_get_text().returning(|url| {
            Err(HttpError::NotFound {
                url: url.to_owned(),
            })
        });
        assert_eq!(package_version(&http, "https://example.test/app"), None);
    }

    #[test]
    fn package_version_reads_fetched_page() {
        let mut http = MockHttpClient::new();
        http.expect_get_text()
            .returning(|_| Ok("<title>App 4.0.0</title>".to_owned()));
        assert_eq!(
            package_version(&http, "https://example.test/app").as_deref(),
            Some("4.0.0")
        );
    }
}
