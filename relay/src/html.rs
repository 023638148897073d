//! Shared HTML and pattern helpers for the scraping modules.
//!
//! Patterns and selectors are compile-time literals; they are compiled once
//! on first use.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiles a literal regular expression.
#[expect(clippy::expect_used, reason = "literal patterns are covered by unit tests")]
pub(crate) fn literal_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal regex must compile")
}

/// Compiles a literal CSS selector.
#[expect(clippy::expect_used, reason = "literal selectors are covered by unit tests")]
pub(crate) fn literal_selector(css: &str) -> Selector {
    Selector::parse(css).expect("literal selector must parse")
}

/// Concatenated text of an element and all its descendants.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// Text nodes that are direct children of `element`.
pub(crate) fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of every inline `<script>` element in the document.
pub(crate) fn script_texts(document: &Html) -> impl Iterator<Item = String> + '_ {
    static SCRIPT: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| literal_selector("script"));
    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
}

/// Undo the `\/` escaping that JSON and minified scripts apply to URLs.
pub(crate) fn unescape_script_slashes(text: &str) -> String {
    text.replace("\\/", "/")
}

/// The scheme and host that relative links on a site resolve against.
///
/// # Examples
///
/// ```
/// use apk_relay::html::SiteBase;
///
/// let site = SiteBase::from_landing("https://getmodsapk.com/some-app").expect("valid URL");
/// assert_eq!(
///     site.resolve("/some-app/download/42/").as_deref(),
///     Some("https://getmodsapk.com/some-app/download/42/")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBase {
    root: Url,
}

impl SiteBase {
    /// Derives the site base from a landing page URL.
    ///
    /// # Errors
    ///
    /// Returns an error when `landing` is not an absolute URL.
    pub fn from_landing(landing: &str) -> Result<Self, url::ParseError> {
        let mut root = Url::parse(landing.trim())?;
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        Ok(Self { root })
    }

    /// Resolves `href` to an absolute `http`/`https` URL.
    ///
    /// Returns `None` for empty references, script pseudo-URLs, and any
    /// other non-HTTP scheme.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let resolved = self.root.join(href).ok()?;
        matches!(resolved.scheme(), "http" | "https").then(|| resolved.into())
    }

    /// Returns `true` when `url` is on the same host as this site.
    #[must_use]
    pub fn is_same_site(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        match (parsed.host_str(), self.root.host_str()) {
            (Some(host), Some(own)) => host.eq_ignore_ascii_case(own),
            _ => false,
        }
    }

    /// The site root URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.root.as_str()
    }
}
