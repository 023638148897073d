//! Direct download link strategies.
//!
//! Each strategy is a pure function over a parsed page. They are tried in
//! [`DIRECT_LINK_MATCHERS`] order and the first hit wins.

use crate::html::{
    SiteBase, literal_regex, literal_selector, script_texts, unescape_script_slashes,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// A strategy that looks for a direct APK URL on a page.
pub type DirectLinkMatcher = fn(&Html, &SiteBase) -> Option<String>;

/// Strategies in priority order, each paired with a name used in logs.
pub const DIRECT_LINK_MATCHERS: &[(&str, DirectLinkMatcher)] = &[
    ("apk anchor", apk_anchor),
    ("data-download marker", data_download_marker),
    ("iframe source", iframe_source),
    ("inline script", script_reference),
];

static APK_HREF: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"(?i)\.apk(?:[?#].*)?$"));

static SCRIPT_APK_URL: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r#"(?i)https?://[^\s"'<>`]*?\.apk[^\s"'<>`]*"#));

static SCRIPT_APK_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(
        r#"(?i)\b(?:download_?url|file_?url|href)["']?\s*[:=]\s*["']([^"']*\.apk[^"']*)["']"#,
    )
});

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| literal_selector("a[href]"));
static DATA_DOWNLOAD: LazyLock<Selector> =
    LazyLock::new(|| literal_selector("[data-download][href]"));
static IFRAMES: LazyLock<Selector> = LazyLock::new(|| literal_selector("iframe[src]"));

/// Runs every strategy in order and returns the first direct link found.
#[must_use]
pub fn extract_direct_link(document: &Html, site: &SiteBase) -> Option<String> {
    DIRECT_LINK_MATCHERS.iter().find_map(|(name, matcher)| {
        let link = matcher(document, site)?;
        log::debug!("direct link found by {name} strategy: {link}");
        Some(link)
    })
}

/// Anchors whose href ends in `.apk`, optionally with a query or fragment.
#[must_use]
pub fn apk_anchor(document: &Html, site: &SiteBase) -> Option<String> {
    document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| APK_HREF.is_match(href.trim()))
        .find_map(|href| site.resolve(href))
}

/// Elements flagged with `data-download` whose href mentions `.apk`.
#[must_use]
pub fn data_download_marker(document: &Html, site: &SiteBase) -> Option<String> {
    document
        .select(&DATA_DOWNLOAD)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| contains_apk(href))
        .find_map(|href| site.resolve(href))
}

/// Inline frames whose source mentions `.apk`.
#[must_use]
pub fn iframe_source(document: &Html, site: &SiteBase) -> Option<String> {
    document
        .select(&IFRAMES)
        .filter_map(|frame| frame.value().attr("src"))
        .filter(|src| contains_apk(src))
        .find_map(|src| site.resolve(src))
}

/// Absolute `.apk` URLs or `.apk` values assigned to link-like variables in
/// inline scripts.
#[must_use]
pub fn script_reference(document: &Html, site: &SiteBase) -> Option<String> {
    script_texts(document).find_map(|raw| {
        let text = unescape_script_slashes(&raw);
        if let Some(found) = SCRIPT_APK_URL.find(&text) {
            return Some(found.as_str().to_owned());
        }
        SCRIPT_APK_ASSIGNMENT
            .captures(&text)
            .and_then(|captures| captures.get(1))
            .and_then(|value| site.resolve(value.as_str()))
    })
}

fn contains_apk(reference: &str) -> bool {
    reference.to_ascii_lowercase().contains(".apk")
}
