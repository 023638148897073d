//! Candidate discovery on the download index page.

use crate::html::{
    SiteBase, element_text, literal_regex, literal_selector, script_texts,
    unescape_script_slashes,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Visible texts that mark a download button.
pub const DOWNLOAD_PHRASES: &[&str] = &["download", "begin download", "download now"];

static NUMBERED_DOWNLOAD: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"/download/\d+(?:[/?#]|$)"));

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r#"https?://[^\s"'<>`\\)]+"#));

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| literal_selector("a[href]"));
static BUTTONS: LazyLock<Selector> = LazyLock::new(|| literal_selector("a[href], button[href]"));
static LINKED: LazyLock<Selector> = LazyLock::new(|| literal_selector("[href]"));

/// Collects candidate per-version download pages from the index page.
///
/// Candidates come from numbered `/download/<id>/` anchors, then elements
/// whose text is a download phrase, then elements whose class or id
/// mentions "download". Duplicates and links back to `index_url` are
/// dropped; first-seen order is preserved.
#[must_use]
pub fn collect_candidates(document: &Html, site: &SiteBase, index_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(normalise_for_dedup(index_url));

    numbered_download_links(document)
        .chain(download_phrase_links(document))
        .chain(download_marked_links(document))
        .filter_map(|href| site.resolve(&href))
        .filter(|url| seen.insert(normalise_for_dedup(url)))
        .collect()
}

fn numbered_download_links(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| NUMBERED_DOWNLOAD.is_match(href))
        .map(str::to_owned)
}

fn download_phrase_links(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&BUTTONS)
        .filter(|element| {
            let text = element_text(*element);
            let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
            DOWNLOAD_PHRASES.contains(&normalised.to_lowercase().as_str())
        })
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_owned)
}

fn download_marked_links(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&LINKED)
        .filter(|element| {
            let value = element.value();
            [value.attr("class"), value.id()]
                .into_iter()
                .flatten()
                .any(|marker| marker.to_ascii_lowercase().contains("download"))
        })
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_owned)
}

/// Same-site URLs mentioned by inline scripts that talk about downloads.
///
/// Used when none of the numbered candidates produced a direct link.
#[must_use]
pub fn script_fallback_urls(document: &Html, site: &SiteBase, index_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(normalise_for_dedup(index_url));

    script_texts(document)
        .filter(|text| text.to_ascii_lowercase().contains("download"))
        .flat_map(|raw| {
            let text = unescape_script_slashes(&raw);
            ABSOLUTE_URL
                .find_iter(&text)
                .map(|m| m.as_str().trim_end_matches([',', ';', '.']).to_owned())
                .collect::<Vec<_>>()
        })
        .filter(|url| site.is_same_site(url))
        .filter(|url| seen.insert(normalise_for_dedup(url)))
        .collect()
}

fn normalise_for_dedup(url: &str) -> String {
    url.trim_end_matches('/').to_ascii_lowercase()
}
