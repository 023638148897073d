//! Link resolution: from a package landing page to a direct APK URL.
//!
//! The download site hides the file behind several pages. Resolution walks
//! them in a fixed order:
//!
//! 1. the landing page (fetched only to prime session cookies),
//! 2. the download index at `<landing>/download/`,
//! 3. up to [`MAX_CANDIDATES`] per-version download pages found on the
//!    index, each scanned with the strategies in [`matchers`],
//! 4. same-site URLs mentioned by download scripts on the index.
//!
//! Every step is best-effort. The outcome is a [`LinkResolution`] rather
//! than a `Result`: "no link this time" is a normal answer.
//!
//! # Sub-modules
//!
//! - [`candidates`] - candidate discovery on the index page.
//! - [`matchers`] - direct-link strategies for a single page.

pub mod candidates;
pub mod matchers;

use crate::html::SiteBase;
use crate::http::HttpClient;
use candidates::{collect_candidates, script_fallback_urls};
use matchers::extract_direct_link;
use scraper::Html;
use std::time::Duration;

/// Upper bound on candidate pages fetched from one index page.
pub const MAX_CANDIDATES: usize = 5;

/// Default politeness delay between successive download page fetches.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// The outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    /// A URL believed to serve the APK directly.
    Found {
        /// Absolute download URL.
        url: String,
    },
    /// No direct link could be located.
    NotFound {
        /// A human-readable explanation.
        reason: String,
    },
}

impl LinkResolution {
    /// Returns the resolved URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found { url } => Some(url),
            Self::NotFound { .. } => None,
        }
    }

    fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }
}

/// Walks the download site's pages to find a direct APK link.
pub struct LinkResolver<'a> {
    http: &'a dyn HttpClient,
    pacing: Duration,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> LinkResolver<'a> {
    /// Creates a resolver with the default pacing delay.
    #[must_use]
    pub fn new(http: &'a dyn HttpClient) -> Self {
        Self::with_pacing(http, DEFAULT_PACING)
    }

    /// Creates a resolver with an explicit pacing delay.
    #[must_use]
    pub fn with_pacing(http: &'a dyn HttpClient, pacing: Duration) -> Self {
        Self {
            http,
            pacing,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replaces the function used to wait between page fetches.
    #[must_use]
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Resolves the direct download URL for the package at `landing_url`.
    #[must_use]
    pub fn resolve(&self, landing_url: &str) -> LinkResolution {
        let site = match SiteBase::from_landing(landing_url) {
            Ok(site) => site,
            Err(e) => return LinkResolution::not_found(format!("invalid landing URL: {e}")),
        };

        log::info!("accessing landing page {landing_url}");
        if let Err(e) = self.http.get_text(landing_url) {
            log::warn!("landing page fetch failed, continuing: {e}");
        }

        let index_url = download_index_url(landing_url);
        log::info!("accessing download index {index_url}");
        let index_html = match self.http.get_text(&index_url) {
            Ok(html) => html,
            Err(e) => return LinkResolution::not_found(format!("download index unavailable: {e}")),
        };

        let (candidates, fallbacks) = {
            let index = Html::parse_document(&index_html);
            (
                collect_candidates(&index, &site, &index_url),
                script_fallback_urls(&index, &site, &index_url),
            )
        };
        log::debug!(
            "{} candidate(s), {} script fallback(s) on {index_url}",
            candidates.len(),
            fallbacks.len()
        );

        let pages = candidates
            .iter()
            .take(MAX_CANDIDATES)
            .chain(fallbacks.iter().take(MAX_CANDIDATES));
        if let Some(url) = self.first_direct_link(pages, &site) {
            return LinkResolution::Found { url };
        }

        LinkResolution::not_found(format!(
            "no direct APK link found from {} candidate(s) on {index_url}",
            candidates.len().min(MAX_CANDIDATES)
        ))
    }

    /// Fetches `pages` in order, pausing before every fetch after the first,
    /// and returns the first direct link found on any of them.
    fn first_direct_link<'p>(
        &self,
        pages: impl Iterator<Item = &'p String>,
        site: &SiteBase,
    ) -> Option<String> {
        pages
            .enumerate()
            .find_map(|(attempt, page_url)| {
                if attempt > 0 {
                    self.pause();
                }
                self.direct_link_on(page_url, site)
            })
    }

    fn direct_link_on(&self, page_url: &str, site: &SiteBase) -> Option<String> {
        log::info!("accessing download page {page_url}");
        match self.http.get_text(page_url) {
            Ok(html) => {
                let link = extract_direct_link(&Html::parse_document(&html), site);
                if link.is_none() {
                    log::debug!("no APK link on {page_url}");
                }
                link
            }
            Err(e) => {
                log::warn!("download page {page_url} failed: {e}");
                None
            }
        }
    }

    fn pause(&self) {
        if !self.pacing.is_zero() {
            (self.sleep)(self.pacing);
        }
    }
}

/// The download index URL for a landing page.
///
/// # Examples
///
/// ```
/// use apk_relay::resolver::download_index_url;
///
/// assert_eq!(
///     download_index_url("https://getmodsapk.com/example-app/"),
///     "https://getmodsapk.com/example-app/download/"
/// );
/// ```
#[must_use]
pub fn download_index_url(landing_url: &str) -> String {
    format!("{}/download/", landing_url.trim().trim_end_matches('/'))
}
