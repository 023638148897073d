//! Blocking HTTP session shared by the scraper, fetcher, and release client.
//!
//! The session is constructed explicitly and passed by reference; there is
//! no process-wide client. Consumers depend on the [`HttpClient`] trait so
//! that tests can substitute canned pages and bodies.

use std::io::Read;
use std::time::Duration;

/// Browser identity sent with every scraping request.
pub const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
);

/// Timeout for connecting and receiving response headers.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for receiving a complete response body, sized for APK downloads.
pub const BODY_TIMEOUT: Duration = Duration::from_mins(5);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Read-only HTTP operations needed by the scraper and the file fetcher.
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient {
    /// Fetch `url` and return the decoded body text.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and non-success statuses.
    fn get_text(&self, url: &str) -> Result<String, HttpError>;

    /// Fetch `url` and return a reader over the undecoded body.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and non-success statuses.
    fn get_stream(&self, url: &str) -> Result<Box<dyn Read>, HttpError>;
}

/// Errors arising from HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The server answered 404.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The server answered with another non-success status.
    #[error("request to {url} failed with status {code}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        code: u16,
    },

    /// The request failed before a status was received, or the body could
    /// not be read.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// `ureq`-backed session with a cookie jar and browser-like headers.
#[derive(Clone)]
pub struct HttpSession {
    agent: ureq::Agent,
}

impl HttpSession {
    /// Builds a session with the default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(REQUEST_TIMEOUT, BODY_TIMEOUT)
    }

    /// Builds a session with explicit timeouts.
    ///
    /// `request` bounds connecting and waiting for response headers; `body`
    /// bounds reading the response body.
    #[must_use]
    pub fn with_timeouts(request: Duration, body: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(request))
            .timeout_recv_response(Some(request))
            .timeout_recv_body(Some(body))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// The underlying agent, shared with the release API client so both
    /// use the same connection pool.
    #[must_use]
    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }

    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, HttpError> {
        log::trace!("GET {url}");
        self.agent
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", ACCEPT_HTML)
            .call()
            .map_err(|e| map_ureq_error(url, &e))
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HttpSession {
    fn get_text(&self, url: &str) -> Result<String, HttpError> {
        self.get(url)?
            .into_body()
            .read_to_string()
            .map_err(|e| HttpError::Transport {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    fn get_stream(&self, url: &str) -> Result<Box<dyn Read>, HttpError> {
        let response = self.get(url)?;
        Ok(Box::new(response.into_body().into_reader()))
    }
}

/// Map a ureq error to an [`HttpError`].
pub(crate) fn map_ureq_error(url: &str, err: &ureq::Error) -> HttpError {
    match err {
        ureq::Error::StatusCode(404) => HttpError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(code) => HttpError::Status {
            url: url.to_owned(),
            code: *code,
        },
        other => HttpError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/page", &err);
        assert!(matches!(mapped, HttpError::NotFound { .. }));
    }

    #[rstest]
    #[case(403)]
    #[case(500)]
    #[case(503)]
    fn map_ureq_error_keeps_other_status_codes(#[case] code: u16) {
        let err = ureq::Error::StatusCode(code);
        let mapped = map_ureq_error("https://example.test/page", &err);
        assert!(matches!(mapped, HttpError::Status { code: c, .. } if c == code));
    }

    #[test]
    fn status_error_message_names_url_and_code() {
        let err = HttpError::Status {
            url: "https://example.test/page".to_owned(),
            code: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.test/page"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn user_agent_looks_like_a_browser() {
        assert!(BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(BROWSER_USER_AGENT.contains("Chrome/"));
    }
}
