//! Publishing settings read from the environment.
//!
//! The environment is read once at start-up; the rest of the crate only
//! sees [`PublishSettings`].

use crate::error::{RelayError, Result};
use crate::release::github::{DEFAULT_API_URL, GitHubReleases};

/// Token used to authenticate release API calls.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Target repository in `owner/name` form.
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Optional API root override (GitHub Enterprise).
pub const API_URL_ENV: &str = "GITHUB_API_URL";

/// Credentials and target for publishing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PublishSettings {
    token: Option<String>,
    repository: Option<String>,
    api_url: Option<String>,
}

impl std::fmt::Debug for PublishSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl PublishSettings {
    /// Reads the settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`. Empty values count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Self {
            token: read(TOKEN_ENV),
            repository: read(REPOSITORY_ENV),
            api_url: read(API_URL_ENV),
        }
    }

    /// The API token, when publishing is enabled.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The target repository, if configured.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// The API root, defaulting to the public GitHub API.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Builds the release client when a token is configured.
    ///
    /// Returns `Ok(None)` without a token, so downloads proceed unpublished.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingRepository`] when a token is set without
    /// a target repository.
    pub fn release_client(&self, agent: &ureq::Agent) -> Result<Option<GitHubReleases>> {
        let Some(token) = self.token() else {
            log::warn!("{TOKEN_ENV} is not set; downloads will not be published");
            return Ok(None);
        };
        if self.repository().is_none() {
            return Err(RelayError::MissingRepository);
        }
        Ok(Some(GitHubReleases::with_api_url(
            agent.clone(),
            token,
            self.api_url(),
        )))
    }
}
