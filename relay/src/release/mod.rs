//! Release hosting abstraction.
//!
//! The publisher talks to the hosting platform through [`ReleaseApi`] so
//! that tests can record calls without network access. [`github`] provides
//! the production implementation against the GitHub REST API.
//!
//! # Sub-modules
//!
//! - [`github`] - `ureq`-based GitHub releases client.

pub mod github;

use crate::http::HttpError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A release as reported by the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Platform identifier of the release.
    pub id: u64,
    /// Tag the release is attached to.
    pub tag_name: String,
    /// Human-readable title.
    #[serde(default)]
    pub name: Option<String>,
    /// URI template for asset uploads.
    #[serde(default)]
    pub upload_url: String,
}

/// A binary attachment on a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Platform identifier of the asset.
    pub id: u64,
    /// File name of the asset.
    pub name: String,
    /// Size in bytes, when reported.
    #[serde(default)]
    pub size: u64,
}

/// Parameters for creating a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    /// Tag to create the release at.
    pub tag_name: String,
    /// Human-readable title.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Whether the release is a draft.
    pub draft: bool,
    /// Whether the release is marked as a prerelease.
    pub prerelease: bool,
}

/// Operations on a repository's releases.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseApi {
    /// Looks up the release for `tag`; `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup itself fails.
    fn find_release_by_tag(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<Release>, ReleaseApiError>;

    /// Creates a release.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform rejects the request.
    fn create_release(
        &self,
        repository: &str,
        release: &NewRelease,
    ) -> Result<Release, ReleaseApiError>;

    /// Lists the assets attached to `release`.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing fails.
    fn list_assets(
        &self,
        repository: &str,
        release: &Release,
    ) -> Result<Vec<ReleaseAsset>, ReleaseApiError>;

    /// Deletes one asset.
    ///
    /// # Errors
    ///
    /// Returns an error when the deletion fails.
    fn delete_asset(&self, repository: &str, asset: &ReleaseAsset) -> Result<(), ReleaseApiError>;

    /// Uploads the file at `path` to `release` as `name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or the upload fails.
    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<ReleaseAsset, ReleaseApiError>;
}

/// Errors arising from release API calls.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseApiError {
    /// The HTTP request failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body was not the expected JSON.
    #[error("unexpected response from {url}: {reason}")]
    Decode {
        /// The requested URL.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// The configured API root is not an absolute URL.
    #[error("invalid API URL {url}: {reason}")]
    InvalidApiUrl {
        /// The configured API root.
        url: String,
        /// Description of the problem.
        reason: String,
    },

    /// A release carried an unusable upload URL.
    #[error("invalid upload URL {url}: {reason}")]
    InvalidUploadUrl {
        /// The upload URL template.
        url: String,
        /// Description of the problem.
        reason: String,
    },

    /// The asset file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the asset file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
