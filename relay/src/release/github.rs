//! GitHub REST implementation of [`ReleaseApi`].

use super::{NewRelease, Release, ReleaseApi, ReleaseApiError, ReleaseAsset};
use crate::http::{HttpError, map_ureq_error};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use url::Url;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!("apk-relay/", env!("CARGO_PKG_VERSION"));
/// Largest page size the releases API accepts.
const ASSETS_PER_PAGE: usize = 100;

/// Release client authenticated with a personal or workflow token.
pub struct GitHubReleases {
    agent: ureq::Agent,
    token: String,
    api_url: String,
}

impl GitHubReleases {
    /// Creates a client for the public GitHub API.
    #[must_use]
    pub fn new(agent: ureq::Agent, token: impl Into<String>) -> Self {
        Self::with_api_url(agent, token, DEFAULT_API_URL)
    }

    /// Creates a client for an explicit API root (GitHub Enterprise).
    #[must_use]
    pub fn with_api_url(
        agent: ureq::Agent,
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Builds `<api>/repos/<owner>/<repo>/<segments...>`, percent-encoding
    /// each segment.
    fn repo_endpoint(&self, repository: &str, segments: &[&str]) -> Result<Url, ReleaseApiError> {
        let invalid = |reason: String| ReleaseApiError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.api_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_owned()))?
            .pop_if_empty()
            .push("repos")
            .extend(repository.split('/'))
            .extend(segments);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ReleaseApiError> {
        log::trace!("GET {url}");
        let response = self
            .agent
            .get(url)
            .header("Authorization", self.authorization())
            .header("Accept", ACCEPT_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", CLIENT_USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        decode_json(url, response)
    }
}

impl ReleaseApi for GitHubReleases {
    fn find_release_by_tag(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<Release>, ReleaseApiError> {
        let url = self.repo_endpoint(repository, &["releases", "tags", tag])?;
        match self.get_json(url.as_str()) {
            Ok(release) => Ok(Some(release)),
            Err(ReleaseApiError::Http(HttpError::NotFound { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_release(
        &self,
        repository: &str,
        release: &NewRelease,
    ) -> Result<Release, ReleaseApiError> {
        let url = self.repo_endpoint(repository, &["releases"])?;
        log::trace!("POST {url}");
        let response = self
            .agent
            .post(url.as_str())
            .header("Authorization", self.authorization())
            .header("Accept", ACCEPT_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", CLIENT_USER_AGENT)
            .send_json(release)
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        decode_json(url.as_str(), response)
    }

    fn list_assets(
        &self,
        repository: &str,
        release: &Release,
    ) -> Result<Vec<ReleaseAsset>, ReleaseApiError> {
        let release_id = release.id.to_string();
        let base = self.repo_endpoint(repository, &["releases", &release_id, "assets"])?;
        collect_pages(|page| {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &ASSETS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            self.get_json(url.as_str())
        })
    }

    fn delete_asset(&self, repository: &str, asset: &ReleaseAsset) -> Result<(), ReleaseApiError> {
        let asset_id = asset.id.to_string();
        let url = self.repo_endpoint(repository, &["releases", "assets", &asset_id])?;
        log::trace!("DELETE {url}");
        self.agent
            .delete(url.as_str())
            .header("Authorization", self.authorization())
            .header("Accept", ACCEPT_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", CLIENT_USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        Ok(())
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<ReleaseAsset, ReleaseApiError> {
        let url = upload_endpoint(&release.upload_url, name)?;
        let io_error = |source| ReleaseApiError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let length = file.metadata().map_err(io_error)?.len();
        log::trace!("POST {url} ({length} bytes)");
        let response = self
            .agent
            .post(url.as_str())
            .header("Authorization", self.authorization())
            .header("Accept", ACCEPT_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", CLIENT_USER_AGENT)
            .header("Content-Type", content_type)
            .header("Content-Length", length.to_string())
            .send(file)
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        decode_json(url.as_str(), response)
    }
}

/// Calls `fetch_page` with page numbers from 1 until a page comes back
/// shorter than [`ASSETS_PER_PAGE`], and concatenates the results.
fn collect_pages<T>(
    mut fetch_page: impl FnMut(u32) -> Result<Vec<T>, ReleaseApiError>,
) -> Result<Vec<T>, ReleaseApiError> {
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page)?;
        let last = batch.len() < ASSETS_PER_PAGE;
        items.extend(batch);
        if last {
            return Ok(items);
        }
        page += 1;
    }
}

fn decode_json<T: DeserializeOwned>(
    url: &str,
    response: ureq::http::Response<ureq::Body>,
) -> Result<T, ReleaseApiError> {
    response
        .into_body()
        .read_json::<T>()
        .map_err(|e| ReleaseApiError::Decode {
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

/// Expands a release `upload_url` template for an asset called `name`.
///
/// GitHub reports upload URLs as RFC 6570 templates such as
/// `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`.
///
/// # Errors
///
/// Returns [`ReleaseApiError::InvalidUploadUrl`] when the template does not
/// contain an absolute URL.
pub fn upload_endpoint(template: &str, name: &str) -> Result<Url, ReleaseApiError> {
    let base = template.split('{').next().unwrap_or(template);
    Url::parse_with_params(base, &[("name", name), ("label", name)]).map_err(|e| {
        ReleaseApiError::InvalidUploadUrl {
            url: template.to_owned(),
            reason: e.to_string(),
        }
    })
}
