//! Shared test utilities for the relay crate.
//!
//! [`StubHttp`] serves canned pages and file bodies keyed by URL and
//! records every request. [`RecordingReleases`] is an in-memory release
//! host that can be told to fail at a given publish step.

use crate::fetcher::ZIP_SIGNATURE;
use crate::http::{HttpClient, HttpError};
use crate::publisher::PublishStep;
use crate::release::{NewRelease, Release, ReleaseApi, ReleaseApiError, ReleaseAsset};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// Returns `len` bytes that start with the ZIP signature.
#[must_use]
pub fn apk_bytes(len: usize) -> Vec<u8> {
    let mut bytes = ZIP_SIGNATURE.to_vec();
    bytes.resize(len.max(ZIP_SIGNATURE.len()), 0x5A);
    bytes.truncate(len);
    bytes
}

/// An [`HttpClient`] answering from fixed maps of URL to content.
///
/// Unknown URLs answer with [`HttpError::NotFound`].
#[derive(Debug, Default)]
pub struct StubHttp {
    pages: HashMap<String, String>,
    bodies: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubHttp {
    /// Creates a stub that knows no URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for text requests to `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Serves `body` for streamed requests to `url`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.bodies.insert(url.into(), body);
        self
    }

    /// Every URL requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// How many times `url` was requested.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|requested| *requested == url)
            .count()
    }

    fn record(&self, url: &str) {
        self.requests.borrow_mut().push(url.to_owned());
    }
}

impl HttpClient for StubHttp {
    fn get_text(&self, url: &str) -> Result<String, HttpError> {
        self.record(url);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| HttpError::NotFound {
                url: url.to_owned(),
            })
    }

    fn get_stream(&self, url: &str) -> Result<Box<dyn Read>, HttpError> {
        self.record(url);
        self.bodies
            .get(url)
            .map(|body| Box::new(Cursor::new(body.clone())) as Box<dyn Read>)
            .ok_or_else(|| HttpError::NotFound {
                url: url.to_owned(),
            })
    }
}

/// A download site for one package, laid out the way the resolver expects.
#[derive(Debug, Clone)]
pub struct StubSite {
    /// Landing page URL.
    pub landing_url: String,
    /// Version advertised on the landing page, if any.
    pub version: Option<String>,
    /// Direct file URL served by the per-version download page.
    pub apk_url: String,
    /// File body served at `apk_url`.
    pub apk: Vec<u8>,
}

impl StubSite {
    /// A site at `landing_url` advertising `version` and serving a
    /// well-formed APK.
    #[must_use]
    pub fn new(landing_url: &str, version: Option<&str>) -> Self {
        let landing_url = landing_url.trim_end_matches('/').to_owned();
        Self {
            apk_url: format!("{landing_url}/files/package.apk"),
            landing_url,
            version: version.map(str::to_owned),
            apk: apk_bytes(4096),
        }
    }

    /// Replaces the served file body.
    #[must_use]
    pub fn with_apk(mut self, apk: Vec<u8>) -> Self {
        self.apk = apk;
        self
    }

    /// URL of the per-version download page linked from the index.
    #[must_use]
    pub fn candidate_url(&self) -> String {
        format!("{}/download/101/", self.landing_url)
    }

    /// Adds this site's pages and file to `http`.
    #[must_use]
    pub fn install(&self, http: StubHttp) -> StubHttp {
        let title = match &self.version {
            Some(version) => format!("Example App v{version} MOD APK"),
            None => "Example App MOD APK".to_owned(),
        };
        http.with_page(
            self.landing_url.clone(),
            format!("<html><head><title>{title}</title></head><body></body></html>"),
        )
        .with_page(
            format!("{}/download/", self.landing_url),
            format!(
                r#"<html><body><a href="{}">Latest build</a></body></html>"#,
                self.candidate_url()
            ),
        )
        .with_page(
            self.candidate_url(),
            format!(
                r#"<html><body><a href="{}">Get APK</a></body></html>"#,
                self.apk_url
            ),
        )
        .with_body(self.apk_url.clone(), self.apk.clone())
    }
}

/// An in-memory [`ReleaseApi`] that records the calls made against it.
#[derive(Debug, Default)]
pub struct RecordingReleases {
    releases: RefCell<Vec<(Release, Vec<ReleaseAsset>)>>,
    failing_step: Option<PublishStep>,
    calls: RefCell<Vec<String>>,
    next_id: Cell<u64>,
}

impl RecordingReleases {
    /// Creates a host with no releases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(100),
            ..Self::default()
        }
    }

    /// Adds an existing release for `tag` carrying assets named `assets`.
    #[must_use]
    pub fn with_release(self, tag: &str, assets: &[&str]) -> Self {
        let release = self.release_for(tag);
        let assets = assets
            .iter()
            .map(|name| ReleaseAsset {
                id: self.next_id(),
                name: (*name).to_owned(),
                size: 2048,
            })
            .collect();
        self.releases.borrow_mut().push((release, assets));
        self
    }

    /// Makes every call belonging to `step` fail with a server error.
    #[must_use]
    pub fn failing_at(mut self, step: PublishStep) -> Self {
        self.failing_step = Some(step);
        self
    }

    /// Calls made so far, as `"<operation> <subject>"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Names of the assets currently attached to the release for `tag`.
    #[must_use]
    pub fn asset_names(&self, tag: &str) -> Vec<String> {
        self.releases
            .borrow()
            .iter()
            .find(|(release, _)| release.tag_name == tag)
            .map(|(_, assets)| assets.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn release_for(&self, tag: &str) -> Release {
        let id = self.next_id();
        Release {
            id,
            tag_name: tag.to_owned(),
            name: Some(tag.to_owned()),
            upload_url: format!(
                "https://uploads.test/repos/owner/repo/releases/{id}/assets{{?name,label}}"
            ),
        }
    }

    fn call(&self, step: PublishStep, description: String) -> Result<(), ReleaseApiError> {
        self.calls.borrow_mut().push(description);
        if self.failing_step == Some(step) {
            return Err(ReleaseApiError::Http(HttpError::Status {
                url: format!("https://api.test/{step}"),
                code: 500,
            }));
        }
        Ok(())
    }
}

impl ReleaseApi for RecordingReleases {
    fn find_release_by_tag(
        &self,
        _repository: &str,
        tag: &str,
    ) -> Result<Option<Release>, ReleaseApiError> {
        self.call(PublishStep::Lookup, format!("lookup {tag}"))?;
        Ok(self
            .releases
            .borrow()
            .iter()
            .find(|(release, _)| release.tag_name == tag)
            .map(|(release, _)| release.clone()))
    }

    fn create_release(
        &self,
        _repository: &str,
        release: &NewRelease,
    ) -> Result<Release, ReleaseApiError> {
        self.call(PublishStep::Create, format!("create {}", release.tag_name))?;
        let mut created = self.release_for(&release.tag_name);
        created.name = Some(release.name.clone());
        self.releases
            .borrow_mut()
            .push((created.clone(), Vec::new()));
        Ok(created)
    }

    fn list_assets(
        &self,
        _repository: &str,
        release: &Release,
    ) -> Result<Vec<ReleaseAsset>, ReleaseApiError> {
        self.call(PublishStep::ListAssets, format!("list {}", release.tag_name))?;
        Ok(self
            .releases
            .borrow()
            .iter()
            .find(|(known, _)| known.id == release.id)
            .map(|(_, assets)| assets.clone())
            .unwrap_or_default())
    }

    fn delete_asset(&self, _repository: &str, asset: &ReleaseAsset) -> Result<(), ReleaseApiError> {
        self.call(PublishStep::DeleteAsset, format!("delete {}", asset.name))?;
        for (_, assets) in self.releases.borrow_mut().iter_mut() {
            assets.retain(|known| known.id != asset.id);
        }
        Ok(())
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        _content_type: &str,
        path: &Path,
    ) -> Result<ReleaseAsset, ReleaseApiError> {
        self.call(PublishStep::Upload, format!("upload {name}"))?;
        let size = std::fs::metadata(path)
            .map_err(|source| ReleaseApiError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let asset = ReleaseAsset {
            id: self.next_id(),
            name: name.to_owned(),
            size,
        };
        let mut releases = self.releases.borrow_mut();
        if let Some((_, assets)) = releases.iter_mut().find(|(known, _)| known.id == release.id) {
            assets.push(asset.clone());
        }
        Ok(asset)
    }
}
