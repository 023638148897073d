//! Publishing a fetched APK as the sole asset of a tagged release.
//!
//! A release is reused when its tag already exists; every asset on it is
//! deleted before the new file is uploaded, so a republish never leaves
//! stale duplicates behind. A failure at any step aborts the publish; the
//! release may be left without assets in that case.

use crate::fetcher::MIN_APK_SIZE;
use crate::release::{NewRelease, Release, ReleaseApi, ReleaseApiError, ReleaseAsset};
use std::fmt;
use std::path::{Path, PathBuf};

/// Content type used for APK uploads.
pub const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

/// What to publish, and where.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Repository identifier in `owner/name` form.
    pub repository: &'a str,
    /// The APK to attach.
    pub file: &'a Path,
    /// Release tag.
    pub tag: &'a str,
    /// Version label used in the release title and notes.
    pub version_label: &'a str,
}

/// A successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRelease {
    /// The release the asset was attached to.
    pub release: Release,
    /// The uploaded asset.
    pub asset: ReleaseAsset,
    /// How many previous assets were deleted.
    pub replaced_assets: usize,
    /// Whether the release was created by this publish.
    pub created: bool,
}

/// The API step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    /// Looking up the release by tag.
    Lookup,
    /// Listing the existing assets.
    ListAssets,
    /// Deleting an existing asset.
    DeleteAsset,
    /// Creating the release.
    Create,
    /// Uploading the new asset.
    Upload,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::Lookup => "release lookup",
            Self::ListAssets => "asset listing",
            Self::DeleteAsset => "asset deletion",
            Self::Create => "release creation",
            Self::Upload => "asset upload",
        };
        f.write_str(step)
    }
}

/// Errors that abort a publish.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The file to publish does not exist.
    #[error("file to publish does not exist: {path}")]
    MissingFile {
        /// The missing path.
        path: PathBuf,
    },

    /// The file to publish is too small to be an APK.
    #[error("file {path} is only {size} bytes (minimum {minimum})")]
    TooSmall {
        /// The rejected file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
        /// The minimum accepted size.
        minimum: u64,
    },

    /// A release API call failed.
    #[error("{step} failed: {source}")]
    Api {
        /// The step that failed.
        step: PublishStep,
        /// The underlying API error.
        #[source]
        source: ReleaseApiError,
    },
}

/// Publishes `request.file` as the only asset on the release for
/// `request.tag`, creating the release when needed.
///
/// # Errors
///
/// Returns [`PublishError`] when the file is unusable or any API step fails.
pub fn publish(
    api: &dyn ReleaseApi,
    request: &PublishRequest<'_>,
) -> Result<PublishedRelease, PublishError> {
    let asset_name = validate_file(request.file)?;
    let step = |step: PublishStep| move |source: ReleaseApiError| PublishError::Api { step, source };

    let existing = api
        .find_release_by_tag(request.repository, request.tag)
        .map_err(step(PublishStep::Lookup))?;

    let (release, replaced_assets, created) = if let Some(release) = existing {
        let replaced = clear_assets(api, request.repository, &release)?;
        (release, replaced, false)
    } else {
        log::info!(
            "creating release {} in {}",
            request.tag,
            request.repository
        );
        let new_release = NewRelease {
            tag_name: request.tag.to_owned(),
            name: release_title(request.file, request.version_label),
            body: release_body(request.version_label),
            draft: false,
            prerelease: false,
        };
        let release = api
            .create_release(request.repository, &new_release)
            .map_err(step(PublishStep::Create))?;
        (release, 0, true)
    };

    let asset = api
        .upload_asset(&release, &asset_name, APK_CONTENT_TYPE, request.file)
        .map_err(step(PublishStep::Upload))?;
    log::info!("uploaded {} to release {}", asset.name, release.tag_name);

    Ok(PublishedRelease {
        release,
        asset,
        replaced_assets,
        created,
    })
}

fn clear_assets(
    api: &dyn ReleaseApi,
    repository: &str,
    release: &Release,
) -> Result<usize, PublishError> {
    let assets = api
        .list_assets(repository, release)
        .map_err(|source| PublishError::Api {
            step: PublishStep::ListAssets,
            source,
        })?;
    for asset in &assets {
        log::debug!("deleting asset {} from {}", asset.name, release.tag_name);
        api.delete_asset(repository, asset)
            .map_err(|source| PublishError::Api {
                step: PublishStep::DeleteAsset,
                source,
            })?;
    }
    Ok(assets.len())
}

/// Checks the file exists and is large enough; returns its base name.
fn validate_file(file: &Path) -> Result<String, PublishError> {
    let metadata = std::fs::metadata(file).map_err(|_| PublishError::MissingFile {
        path: file.to_path_buf(),
    })?;
    if !metadata.is_file() {
        return Err(PublishError::MissingFile {
            path: file.to_path_buf(),
        });
    }
    if metadata.len() < MIN_APK_SIZE {
        return Err(PublishError::TooSmall {
            path: file.to_path_buf(),
            size: metadata.len(),
            minimum: MIN_APK_SIZE,
        });
    }
    Ok(file_name(file))
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Release title: the file's base name without `.apk`, then the version.
///
/// # Examples
///
/// ```
/// use apk_relay::publisher::release_title;
/// use std::path::Path;
///
/// assert_eq!(
///     release_title(Path::new("downloads/example-app-1.0.2.apk"), "1.0.2"),
///     "example-app-1.0.2 1.0.2"
/// );
/// ```
#[must_use]
pub fn release_title(file: &Path, version_label: &str) -> String {
    let name = file_name(file);
    let stem = name.strip_suffix(".apk").unwrap_or(&name);
    format!("{stem} {version_label}")
}

/// Release notes for an automatically published APK.
#[must_use]
pub fn release_body(version_label: &str) -> String {
    format!("Auto-updated APK - Version {version_label}")
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
