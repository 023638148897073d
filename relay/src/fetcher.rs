//! APK download to local storage.
//!
//! Bodies are streamed in fixed-size chunks into a temporary file beside
//! the destination, so peak memory does not grow with the file. The file is
//! checked for a plausible size before it is renamed into place; a failed
//! or undersized download never replaces an earlier copy. The ZIP
//! local-file-header signature that every APK starts with is checked too.

use crate::http::{HttpClient, HttpError};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Smallest file accepted as an APK, in bytes.
pub const MIN_APK_SIZE: u64 = 1024;

/// ZIP local-file-header signature (`PK\x03\x04`).
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Default directory for downloaded files.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

const CHUNK_SIZE: usize = 8192;

/// A downloaded file on local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Where the file was written.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// The first four bytes of the file.
    pub signature: [u8; 4],
}

impl FetchedFile {
    /// Returns `true` when the file starts with the ZIP signature.
    #[must_use]
    pub fn has_zip_signature(&self) -> bool {
        self.signature == ZIP_SIGNATURE
    }
}

/// Errors that make a download unusable.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request failed.
    #[error("download failed: {0}")]
    Http(#[from] HttpError),

    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file or directory being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The downloaded file is too small to be an APK.
    #[error("downloaded file {path} is only {size} bytes (minimum {minimum})")]
    TooSmall {
        /// The destination that was not written.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
        /// The minimum accepted size.
        minimum: u64,
    },
}

/// Appends `.apk` to `name` unless it already ends with it.
///
/// # Examples
///
/// ```
/// use apk_relay::fetcher::apk_file_name;
///
/// assert_eq!(apk_file_name("app-1.0.0"), "app-1.0.0.apk");
/// assert_eq!(apk_file_name("app-1.0.0.APK"), "app-1.0.0.APK");
/// ```
#[must_use]
pub fn apk_file_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".apk") {
        name.to_owned()
    } else {
        format!("{name}.apk")
    }
}

/// File name for a package at a given version: lower-case, spaces replaced
/// by dashes.
///
/// # Examples
///
/// ```
/// use apk_relay::fetcher::package_file_name;
///
/// assert_eq!(package_file_name("Example App", "1.0.2"), "example-app-1.0.2.apk");
/// ```
#[must_use]
pub fn package_file_name(name: &str, version: &str) -> String {
    let slug = name.trim().replace(' ', "-").to_lowercase();
    apk_file_name(&format!("{slug}-{version}"))
}

/// Downloads `url` into `dest_dir` as `suggested_name` (with `.apk`
/// appended when missing).
///
/// A missing ZIP signature is logged as a warning only: proxies and CDNs
/// occasionally wrap perfectly good files.
///
/// # Errors
///
/// Returns [`FetchError::TooSmall`] for files under [`MIN_APK_SIZE`], and
/// HTTP or I/O errors otherwise.
pub fn fetch(
    http: &dyn HttpClient,
    url: &str,
    suggested_name: &str,
    dest_dir: &Path,
) -> Result<FetchedFile, FetchError> {
    std::fs::create_dir_all(dest_dir).map_err(|source| FetchError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    let path = dest_dir.join(apk_file_name(suggested_name));

    log::info!("downloading {url} to {}", path.display());
    let mut body = http.get_stream(url)?;
    let io_error = |source| FetchError::Io {
        path: path.clone(),
        source,
    };
    let mut part = NamedTempFile::new_in(dest_dir).map_err(io_error)?;
    let (size, signature) = stream_to(&mut *body, part.as_file_mut()).map_err(io_error)?;

    if size < MIN_APK_SIZE {
        return Err(FetchError::TooSmall {
            path,
            size,
            minimum: MIN_APK_SIZE,
        });
    }
    part.persist(&path).map_err(|e| io_error(e.error))?;

    let fetched = FetchedFile {
        path,
        size,
        signature,
    };
    if !fetched.has_zip_signature() {
        log::warn!(
            "{} does not start with the ZIP signature (found {:02X?}); keeping it anyway",
            fetched.path.display(),
            fetched.signature
        );
    }
    log::info!(
        "downloaded {} ({} bytes)",
        fetched.path.display(),
        fetched.size
    );
    Ok(fetched)
}

/// Copies `reader` into `file` in [`CHUNK_SIZE`] chunks and returns the
/// byte count and the leading signature bytes.
fn stream_to(reader: &mut dyn Read, file: &mut std::fs::File) -> std::io::Result<(u64, [u8; 4])> {
    let mut writer = BufWriter::new(file);
    let mut buffer = [0_u8; CHUNK_SIZE];
    let mut signature = [0_u8; 4];
    let mut size: u64 = 0;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        capture_signature(&mut signature, size, chunk);
        writer.write_all(chunk)?;
        size = size.saturating_add(read as u64);
    }

    writer.flush()?;
    Ok((size, signature))
}

/// Fills the signature bytes that fall within `chunk`, which starts at
/// byte `offset` of the file.
fn capture_signature(signature: &mut [u8; 4], offset: u64, chunk: &[u8]) {
    let Ok(start) = usize::try_from(offset) else {
        return;
    };
    for (slot, byte) in signature.iter_mut().skip(start).zip(chunk) {
        *slot = *byte;
    }
}
