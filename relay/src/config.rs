//! Tracked package configuration.
//!
//! The configuration is a small JSON document with a single `tracked_apks`
//! array. It is read wholesale at the start of a run and written wholesale
//! after each successful publish. There is no locking: concurrent runs must
//! be prevented by whatever schedules them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/apk-list.json";

/// One package mirrored from the download site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedPackage {
    /// Human-readable package name, also used to derive file names.
    pub name: String,
    /// Landing page of the package on the download site.
    pub base_url: String,
    /// Release tag the APK is published under.
    pub release_tag: String,
    /// Version of the last successfully published APK.
    pub current_version: String,
    /// Keys this tool does not interpret, preserved on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackedPackage {
    /// Creates a package entry with no extra metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_relay::config::TrackedPackage;
    ///
    /// let package = TrackedPackage::new(
    ///     "Example App",
    ///     "https://getmodsapk.com/example-app",
    ///     "example-app",
    ///     "1.0.0",
    /// );
    /// assert_eq!(package.current_version, "1.0.0");
    /// ```
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        release_tag: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            release_tag: release_tag.into(),
            current_version: current_version.into(),
            extra: Map::new(),
        }
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Packages in the order they are processed.
    pub tracked_apks: Vec<TrackedPackage>,
    /// Top-level keys this tool does not interpret, preserved on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Wraps a package list in a configuration document.
    #[must_use]
    pub fn new(tracked_apks: Vec<TrackedPackage>) -> Self {
        Self {
            tracked_apks,
            extra: Map::new(),
        }
    }

    /// Records a newly published version for the package at `index`.
    ///
    /// Returns `false` when the index is out of range.
    pub fn set_current_version(&mut self, index: usize, version: &str) -> bool {
        match self.tracked_apks.get_mut(index) {
            Some(package) => {
                version.clone_into(&mut package.current_version);
                true
            }
            None => false,
        }
    }
}

/// Errors that prevent the configuration from being read or written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid configuration document.
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the configuration failed.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Loads the configuration document from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file is missing or unreadable and
/// [`ConfigError::Parse`] when it is not a valid document.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "loaded {} tracked package(s) from {}",
        config.tracked_apks.len(),
        path.display()
    );
    Ok(config)
}

/// Writes the whole configuration document to `path`.
///
/// Parent directories are created when missing.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] or [`ConfigError::Write`] on failure.
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut json = serde_json::to_string_pretty(config)
        .map_err(|source| ConfigError::Serialize { source })?;
    json.push('\n');
    std::fs::write(path, json).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
