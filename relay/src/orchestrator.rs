//! Per-package relay: version check, link resolution, download, publish
//! and configuration update.
//!
//! Each package runs through
//! `check version → resolve link → fetch → publish → update config`, stopping
//! at the first step that has nothing more to do. Failures are isolated: one
//! package failing never prevents the next from being processed, and the
//! stored version only advances after a successful publish.

use crate::config::{Config, TrackedPackage, save_config};
use crate::fetcher::{DEFAULT_DOWNLOAD_DIR, fetch, package_file_name};
use crate::http::HttpClient;
use crate::output::write_stderr_line;
use crate::publisher::{PublishRequest, publish};
use crate::release::ReleaseApi;
use crate::resolver::{DEFAULT_PACING, LinkResolution, LinkResolver};
use crate::version::{VersionMatch, package_version};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Version label used when a manual download advertises no version.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Run options shared by every mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOptions {
    /// Directory downloaded files are written to.
    pub download_dir: PathBuf,
    /// Process packages even when the version has not changed.
    pub force: bool,
    /// How stored and scraped versions are compared.
    pub version_match: VersionMatch,
    /// Delay between successive candidate page fetches.
    pub pacing: Duration,
    /// Suppress status lines on stderr.
    pub quiet: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            force: false,
            version_match: VersionMatch::default(),
            pacing: DEFAULT_PACING,
            quiet: false,
        }
    }
}

/// Release host and target repository. Absent when no token is configured.
#[derive(Clone, Copy)]
pub struct Publishing<'a> {
    /// The release API client.
    pub api: &'a dyn ReleaseApi,
    /// Repository in `owner/name` form.
    pub repository: &'a str,
}

/// An ad hoc download that bypasses the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRequest {
    /// Landing page URL.
    pub url: String,
    /// Release tag to publish under.
    pub tag: String,
    /// Display name, also used for the file name.
    pub name: String,
}

/// What happened to one package.
///
/// Deliberately not a `Result`: every variant is an expected end state and
/// the run carries on with the next package regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// The scraped version matches the stored one.
    Unchanged {
        /// The version on both sides.
        version: String,
    },
    /// No version could be read from the landing page.
    VersionNotFound,
    /// No direct download link was found.
    LinkNotFound {
        /// Why resolution gave up.
        reason: String,
    },
    /// The download failed or produced an unusable file.
    FetchFailed {
        /// Description of the failure.
        reason: String,
    },
    /// The file was fetched but publishing is disabled.
    PublishSkipped {
        /// Version of the fetched file.
        version: String,
        /// Where the file was written.
        file: PathBuf,
    },
    /// Publishing the file failed.
    PublishFailed {
        /// Description of the failure.
        reason: String,
    },
    /// The release was published but the configuration could not be saved.
    PersistFailed {
        /// The published version.
        version: String,
        /// Description of the save failure.
        reason: String,
    },
    /// The release was published and the stored version advanced.
    Updated {
        /// The published version.
        version: String,
        /// The published file.
        file: PathBuf,
    },
}

impl PackageOutcome {
    /// Returns `true` for outcomes that indicate something went wrong.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LinkNotFound { .. }
                | Self::FetchFailed { .. }
                | Self::PublishFailed { .. }
                | Self::PersistFailed { .. }
        )
    }

    /// Returns `true` when a new release was published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Updated { .. } | Self::PersistFailed { .. })
    }
}

impl fmt::Display for PackageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged { version } => write!(f, "unchanged at {version}"),
            Self::VersionNotFound => f.write_str("no version found"),
            Self::LinkNotFound { reason } => write!(f, "no download link: {reason}"),
            Self::FetchFailed { reason } => write!(f, "download failed: {reason}"),
            Self::PublishSkipped { version, file } => write!(
                f,
                "fetched {version} to {} (publishing disabled)",
                file.display()
            ),
            Self::PublishFailed { reason } => write!(f, "publish failed: {reason}"),
            Self::PersistFailed { version, reason } => {
                write!(f, "published {version} but config not saved: {reason}")
            }
            Self::Updated { version, .. } => write!(f, "updated to {version}"),
        }
    }
}

/// The outcome for one named package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Package display name.
    pub name: String,
    /// What happened to it.
    pub outcome: PackageOutcome,
}

/// Outcomes of an automatic run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// One report per tracked package.
    pub reports: Vec<PackageReport>,
}

impl RunSummary {
    /// Number of packages published and recorded in the configuration.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Updated { .. }))
    }

    /// Number of packages published whose new version could not be saved.
    #[must_use]
    pub fn unrecorded(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::PersistFailed { .. }))
    }

    /// Number of packages that failed before anything was published.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| outcome.is_failure() && !outcome.is_published())
    }

    fn count(&self, predicate: impl Fn(&PackageOutcome) -> bool) -> usize {
        self.reports
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    /// One-line human-readable summary.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_relay::orchestrator::RunSummary;
    ///
    /// assert_eq!(
    ///     RunSummary::default().summary_line(),
    ///     "Updated 0 of 0 package(s), 0 failed"
    /// );
    /// ```
    #[must_use]
    pub fn summary_line(&self) -> String {
        let line = format!(
            "Updated {} of {} package(s), {} failed",
            self.updated(),
            self.reports.len(),
            self.failed()
        );
        match self.unrecorded() {
            0 => line,
            unrecorded => format!("{line}, {unrecorded} published but not recorded"),
        }
    }
}

/// A package whose landing page advertises a different version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    /// Package display name.
    pub name: String,
    /// Stored version.
    pub current_version: String,
    /// Version found on the landing page.
    pub available_version: String,
}

/// Result of a check-only run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Packages with a different version available.
    pub updates: Vec<PendingUpdate>,
}

impl UpdateReport {
    /// Returns `true` when at least one package has an update.
    #[must_use]
    pub fn updates_available(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// Drives packages through the relay steps.
pub struct Relay<'a> {
    http: &'a dyn HttpClient,
    publishing: Option<Publishing<'a>>,
    options: RelayOptions,
}

impl<'a> Relay<'a> {
    /// Creates a relay. Pass `None` for `publishing` to fetch without
    /// publishing.
    #[must_use]
    pub fn new(
        http: &'a dyn HttpClient,
        publishing: Option<Publishing<'a>>,
        options: RelayOptions,
    ) -> Self {
        Self {
            http,
            publishing,
            options,
        }
    }

    /// The options this relay runs with.
    #[must_use]
    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Processes every tracked package in order.
    ///
    /// After each successful publish the package's stored version is
    /// advanced and the whole configuration is written to `config_path`.
    pub fn run_auto(
        &self,
        config: &mut Config,
        config_path: &Path,
        stderr: &mut dyn Write,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        for index in 0..config.tracked_apks.len() {
            let Some(package) = config.tracked_apks.get(index).cloned() else {
                break;
            };
            let outcome = match self.process_package(&package, stderr) {
                PackageOutcome::Updated { version, file } => self
                    .persist(config, index, &version, config_path, stderr)
                    .unwrap_or(PackageOutcome::Updated { version, file }),
                other => other,
            };
            summary.reports.push(PackageReport {
                name: package.name,
                outcome,
            });
        }
        self.status(stderr, summary.summary_line());
        summary
    }

    /// Runs one package through the relay steps without touching the
    /// configuration.
    pub fn process_package(
        &self,
        package: &TrackedPackage,
        stderr: &mut dyn Write,
    ) -> PackageOutcome {
        self.status(stderr, format!("Processing {}...", package.name));

        let scraped = package_version(self.http, &package.base_url);
        let version = match scraped {
            Some(version)
                if self.options.force
                    || !self
                        .options
                        .version_match
                        .matches(&package.current_version, &version) =>
            {
                self.status(
                    stderr,
                    format!(
                        "New version found: {version} (was {})",
                        package.current_version
                    ),
                );
                version
            }
            Some(version) => {
                self.status(stderr, format!("No update available for {}", package.name));
                return PackageOutcome::Unchanged { version };
            }
            None if self.options.force => {
                log::warn!(
                    "no version found for {}; forcing with stored version {}",
                    package.name,
                    package.current_version
                );
                package.current_version.clone()
            }
            None => {
                log::warn!("no version found on {}", package.base_url);
                self.status(stderr, format!("No update available for {}", package.name));
                return PackageOutcome::VersionNotFound;
            }
        };

        let url = match self.resolve(&package.base_url, stderr) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        self.deliver(&url, &package.name, &package.release_tag, &version, stderr)
    }

    /// Downloads and publishes the package at an ad hoc landing page.
    pub fn run_manual(&self, request: &ManualRequest, stderr: &mut dyn Write) -> PackageOutcome {
        self.status(stderr, format!("Processing {} from {}...", request.name, request.url));
        let url = match self.resolve(&request.url, stderr) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        let version = package_version(self.http, &request.url).unwrap_or_else(|| {
            log::warn!("no version found on {}; using {UNKNOWN_VERSION}", request.url);
            UNKNOWN_VERSION.to_owned()
        });
        let outcome = self.deliver(&url, &request.name, &request.tag, &version, stderr);
        self.status(stderr, format!("{}: {outcome}", request.name));
        outcome
    }

    /// Reports which packages advertise a different version, without
    /// downloading anything.
    pub fn check_updates(&self, config: &Config, stderr: &mut dyn Write) -> UpdateReport {
        let mut report = UpdateReport::default();
        for package in &config.tracked_apks {
            self.status(stderr, format!("Checking {}...", package.name));
            match package_version(self.http, &package.base_url) {
                Some(version)
                    if !self
                        .options
                        .version_match
                        .matches(&package.current_version, &version) =>
                {
                    self.status(
                        stderr,
                        format!(
                            "UPDATE AVAILABLE: {} {} -> {version}",
                            package.name, package.current_version
                        ),
                    );
                    report.updates.push(PendingUpdate {
                        name: package.name.clone(),
                        current_version: package.current_version.clone(),
                        available_version: version,
                    });
                }
                _ => self.status(stderr, format!("No update for {}", package.name)),
            }
        }
        report
    }

    fn resolve(&self, landing_url: &str, stderr: &mut dyn Write) -> Result<String, PackageOutcome> {
        let resolver = LinkResolver::with_pacing(self.http, self.options.pacing);
        match resolver.resolve(landing_url) {
            LinkResolution::Found { url } => Ok(url),
            LinkResolution::NotFound { reason } => {
                self.status(stderr, format!("Warning: no download link found: {reason}"));
                Err(PackageOutcome::LinkNotFound { reason })
            }
        }
    }

    /// Fetches `url` and publishes the result when publishing is enabled.
    fn deliver(
        &self,
        url: &str,
        name: &str,
        tag: &str,
        version: &str,
        stderr: &mut dyn Write,
    ) -> PackageOutcome {
        let file_name = package_file_name(name, version);
        let fetched = match fetch(self.http, url, &file_name, &self.options.download_dir) {
            Ok(fetched) => fetched,
            Err(e) => {
                self.status(stderr, format!("Warning: download failed for {name}: {e}"));
                return PackageOutcome::FetchFailed {
                    reason: e.to_string(),
                };
            }
        };

        let Some(publishing) = self.publishing else {
            self.status(
                stderr,
                format!("Publishing disabled; kept {}", fetched.path.display()),
            );
            return PackageOutcome::PublishSkipped {
                version: version.to_owned(),
                file: fetched.path,
            };
        };

        let request = PublishRequest {
            repository: publishing.repository,
            file: &fetched.path,
            tag,
            version_label: version,
        };
        match publish(publishing.api, &request) {
            Ok(published) => {
                self.status(
                    stderr,
                    format!(
                        "Published {} to release {}",
                        published.asset.name, published.release.tag_name
                    ),
                );
                PackageOutcome::Updated {
                    version: version.to_owned(),
                    file: fetched.path,
                }
            }
            Err(e) => {
                self.status(stderr, format!("Warning: publish failed for {name}: {e}"));
                PackageOutcome::PublishFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Advances the stored version and saves the configuration. Returns the
    /// replacement outcome when saving fails.
    fn persist(
        &self,
        config: &mut Config,
        index: usize,
        version: &str,
        config_path: &Path,
        stderr: &mut dyn Write,
    ) -> Option<PackageOutcome> {
        config.set_current_version(index, version);
        match save_config(config_path, config) {
            Ok(()) => {
                log::info!("recorded version {version} in {}", config_path.display());
                None
            }
            Err(e) => {
                self.status(stderr, format!("Warning: {e}"));
                Some(PackageOutcome::PersistFailed {
                    version: version.to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn status(&self, stderr: &mut dyn Write, message: impl fmt::Display) {
        if !self.options.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
