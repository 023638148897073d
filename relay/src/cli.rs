//! CLI argument definitions for the relay binaries.
//!
//! Kept apart from the entrypoints so the binaries stay small and the
//! parsing rules can be unit tested.

use crate::config::DEFAULT_CONFIG_PATH;
use crate::fetcher::DEFAULT_DOWNLOAD_DIR;
use crate::orchestrator::{ManualRequest, RelayOptions};
use crate::version::VersionMatch;
use clap::{ArgGroup, Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "APK_RELAY_CONFIG";

/// Mirror APK releases from a download site onto GitHub releases.
#[derive(Parser, Debug)]
#[command(name = "apk-relay")]
#[command(version, about)]
#[command(long_about = concat!(
    "Mirror APK releases from a download site onto GitHub releases.\n\n",
    "In --auto mode every package in the configuration is checked; when the ",
    "landing page advertises a new version the APK is downloaded, attached to ",
    "the package's release and the stored version is updated.\n\n",
    "In --manual mode a single landing page is downloaded and published ",
    "without touching the configuration.\n\n",
    "Publishing requires GITHUB_TOKEN and GITHUB_REPOSITORY. Without a token ",
    "files are downloaded but not published.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Process every tracked package:\n",
    "    $ apk-relay --auto\n\n",
    "  Republish everything regardless of version:\n",
    "    $ apk-relay --auto --force\n\n",
    "  Publish one landing page by hand:\n",
    "    $ apk-relay --manual --url https://getmodsapk.com/example-app \\\n",
    "        --tag example-app --name \"Example App\"",
))]
#[command(group(ArgGroup::new("mode").args(["auto", "manual"])))]
pub struct Cli {
    /// Process every package in the configuration.
    #[arg(long)]
    pub auto: bool,

    /// Download and publish a single landing page.
    #[arg(long, requires_all = ["url", "tag", "name"])]
    pub manual: bool,

    /// Landing page URL for --manual.
    #[arg(long, value_name = "URL", requires = "manual")]
    pub url: Option<String>,

    /// Release tag for --manual.
    #[arg(long, value_name = "TAG", requires = "manual")]
    pub tag: Option<String>,

    /// Package name for --manual; also names the downloaded file.
    #[arg(long, value_name = "NAME", requires = "manual")]
    pub name: Option<String>,

    /// Process packages even when their version is unchanged.
    #[arg(long, requires = "auto")]
    pub force: bool,

    /// Directory for downloaded files.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DOWNLOAD_DIR)]
    pub download_dir: PathBuf,

    /// Delay between candidate download page fetches, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub pacing_ms: u64,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by both binaries.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CommonArgs {
    /// Path of the tracked package list.
    #[arg(long, value_name = "PATH", env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Compare versions as exact strings instead of digits and dots only.
    #[arg(long)]
    pub exact_versions: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress status output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl CommonArgs {
    /// The version comparison selected on the command line.
    #[must_use]
    pub fn version_match(&self) -> VersionMatch {
        if self.exact_versions {
            VersionMatch::Exact
        } else {
            VersionMatch::Normalized
        }
    }
}

/// Report whether any tracked package has a new version.
#[derive(Parser, Debug)]
#[command(name = "apk-relay-check")]
#[command(version, about)]
pub struct CheckCli {
    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckCli {
    /// Run options for a check-only run.
    #[must_use]
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            version_match: self.common.version_match(),
            quiet: self.common.quiet,
            ..RelayOptions::default()
        }
    }
}

/// The selected run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Process every tracked package.
    Auto,
    /// Process one ad hoc landing page.
    Manual(ManualRequest),
}

impl Cli {
    /// The selected mode, or `None` when neither `--auto` nor a complete
    /// `--manual` request was given.
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        if self.auto {
            return Some(Mode::Auto);
        }
        if !self.manual {
            return None;
        }
        match (&self.url, &self.tag, &self.name) {
            (Some(url), Some(tag), Some(name)) => Some(Mode::Manual(ManualRequest {
                url: url.clone(),
                tag: tag.clone(),
                name: name.clone(),
            })),
            _ => None,
        }
    }

    /// Run options derived from the command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_relay::cli::Cli;
    /// use clap::Parser;
    /// use std::time::Duration;
    ///
    /// let cli = Cli::parse_from(["apk-relay", "--auto", "--force", "--pacing-ms", "250"]);
    /// let options = cli.options();
    /// assert!(options.force);
    /// assert_eq!(options.pacing, Duration::from_millis(250));
    /// ```
    #[must_use]
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            download_dir: self.download_dir.clone(),
            force: self.force,
            version_match: self.common.version_match(),
            pacing: Duration::from_millis(self.pacing_ms),
            quiet: self.common.quiet,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
