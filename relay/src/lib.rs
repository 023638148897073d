//! APK relay library.
//!
//! This crate watches a list of Android packages on a third-party download
//! site, downloads new versions when they appear, and republishes them as
//! assets on GitHub releases. It backs the `apk-relay` and
//! `apk-relay-check` binaries and can be driven programmatically with stub
//! HTTP and release clients for testing.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Tracked package list persistence
//! - [`error`] - Run-level error types
//! - [`fetcher`] - Streaming APK download and validation
//! - [`html`] - Shared HTML and URL helpers
//! - [`http`] - Browser-like HTTP session
//! - [`orchestrator`] - Per-package relay flow and run summaries
//! - [`output`] - Status lines, logging set-up and CI step outputs
//! - [`publisher`] - Release creation and asset replacement
//! - [`release`] - Release hosting API and its GitHub implementation
//! - [`resolver`] - Landing page to direct download link resolution
//! - [`settings`] - Publishing settings from the environment
//! - [`version`] - Version extraction and comparison

pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod http;
pub mod orchestrator;
pub mod output;
pub mod publisher;
pub mod release;
pub mod resolver;
pub mod settings;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
