//! Error types for the relay binaries.
//!
//! Only configuration problems and missing publishing settings abort a run;
//! everything that can go wrong for a single package is reported as a
//! [`PackageOutcome`](crate::orchestrator::PackageOutcome) instead.

use crate::config::ConfigError;
use crate::settings::REPOSITORY_ENV;
use thiserror::Error;

/// Errors that stop a run before or between packages.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The configuration could not be loaded or saved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A token is set but there is no repository to publish to.
    #[error("a publishing token is set but {REPOSITORY_ENV} is not; set it to owner/name")]
    MissingRepository,

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_repository_names_the_variable() {
        let msg = RelayError::MissingRepository.to_string();
        assert!(msg.contains("GITHUB_REPOSITORY"));
    }

    #[test]
    fn config_errors_keep_their_message() {
        let err = RelayError::from(ConfigError::Read {
            path: PathBuf::from("config/apk-list.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        });
        assert!(err.to_string().contains("config/apk-list.json"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let err: RelayError = std::io::Error::other("disk full").into();
        assert!(matches!(err, RelayError::Io(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
