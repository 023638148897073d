//! Terminal and CI output for the relay binaries.
//!
//! Status lines go to stderr through [`write_stderr_line`]; diagnostic
//! logging goes through the `log` facade, initialised by [`init_logging`].
//! The check binary additionally reports its result in the
//! `key=value` form understood by GitHub Actions step outputs.

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

/// Environment variable naming the GitHub Actions step output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Output key reporting whether any package has an update.
pub const UPDATES_AVAILABLE_KEY: &str = "updates_available";

/// Writes one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort status output; nothing useful to do on failure.
    }
}

/// Maps the `-v` count to the default log level.
///
/// # Examples
///
/// ```
/// use apk_relay::output::log_level_for;
/// use log::LevelFilter;
///
/// assert_eq!(log_level_for(0), LevelFilter::Warn);
/// assert_eq!(log_level_for(1), LevelFilter::Info);
/// assert_eq!(log_level_for(5), LevelFilter::Debug);
/// ```
#[must_use]
pub fn log_level_for(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// Initialises `env_logger` with a default level derived from `verbosity`.
///
/// `RUST_LOG`, when set, takes precedence. Calling this more than once is
/// harmless.
pub fn init_logging(verbosity: u8) {
    let default_level = log_level_for(verbosity).to_string().to_lowercase();
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init()
        .is_err()
    {
        log::debug!("logger already initialised");
    }
}

/// Formats the step output line for the check result.
///
/// # Examples
///
/// ```
/// use apk_relay::output::updates_available_line;
///
/// assert_eq!(updates_available_line(true), "updates_available=true");
/// ```
#[must_use]
pub fn updates_available_line(available: bool) -> String {
    format!("{UPDATES_AVAILABLE_KEY}={available}")
}

/// Appends the check result to the step output file at `path`.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened or written.
pub fn append_github_output(path: &Path, available: bool) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", updates_available_line(available))
}

/// Prints the check result on `stdout` and, when `github_output` is
/// given, appends it to that step output file.
///
/// # Errors
///
/// Returns an I/O error when either write fails.
pub fn report_check_result(
    stdout: &mut dyn Write,
    github_output: Option<&Path>,
    available: bool,
) -> std::io::Result<()> {
    writeln!(stdout, "{}", updates_available_line(available))?;
    if let Some(path) = github_output {
        append_github_output(path, available)?;
    }
    Ok(())
}
