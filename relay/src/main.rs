//! APK relay CLI entrypoint.
//!
//! Checks tracked packages for new versions, downloads them, and publishes
//! them as GitHub release assets. Exactly one of `--auto` or `--manual` must
//! be given; otherwise usage help is printed and the process exits with
//! status 2.

use apk_relay::cli::{Cli, Mode};
use apk_relay::config::load_config;
use apk_relay::error::Result;
use apk_relay::http::HttpSession;
use apk_relay::orchestrator::{Publishing, Relay};
use apk_relay::output::{init_logging, write_stderr_line};
use apk_relay::settings::PublishSettings;
use clap::{CommandFactory, Parser};
use std::io::Write;

/// Exit status when no mode was selected.
const USAGE_EXIT_CODE: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.common.verbosity);
    let mut stderr = std::io::stderr();

    let exit_code = match cli.mode() {
        Some(mode) => {
            let run_result = run(&cli, mode, &mut stderr);
            exit_code_for_run_result(run_result, &mut stderr)
        }
        None => {
            write_stderr_line(&mut stderr, Cli::command().render_help());
            USAGE_EXIT_CODE
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Runs the selected mode. `Ok(false)` marks a manual run whose package
/// failed; automatic runs always succeed once the configuration loads.
fn run(cli: &Cli, mode: Mode, stderr: &mut dyn Write) -> Result<bool> {
    let settings = PublishSettings::from_env();
    let session = HttpSession::new();
    let releases = settings.release_client(session.agent())?;
    let publishing = releases
        .as_ref()
        .zip(settings.repository())
        .map(|(api, repository)| Publishing { api, repository });
    let relay = Relay::new(&session, publishing, cli.options());

    match mode {
        Mode::Auto => {
            let config_path = &cli.common.config;
            let mut config = load_config(config_path)?;
            let summary = relay.run_auto(&mut config, config_path, stderr);
            log::info!("{}", summary.summary_line());
            Ok(true)
        }
        Mode::Manual(request) => Ok(!relay.run_manual(&request, stderr).is_failure()),
    }
}

fn exit_code_for_run_result(result: Result<bool>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apk_relay::error::RelayError;
    use rstest::rstest;

    #[rstest]
    #[case(true, 0)]
    #[case(false, 1)]
    fn exit_code_follows_run_success(#[case] success: bool, #[case] expected: i32) {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(success), &mut stderr);
        assert_eq!(exit_code, expected);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(RelayError::MissingRepository), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: "));
        assert!(stderr_text.contains("GITHUB_REPOSITORY"));
    }
}
