//! Update check entrypoint for CI.
//!
//! Reads the tracked package list, compares each stored version with the
//! landing page, and prints `updates_available=true|false` on stdout. When
//! `GITHUB_OUTPUT` is set the same line is appended to that file so later
//! workflow steps can branch on it.

use apk_relay::cli::CheckCli;
use apk_relay::config::load_config;
use apk_relay::error::Result;
use apk_relay::http::HttpSession;
use apk_relay::orchestrator::Relay;
use apk_relay::output::{GITHUB_OUTPUT_ENV, init_logging, report_check_result, write_stderr_line};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    let cli = CheckCli::parse();
    init_logging(cli.common.verbosity);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    if let Err(err) = run(&cli, &mut stdout, &mut stderr) {
        write_stderr_line(&mut stderr, format!("error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: &CheckCli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let config = load_config(&cli.common.config)?;
    let session = HttpSession::new();
    let relay = Relay::new(&session, None, cli.options());

    let report = relay.check_updates(&config, stderr);
    let github_output = std::env::var_os(GITHUB_OUTPUT_ENV)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);
    report_check_result(stdout, github_output.as_deref(), report.updates_available())?;
    Ok(())
}
