//! End-to-end CLI behaviour tests for `apk-relay` and `apk-relay-check`.
//!
//! These scenarios only exercise paths that stop before any network
//! access: argument validation and configuration loading.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Default)]
struct CliWorld {
    args: Vec<String>,
    output: Option<Output>,
    // Keep temp_dir alive for the lifetime of the scenario.
    _temp_dir: Option<TempDir>,
}

#[fixture]
fn cli_world() -> CliWorld {
    CliWorld::default()
}

/// Returns a path inside a fresh temporary directory that does not exist.
fn missing_config(cli_world: &mut CliWorld) -> String {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let path = temp_dir.path().join("absent").join("apk-list.json");
    cli_world._temp_dir = Some(temp_dir);
    path.to_string_lossy().into_owned()
}

fn run_binary(cli_world: &mut CliWorld, binary: &str) {
    let mut cmd = Command::new(binary);
    cmd.args(&cli_world.args)
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_OUTPUT")
        .env_remove("APK_RELAY_CONFIG")
        .env_remove("RUST_LOG");
    if let Some(temp_dir) = &cli_world._temp_dir {
        cmd.current_dir(temp_dir.path());
    }
    let output = cmd.output().expect("failed to run binary");
    cli_world.output = Some(output);
}

fn get_output(cli_world: &CliWorld) -> &Output {
    cli_world.output.as_ref().expect("output not set")
}

#[given("the relay is invoked without a mode")]
fn given_no_mode(cli_world: &mut CliWorld) {
    cli_world.args.clear();
}

#[given("the relay is invoked with only --force")]
fn given_force_only(cli_world: &mut CliWorld) {
    cli_world.args = vec!["--force".to_owned()];
}

#[given("the relay is invoked in auto mode with a missing config")]
fn given_auto_missing_config(cli_world: &mut CliWorld) {
    let config = missing_config(cli_world);
    cli_world.args = vec!["--auto".to_owned(), "--config".to_owned(), config];
}

#[given("the update check is invoked with a missing config")]
fn given_check_missing_config(cli_world: &mut CliWorld) {
    let config = missing_config(cli_world);
    cli_world.args = vec!["--config".to_owned(), config];
}

#[when("the relay binary is run")]
fn when_relay_binary_run(cli_world: &mut CliWorld) {
    run_binary(cli_world, env!("CARGO_BIN_EXE_apk-relay"));
}

#[when("the check binary is run")]
fn when_check_binary_run(cli_world: &mut CliWorld) {
    run_binary(cli_world, env!("CARGO_BIN_EXE_apk-relay-check"));
}

#[then("the process exits with status {code:i32}")]
fn then_exit_status(cli_world: &mut CliWorld, code: i32) {
    let output = get_output(cli_world);
    assert_eq!(
        output.status.code(),
        Some(code),
        "stdout: {}, stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("stderr mentions {text}")]
fn then_stderr_mentions(cli_world: &mut CliWorld, text: String) {
    let stderr = String::from_utf8_lossy(&get_output(cli_world).stderr).into_owned();
    assert!(stderr.contains(&text), "stderr: {stderr}");
}

#[then("stdout is empty")]
fn then_stdout_empty(cli_world: &mut CliWorld) {
    assert!(get_output(cli_world).stdout.is_empty());
}

#[scenario(path = "tests/features/cli.feature", name = "Missing mode prints usage")]
fn scenario_missing_mode(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", name = "Force without auto is rejected")]
fn scenario_force_without_auto(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "Automatic run with a missing config fails"
)]
fn scenario_auto_missing_config(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "Update check with a missing config fails"
)]
fn scenario_check_missing_config(cli_world: CliWorld) {
    let _ = cli_world;
}
