//! Behaviour tests for automatic runs over the tracked package list.

use apk_relay::config::{Config, TrackedPackage, load_config};
use apk_relay::orchestrator::{PackageOutcome, Publishing, Relay, RelayOptions};
use apk_relay::publisher::PublishStep;
use apk_relay::test_utils::{RecordingReleases, StubHttp, StubSite, apk_bytes};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const LANDING: &str = "https://getmodsapk.com/example-app";
const TAG: &str = "example-app";

#[derive(Default)]
struct RelayWorld {
    _temp_dir: Option<TempDir>,
    config_path: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    config: Option<Config>,
    advertised: Option<String>,
    apk_len: Option<usize>,
    token: bool,
    force: bool,
    existing_assets: Vec<String>,
    failing_step: Option<PublishStep>,
    outcome: Option<PackageOutcome>,
    apk_url: Option<String>,
    requests: Vec<String>,
    release_calls: Vec<String>,
    release_assets: Vec<String>,
}

#[fixture]
fn world() -> RelayWorld {
    RelayWorld::default()
}

impl RelayWorld {
    fn stored_version(&self) -> &str {
        let config = self.config.as_ref().expect("config set");
        &config.tracked_apks[0].current_version
    }

    fn config_path(&self) -> &PathBuf {
        self.config_path.as_ref().expect("config path set")
    }
}

#[given("a tracked package at version {version}")]
fn given_tracked_package(world: &mut RelayWorld, version: String) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    world.config_path = Some(temp_dir.path().join("config").join("apk-list.json"));
    world.download_dir = Some(temp_dir.path().join("downloads"));
    world._temp_dir = Some(temp_dir);
    world.config = Some(Config::new(vec![TrackedPackage::new(
        "Example App",
        LANDING,
        TAG,
        version,
    )]));
}

#[given("the site advertises version {version}")]
fn given_site_version(world: &mut RelayWorld, version: String) {
    world.advertised = Some(version);
}

#[given("the site serves a {size:usize} byte file")]
fn given_file_size(world: &mut RelayWorld, size: usize) {
    world.apk_len = Some(size);
}

#[given("a publishing token is configured")]
fn given_token(world: &mut RelayWorld) {
    world.token = true;
}

#[given("no publishing token is configured")]
fn given_no_token(world: &mut RelayWorld) {
    world.token = false;
}

#[given("the release already carries {asset}")]
fn given_existing_asset(world: &mut RelayWorld, asset: String) {
    world.existing_assets.push(asset);
}

#[given("asset uploads fail")]
fn given_upload_failure(world: &mut RelayWorld) {
    world.failing_step = Some(PublishStep::Upload);
}

#[given("the run is forced")]
fn given_forced(world: &mut RelayWorld) {
    world.force = true;
}

#[when("the relay runs automatically")]
fn when_relay_runs(world: &mut RelayWorld) {
    let mut site = StubSite::new(LANDING, world.advertised.as_deref());
    if let Some(len) = world.apk_len {
        site = site.with_apk(apk_bytes(len));
    }
    let http = site.install(StubHttp::new());

    let mut releases = RecordingReleases::new();
    if !world.existing_assets.is_empty() {
        let names: Vec<&str> = world.existing_assets.iter().map(String::as_str).collect();
        releases = releases.with_release(TAG, &names);
    }
    if let Some(step) = world.failing_step {
        releases = releases.failing_at(step);
    }
    let publishing = world.token.then_some(Publishing {
        api: &releases,
        repository: "owner/apk-mirror",
    });

    let options = RelayOptions {
        download_dir: world.download_dir.clone().expect("download dir set"),
        force: world.force,
        pacing: Duration::ZERO,
        ..RelayOptions::default()
    };
    let relay = Relay::new(&http, publishing, options);
    let config_path = world.config_path().clone();
    let config = world.config.as_mut().expect("config set");
    let mut stderr = Vec::new();

    let summary = relay.run_auto(config, &config_path, &mut stderr);

    world.outcome = summary.reports.into_iter().next().map(|report| report.outcome);
    world.apk_url = Some(site.apk_url.clone());
    world.requests = http.requests();
    world.release_calls = releases.calls();
    world.release_assets = releases.asset_names(TAG);
}

#[then("the package outcome is {outcome}")]
fn then_outcome(world: &mut RelayWorld, outcome: String) {
    let actual = world.outcome.as_ref().expect("outcome recorded");
    let matches = match outcome.as_str() {
        "unchanged" => matches!(actual, PackageOutcome::Unchanged { .. }),
        "publish skipped" => matches!(actual, PackageOutcome::PublishSkipped { .. }),
        "updated" => matches!(actual, PackageOutcome::Updated { .. }),
        "publish failed" => matches!(actual, PackageOutcome::PublishFailed { .. }),
        "fetch failed" => matches!(actual, PackageOutcome::FetchFailed { .. }),
        other => panic!("unknown outcome in feature file: {other}"),
    };
    assert!(matches, "expected {outcome}, got {actual:?}");
}

#[then("no file is downloaded")]
fn then_no_download(world: &mut RelayWorld) {
    let apk_url = world.apk_url.as_deref().expect("apk url recorded");
    assert!(!world.requests.iter().any(|url| url == apk_url));
}

#[then("the file is downloaded once")]
fn then_downloaded_once(world: &mut RelayWorld) {
    let apk_url = world.apk_url.as_deref().expect("apk url recorded");
    let count = world.requests.iter().filter(|url| *url == apk_url).count();
    assert_eq!(count, 1);
}

#[then("no release call is made")]
fn then_no_release_call(world: &mut RelayWorld) {
    assert!(world.release_calls.is_empty(), "{:?}", world.release_calls);
}

#[then("the release carries only {asset}")]
fn then_release_assets(world: &mut RelayWorld, asset: String) {
    assert_eq!(world.release_assets, vec![asset]);
}

#[then("the stored version is {version}")]
fn then_stored_version(world: &mut RelayWorld, version: String) {
    assert_eq!(world.stored_version(), version);
}

#[then("the config file is not rewritten")]
fn then_config_untouched(world: &mut RelayWorld) {
    assert!(!world.config_path().exists());
}

#[then("the config file records version {version}")]
fn then_config_records(world: &mut RelayWorld, version: String) {
    let saved = load_config(world.config_path()).expect("config saved");
    assert_eq!(saved.tracked_apks[0].current_version, version);
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "Unchanged version is left alone"
)]
fn scenario_unchanged_version(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "New version is fetched but not published without a token"
)]
fn scenario_fetch_without_token(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "New version is published and recorded"
)]
fn scenario_publish_and_record(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "Existing release assets are replaced"
)]
fn scenario_assets_replaced(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "Failed publish keeps the stored version"
)]
fn scenario_failed_publish(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "Forced run republishes an unchanged version"
)]
fn scenario_forced_run(world: RelayWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/relay.feature",
    name = "Undersized download is rejected"
)]
fn scenario_undersized_download(world: RelayWorld) {
    let _ = world;
}
