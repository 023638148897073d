//! Unit tests for release publishing.

use super::*;
use crate::http::HttpError;
use crate::release::MockReleaseApi;
use crate::test_utils::{RecordingReleases, apk_bytes};
use mockall::predicate::eq;
use rstest::rstest;
use std::path::PathBuf;

const REPOSITORY: &str = "owner/apk-mirror";
const TAG: &str = "example-app";

fn apk_on_disk(len: usize) -> (tempfile::TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("example-app-1.0.2.apk");
    std::fs::write(&path, apk_bytes(len)).expect("write apk");
    (temp, path)
}

fn request(file: &Path) -> PublishRequest<'_> {
    PublishRequest {
        repository: REPOSITORY,
        file,
        tag: TAG,
        version_label: "1.0.2",
    }
}

fn release(id: u64) -> Release {
    Release {
        id,
        tag_name: TAG.to_owned(),
        name: None,
        upload_url: format!("https://uploads.test/releases/{id}/assets{{?name,label}}"),
    }
}

#[test]
fn creates_missing_release_with_title_and_notes() {
    let (_temp, file) = apk_on_disk(4096);
    let mut api = MockReleaseApi::new();
    api.expect_find_release_by_tag()
        .with(eq(REPOSITORY), eq(TAG))
        .times(1)
        .returning(|_, _| Ok(None));
    api.expect_create_release()
        .withf(|repository, new_release| {
            repository == REPOSITORY
                && new_release.tag_name == TAG
                && new_release.name == "example-app-1.0.2 1.0.2"
                && new_release.body == "Auto-updated APK - Version 1.0.2"
                && !new_release.draft
                && !new_release.prerelease
        })
        .times(1)
        .returning(|_, _| Ok(release(7)));
    api.expect_list_assets().never();
    api.expect_upload_asset()
        .withf(|release, name, content_type, _| {
            release.id == 7 && name == "example-app-1.0.2.apk" && content_type == APK_CONTENT_TYPE
        })
        .times(1)
        .returning(|_, name, _, _| {
            Ok(ReleaseAsset {
                id: 70,
                name: name.to_owned(),
                size: 4096,
            })
        });

    let published = publish(&api, &request(&file)).expect("publish succeeds");

    assert!(published.created);
    assert_eq!(published.replaced_assets, 0);
    assert_eq!(published.asset.name, "example-app-1.0.2.apk");
}

#[test]
fn existing_release_has_its_assets_replaced() {
    let (_temp, file) = apk_on_disk(4096);
    let api = RecordingReleases::new().with_release(TAG, &["old-a.apk", "old-b.apk"]);

    let published = publish(&api, &request(&file)).expect("publish succeeds");

    assert!(!published.created);
    assert_eq!(published.replaced_assets, 2);
    assert_eq!(
        api.calls(),
        vec![
            "lookup example-app",
            "list example-app",
            "delete old-a.apk",
            "delete old-b.apk",
            "upload example-app-1.0.2.apk",
        ]
    );
    assert_eq!(api.asset_names(TAG), vec!["example-app-1.0.2.apk"]);
}

#[test]
fn republishing_leaves_a_single_asset() {
    let (_temp, file) = apk_on_disk(4096);
    let api = RecordingReleases::new();

    publish(&api, &request(&file)).expect("first publish");
    publish(&api, &request(&file)).expect("second publish");

    assert_eq!(api.asset_names(TAG), vec!["example-app-1.0.2.apk"]);
}

#[rstest]
#[case(PublishStep::Lookup, false)]
#[case(PublishStep::Create, false)]
#[case(PublishStep::ListAssets, true)]
#[case(PublishStep::DeleteAsset, true)]
#[case(PublishStep::Upload, true)]
fn failing_step_is_reported(#[case] failing: PublishStep, #[case] existing: bool) {
    let (_temp, file) = apk_on_disk(4096);
    let mut api = RecordingReleases::new();
    if existing {
        api = api.with_release(TAG, &["old.apk"]);
    }
    let api = api.failing_at(failing);

    let err = publish(&api, &request(&file)).expect_err("publish fails");

    match err {
        PublishError::Api { step, .. } => assert_eq!(step, failing),
        other => panic!("expected API error, got {other:?}"),
    }
}

#[test]
fn upload_is_not_attempted_after_a_failed_deletion() {
    let (_temp, file) = apk_on_disk(4096);
    let api = RecordingReleases::new()
        .with_release(TAG, &["old.apk"])
        .failing_at(PublishStep::DeleteAsset);

    assert!(publish(&api, &request(&file)).is_err());

    assert!(!api.calls().iter().any(|call| call.starts_with("upload")));
}

#[test]
fn missing_file_fails_before_any_call() {
    let temp = tempfile::tempdir().expect("temp dir");
    let file = temp.path().join("absent.apk");
    let mut api = MockReleaseApi::new();
    api.expect_find_release_by_tag().never();

    let err = publish(&api, &request(&file)).expect_err("missing file");

    assert!(matches!(err, PublishError::MissingFile { .. }));
}

#[test]
fn undersized_file_fails_before_any_call() {
    let (_temp, file) = apk_on_disk(512);
    let mut api = MockReleaseApi::new();
    api.expect_find_release_by_tag().never();

    let err = publish(&api, &request(&file)).expect_err("too small");

    assert!(matches!(
        err,
        PublishError::TooSmall {
            size: 512,
            minimum: MIN_APK_SIZE,
            ..
        }
    ));
}

#[test]
fn api_error_message_names_the_step() {
    let err = PublishError::Api {
        step: PublishStep::Upload,
        source: ReleaseApiError::Http(HttpError::Status {
            url: "https://uploads.test".to_owned(),
            code: 422,
        }),
    };
    assert!(err.to_string().starts_with("asset upload failed"));
}

#[rstest]
#[case("downloads/example-app-1.0.2.apk", "1.0.2", "example-app-1.0.2 1.0.2")]
#[case("manual.apk", "unknown", "manual unknown")]
#[case("archive.bin", "2.0.0", "archive.bin 2.0.0")]
fn release_titles(#[case] file: &str, #[case] version: &str, #[case] expected: &str) {
    assert_eq!(release_title(Path::new(file), version), expected);
}
