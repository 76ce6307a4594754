// tests/pipeline_test.rs
mod common;

use common::{build_command, commit_file, setup_released_repo, short, CHANGELOG};
use release_pipeline::cli::{self, PackageArgs, PublishArgs, Session};
use release_pipeline::config::{Config, IndexKind};
use release_pipeline::matrix::MatrixAxis;
use release_pipeline::publish::ChannelRequest;
use release_pipeline::ReleaseError;
use std::fs;
use std::path::Path;

fn config() -> Config {
    let mut config = Config::default();
    config.package.name = "pkg".to_string();
    config.matrix.axes = vec![MatrixAxis::new("python", &["3.8", "3.9"])];
    config.build.command = build_command();
    config.build.source_artifact = Some("{name}-{version}.tar.gz".to_string());
    config.build.binary_artifact = Some("{name}-{version}-{cell}.whl".to_string());
    config
}

fn session(dir: &Path, config: Config) -> Session {
    Session::with_config(config, dir).expect("valid config")
}

fn yes(channel: ChannelRequest) -> PublishArgs {
    PublishArgs {
        channel,
        yes: true,
        resume: false,
    }
}

#[test]
fn test_tagged_head_derives_release() {
    let (dir, _repo, _) = setup_released_repo();
    let session = session(dir.path(), config());

    let version = cli::derive_version(&session).unwrap();
    assert_eq!(version.to_string(), "1.0.0");
    assert!(!cli::check_prerelease(&session).unwrap());
}

#[test]
fn test_commits_after_tag_derive_dev_version() {
    let (dir, repo, _) = setup_released_repo();
    commit_file(&repo, dir.path(), "two\n", "second");
    let head = commit_file(&repo, dir.path(), "three\n", "third");
    let session = session(dir.path(), config());

    let version = cli::derive_version(&session).unwrap();
    assert_eq!(version.to_string(), format!("1.0.0.dev2+g{}", short(head)));
    assert!(cli::check_prerelease(&session).unwrap());

    // Derivation is read-only and repeatable
    assert_eq!(cli::derive_version(&session).unwrap(), version);
}

#[test]
fn test_dirty_tree_on_tag_is_dev_build() {
    let (dir, _repo, head) = setup_released_repo();
    fs::write(dir.path().join("README.md"), "edited\n").unwrap();
    let session = session(dir.path(), config());

    let version = cli::derive_version(&session).unwrap();
    assert_eq!(version.to_string(), format!("1.0.0.dev0+g{}.dirty", short(head)));
    assert!(cli::check_prerelease(&session).unwrap());
}

#[test]
fn test_untracked_output_does_not_dirty_tree() {
    let (dir, _repo, _) = setup_released_repo();
    fs::create_dir_all(dir.path().join("dist")).unwrap();
    fs::write(dir.path().join("dist/leftover.whl"), "x").unwrap();
    let session = session(dir.path(), config());

    assert_eq!(cli::derive_version(&session).unwrap().to_string(), "1.0.0");
}

#[test]
fn test_package_then_publish_release() {
    let (dir, _repo, _) = setup_released_repo();
    let session = session(dir.path(), config());

    let (version, outcomes) = cli::package(&session, &PackageArgs::default()).unwrap();
    assert_eq!(version.to_string(), "1.0.0");
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.cache_hit));

    let wheel = dir.path().join("dist/python-3.9/pkg-1.0.0-python-3.9.whl");
    assert_eq!(fs::read_to_string(&wheel).unwrap(), "3.9");
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/python-3.8/pkg-1.0.0.tar.gz")).unwrap(),
        "1.0.0"
    );

    let result = cli::publish(&session, &yes(ChannelRequest::Auto))
        .unwrap()
        .expect("not cancelled");
    assert_eq!(result.channel, "stable");
    assert_eq!(result.version, "1.0.0");
    // The sdist has the same file name in every cell and is uploaded once
    assert_eq!(result.uploaded.len(), 3);

    let published = dir.path().join("index/stable/pkg/1.0.0");
    assert!(published.join("pkg-1.0.0.tar.gz").is_file());
    assert!(published.join("pkg-1.0.0-python-3.8.whl").is_file());
    assert!(published.join("pkg-1.0.0-python-3.9.whl").is_file());
}

#[test]
fn test_second_publish_is_rejected() {
    let (dir, _repo, _) = setup_released_repo();
    let session = session(dir.path(), config());

    cli::package(&session, &PackageArgs::default()).unwrap();
    cli::publish(&session, &yes(ChannelRequest::Auto)).unwrap();

    match cli::publish(&session, &yes(ChannelRequest::Auto)).unwrap_err() {
        ReleaseError::UploadFailure {
            artifact,
            remaining,
            ..
        } => {
            assert_eq!(artifact, "pkg-1.0.0.tar.gz");
            assert_eq!(remaining.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Upload command that copies into `store`, failing the first upload of
/// the python-3.9 wheel and rejecting files it already holds
fn flaky_upload_command(store: &Path) -> Vec<String> {
    let script = r#"store="$1"; file="$2"; name=$(basename "$file")
mkdir -p "$store"
case "$name" in
  *python-3.9.whl)
    if [ ! -f "$store/.failed-once" ]; then
      touch "$store/.failed-once"
      echo 'connection reset by peer' >&2
      exit 1
    fi;;
esac
if [ -e "$store/$name" ]; then echo "$name already exists" >&2; exit 1; fi
cp "$file" "$store/$name""#;
    vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "sh".to_string(),
        store.display().to_string(),
        "{path}".to_string(),
    ]
}

#[test]
fn test_interrupted_publish_resumes() {
    let (dir, _repo, _) = setup_released_repo();
    let store = dir.path().join("remote");
    let mut config = config();
    config.publish.index = IndexKind::Command;
    config.publish.upload_command = flaky_upload_command(&store);
    let session = session(dir.path(), config);

    cli::package(&session, &PackageArgs::default()).unwrap();

    match cli::publish(&session, &yes(ChannelRequest::Auto)).unwrap_err() {
        ReleaseError::UploadFailure {
            artifact,
            remaining,
            ..
        } => {
            assert_eq!(artifact, "pkg-1.0.0-python-3.9.whl");
            assert_eq!(remaining.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    // A plain retry still refuses artifacts the index already holds
    let err = cli::publish(&session, &yes(ChannelRequest::Auto)).unwrap_err();
    assert_eq!(err.kind(), "UploadFailure");

    let resume = PublishArgs {
        resume: true,
        ..yes(ChannelRequest::Auto)
    };
    let result = cli::publish(&session, &resume)
        .unwrap()
        .expect("not cancelled");
    assert_eq!(result.uploaded.len(), 1);
    assert_eq!(result.uploaded[0].file_name(), "pkg-1.0.0-python-3.9.whl");
    assert_eq!(result.already_present.len(), 2);

    for name in [
        "pkg-1.0.0.tar.gz",
        "pkg-1.0.0-python-3.8.whl",
        "pkg-1.0.0-python-3.9.whl",
    ] {
        assert!(store.join(name).is_file(), "{name} missing");
    }
}

#[test]
fn test_second_package_is_cache_hit() {
    let (dir, _repo, _) = setup_released_repo();
    let session = session(dir.path(), config());

    cli::package(&session, &PackageArgs::default()).unwrap();
    let (_, outcomes) = cli::package(&session, &PackageArgs::default()).unwrap();
    assert!(outcomes.iter().all(|o| o.cache_hit));

    let forced = PackageArgs {
        force: true,
        cell: Some("python-3.8".to_string()),
    };
    let (_, outcomes) = cli::package(&session, &forced).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].cache_hit);
}

#[test]
fn test_prerelease_refused_on_stable() {
    let (dir, repo, _) = setup_released_repo();
    commit_file(&repo, dir.path(), "two\n", "second");
    let session = session(dir.path(), config());

    let err = cli::publish(&session, &yes(ChannelRequest::Stable)).unwrap_err();
    assert_eq!(err.kind(), "RefusedPrerelease");

    let err = cli::publish(&session, &yes(ChannelRequest::Auto)).unwrap_err();
    assert_eq!(err.kind(), "NoPrereleaseChannel");
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_release_routes_dev_build_to_prerelease_channel() {
    let (dir, repo, _) = setup_released_repo();
    let head = commit_file(&repo, dir.path(), "two\n", "second");

    let mut config = config();
    config.publish.prerelease_channel = Some("testing".to_string());
    let session = session(dir.path(), config);

    let result = cli::release(&session, &PackageArgs::default(), &yes(ChannelRequest::Auto))
        .unwrap()
        .expect("not cancelled");

    let version = format!("1.0.0.dev1+g{}", short(head));
    assert_eq!(result.channel, "testing");
    assert_eq!(result.version, version);
    assert!(dir
        .path()
        .join("index/testing/pkg")
        .join(&version)
        .join(format!("pkg-{}.tar.gz", version))
        .is_file());
}

#[test]
fn test_release_stops_at_build_failure() {
    let (dir, _repo, _) = setup_released_repo();
    let mut config = config();
    config.build.command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo 'setup.py missing' >&2; exit 2".to_string(),
    ];
    let session = session(dir.path(), config);

    let err = cli::release(&session, &PackageArgs::default(), &yes(ChannelRequest::Auto))
        .unwrap_err();
    assert_eq!(err.kind(), "BuildToolFailure");
    assert!(err.to_string().contains("setup.py missing"));
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_release_notes_for_derived_version() {
    let (dir, repo, _) = setup_released_repo();
    commit_file(&repo, dir.path(), "two\n", "second");
    fs::write(dir.path().join("CHANGELOG.md"), CHANGELOG).unwrap();
    let session = session(dir.path(), config());

    let notes = cli::release_notes(&session, None).unwrap();
    assert_eq!(notes, "### Added\n\n- first public release");

    assert_eq!(cli::release_notes(&session, Some("v0.9.0")).unwrap(), "- preview");
    assert_eq!(
        cli::release_notes(&session, Some("1.1.0")).unwrap_err().kind(),
        "SectionNotFound"
    );
}

#[test]
fn test_unknown_axis_label_stops_matrix() {
    let (dir, _repo, _) = setup_released_repo();
    let mut config = config();
    config.matrix.axes =
        vec![MatrixAxis::new("rf", &["rf41", "rf50"]).with_constraint("rf41", &["robotframework<5"])];
    let session = session(dir.path(), config);

    let err = cli::resolve_matrix(&session).unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::UnknownAxisLabel { ref axis, ref label } if axis == "rf" && label == "rf50"
    ));
}

#[test]
fn test_outside_repository_is_vcs_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let session = session(dir.path(), config());
    assert_eq!(
        cli::derive_version(&session).unwrap_err().kind(),
        "VcsUnavailable"
    );
}
