#![cfg(unix)]

mod support;

use std::path::{Path, PathBuf};
use std::time::Duration;

use md5::{Digest, Md5};
use pypi_bucket_core::build::CommandBuilder;
use pypi_bucket_core::config::{
    ArtifactSelection, BuildConfig, PackageName, PublishConfig, UploadConfig,
};
use pypi_bucket_core::contract::{ObjectStore, PutObjectRequest};
use pypi_bucket_core::error::PublishError;
use pypi_bucket_core::index::publish_index;
use pypi_bucket_core::publish::publish;
use support::MemoryStore;
use tempfile::tempdir;

const WHEEL: &str = "foo-1.0-py3-none-any.whl";
const SDIST: &str = "foo-1.0.tar.gz";

/// Stands in for `python setup.py bdist_wheel sdist`.
fn fake_build_command() -> Vec<String> {
    vec![
        "sh".into(),
        "-c".into(),
        format!("mkdir -p dist && printf wheel-bytes > dist/{WHEEL} && printf sdist-bytes > dist/{SDIST}"),
    ]
}

fn package_dir(root: &Path) -> PathBuf {
    let dir = root.join("foo");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn publish_config(dir: &Path, override_existing: bool) -> PublishConfig {
    PublishConfig {
        bucket: "my-bucket".into(),
        package: PackageName::from_dir(dir).unwrap(),
        package_dir: dir.to_path_buf(),
        build: BuildConfig {
            command: fake_build_command(),
            ..BuildConfig::default()
        },
        upload: UploadConfig { override_existing },
    }
}

fn hex_md5(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

#[tokio::test]
async fn publishes_fresh_artifacts_and_index() {
    let tmp = tempdir().unwrap();
    let dir = package_dir(tmp.path());
    // leftover from an earlier release; must not be re-uploaded
    std::fs::create_dir_all(dir.join("dist")).unwrap();
    std::fs::write(dir.join("dist/foo-0.9.tar.gz"), b"old").unwrap();

    let config = publish_config(&dir, true);
    let builder = CommandBuilder::new(config.build.clone(), &dir);
    let store = MemoryStore::new();

    let report = publish(&config, &builder, &store)
        .await
        .expect("publish should succeed");

    assert_eq!(
        store.keys("my-bucket"),
        vec![
            "foo/foo-1.0-py3-none-any.whl".to_string(),
            "foo/foo-1.0.tar.gz".to_string(),
            "foo/index.html".to_string(),
        ]
    );
    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(store.puts().last().map(String::as_str), Some("foo/index.html"));

    let wheel = store.get("my-bucket", "foo/foo-1.0-py3-none-any.whl").unwrap();
    assert_eq!(wheel.body, b"wheel-bytes");
    assert!(wheel.metadata.contains_key("md5"));

    let index = store.get("my-bucket", "foo/index.html").unwrap();
    assert_eq!(index.content_type.as_deref(), Some("text/html"));
    let html = String::from_utf8(index.body).unwrap();
    assert!(html.contains(&format!(
        "href=\"{WHEEL}#md5={}\"",
        hex_md5(b"wheel-bytes")
    )));
    assert!(html.contains(&format!(
        "href=\"{SDIST}#md5={}\"",
        hex_md5(b"sdist-bytes")
    )));
    assert!(!html.contains("foo-0.9.tar.gz"));
    assert_eq!(html.matches("<a href=").count(), 2);
}

#[tokio::test]
async fn second_run_without_override_fails_before_indexing() {
    let tmp = tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let store = MemoryStore::new();

    let first = publish_config(&dir, true);
    publish(&first, &CommandBuilder::new(first.build.clone(), &dir), &store)
        .await
        .expect("first publish should succeed");
    let puts_after_first = store.puts().len();

    // let the rebuild land on a later mtime than the first build
    std::thread::sleep(Duration::from_millis(50));

    let second = publish_config(&dir, false);
    let err = publish(&second, &CommandBuilder::new(second.build.clone(), &dir), &store)
        .await
        .unwrap_err();

    match err {
        PublishError::PackageExists { key } => assert_eq!(key, format!("foo/{WHEEL}")),
        other => panic!("expected PackageExists, got {other:?}"),
    }
    assert_eq!(store.puts().len(), puts_after_first, "nothing written on the failed run");
}

#[tokio::test]
async fn override_rewrites_existing_artifacts() {
    let tmp = tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let store = MemoryStore::new();
    store
        .put_object(PutObjectRequest {
            bucket: "my-bucket".into(),
            key: format!("foo/{SDIST}"),
            body: b"stale".to_vec(),
            ..Default::default()
        })
        .await
        .unwrap();

    let config = publish_config(&dir, true);
    publish(&config, &CommandBuilder::new(config.build.clone(), &dir), &store)
        .await
        .unwrap();

    let sdist = store.get("my-bucket", &format!("foo/{SDIST}")).unwrap();
    assert_eq!(sdist.body, b"sdist-bytes");
}

#[tokio::test]
async fn index_never_lists_itself_across_runs() {
    let store = MemoryStore::new();
    let package = PackageName::new("foo");
    store
        .put_object(PutObjectRequest {
            bucket: "b".into(),
            key: "foo/foo-1.0.tar.gz".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    for _ in 0..3 {
        let report = publish_index(&store, "b", &package).await.unwrap();
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries.iter().all(|e| e.name != "index.html"));
    }
}

#[tokio::test]
async fn index_covers_every_page_of_a_long_listing() {
    let store = MemoryStore::with_page_size(2);
    let package = PackageName::new("foo");
    for version in 0..7 {
        store
            .put_object(PutObjectRequest {
                bucket: "b".into(),
                key: format!("foo/foo-1.{version}.tar.gz"),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    // another package sharing the bucket
    store
        .put_object(PutObjectRequest {
            bucket: "b".into(),
            key: "foobar/foobar-1.0.tar.gz".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = publish_index(&store, "b", &package).await.unwrap();
    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&"foo-1.6.tar.gz"));
    assert!(!names.contains(&"foobar-1.0.tar.gz"));
}

#[tokio::test]
async fn empty_package_gets_empty_index() {
    let store = MemoryStore::new();
    let report = publish_index(&store, "b", &PackageName::new("foo"))
        .await
        .unwrap();
    assert!(report.entries.is_empty());
    assert!(store.get("b", "foo/index.html").is_some());
}

#[tokio::test]
async fn latest_selection_with_nothing_built_still_regenerates_index() {
    let tmp = tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let mut config = publish_config(&dir, true);
    config.build = BuildConfig {
        command: vec!["true".into()],
        selection: ArtifactSelection::Latest,
        ..BuildConfig::default()
    };
    let builder = CommandBuilder::new(config.build.clone(), &dir);
    let store = MemoryStore::new();
    store
        .put_object(PutObjectRequest {
            bucket: "my-bucket".into(),
            key: format!("foo/{SDIST}"),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = publish(&config, &builder, &store).await.unwrap();

    assert!(report.uploaded.is_empty());
    assert_eq!(report.index.entries.len(), 1);
    assert_eq!(store.puts().last().map(String::as_str), Some("foo/index.html"));
}
