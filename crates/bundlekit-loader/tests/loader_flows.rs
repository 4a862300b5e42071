//! End-to-end loading through `PackageLoader`.
//!
//! # What is tested
//!
//! - Unknown assets fail without touching the network
//! - Single packages and dependency chains load and stay resident
//! - Concurrent loads of one package share a single download
//! - Cycles fail instead of hanging
//! - Unload, reload from disk, and catalog updates leaving residents alone
//! - Removing a catalog unloads only the packages it supplied
//! - Deadlines surface as timeouts

mod common;

use std::sync::Arc;
use std::time::Duration;

use bundlekit_core::{Catalog, LoadError, LoadErrorKind};
use common::{LoaderFixture, catalog, package_body, package_path, serve, serve_body, text};

#[tokio::test]
async fn test_unknown_asset_makes_no_request() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let err = f.loader.load_asset("missing.txt", None).await.unwrap_err();

    assert_eq!(err, LoadError::not_contained("missing.txt"));
    assert_eq!(err.kind(), LoadErrorKind::NotContained);
    assert_eq!(f.transport.total_requests(), 0);
}

#[tokio::test]
async fn test_package_without_dependencies() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let asset = f.loader.load_asset("title.txt", None).await.unwrap();

    assert_eq!(asset, text("ui:title.txt"));
    assert!(f.loader.is_resident_in_memory("ui"));
    assert!(f.loader.is_resident_on_disk("ui").await);
    assert_eq!(f.transport.hits(&package_path("ui")), 1);
}

#[tokio::test]
async fn test_dependency_chain_loads_every_level() {
    let f = LoaderFixture::new();
    f.install(catalog(
        "1.0.0",
        vec![
            serve(&f.transport, "base", &["base.txt"], &[]),
            serve(&f.transport, "mid", &["mid.txt"], &["base"]),
            serve(&f.transport, "nested", &["nested.txt"], &["mid"]),
        ],
    ));

    let asset = f.loader.load_asset("nested.txt", None).await.unwrap();

    assert_eq!(asset, text("nested:nested.txt"));
    for name in ["base", "mid", "nested"] {
        assert!(f.loader.is_resident_in_memory(name), "{name} not resident");
        assert_eq!(f.transport.hits(&package_path(name)), 1);
    }
    assert_eq!(
        f.loader.resident_asset_names().into_iter().collect::<Vec<_>>(),
        vec!["base.txt", "mid.txt", "nested.txt"]
    );
}

#[tokio::test]
async fn test_concurrent_loads_share_one_download() {
    let f = LoaderFixture::new();
    f.install(catalog(
        "1.0.0",
        vec![serve(&f.transport, "ui", &["title.txt", "body.txt"], &[])],
    ));
    f.transport.set_latency(Duration::from_millis(30));

    let (title, body) = tokio::join!(
        f.loader.load_asset("title.txt", None),
        f.loader.load_asset("body.txt", None),
    );

    assert_eq!(title.unwrap(), text("ui:title.txt"));
    assert_eq!(body.unwrap(), text("ui:body.txt"));
    assert_eq!(f.transport.hits(&package_path("ui")), 1);
    assert_eq!(f.cache.store_count(), 1);
}

#[tokio::test]
async fn test_cycle_fails_instead_of_hanging() {
    let f = LoaderFixture::new();
    f.install(catalog(
        "1.0.0",
        vec![
            serve(&f.transport, "a", &["a.txt"], &["b"]),
            serve(&f.transport, "b", &["b.txt"], &["a"]),
        ],
    ));

    let err = tokio::time::timeout(Duration::from_secs(5), f.loader.load_asset("a.txt", None))
        .await
        .expect("cyclic load must not hang")
        .unwrap_err();

    assert_eq!(err.kind(), LoadErrorKind::FailedToLoadDependentBundles);
    assert!(err.to_string().contains("a -> b -> a"), "{err}");
}

#[tokio::test]
async fn test_unload_all_then_reload_from_disk() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    f.loader.load_asset("title.txt", None).await.unwrap();
    f.loader.unload_all();
    assert!(!f.loader.is_resident_in_memory("ui"));
    assert!(f.loader.resident_package_names().is_empty());

    let again = f.loader.load_asset("title.txt", None).await.unwrap();

    assert_eq!(again, text("ui:title.txt"));
    assert!(f.loader.is_resident_in_memory("ui"));
    assert_eq!(f.transport.hits(&package_path("ui")), 1);
}

#[tokio::test]
async fn test_catalog_update_keeps_resident_content() {
    let f = LoaderFixture::new();
    let v1 = package_body(&[("title.txt", "first")]);
    f.install(catalog(
        "1.0.0",
        vec![serve_body(&f.transport, "ui", &v1, &["title.txt"], &[])],
    ));
    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("first"));

    let v2 = package_body(&[("title.txt", "second")]);
    f.install(catalog(
        "1.0.1",
        vec![serve_body(&f.transport, "ui", &v2, &["title.txt"], &[])],
    ));

    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("first"));
    assert!(!f.loader.is_resident_on_disk("ui").await);

    assert!(f.loader.unload("ui"));
    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("second"));
    assert_eq!(f.transport.hits(&package_path("ui")), 2);
}

#[tokio::test]
async fn test_deadline_reports_timeout() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));
    f.transport.delay(&package_path("ui"), Duration::from_secs(5));

    let err = f
        .loader
        .load_asset("title.txt", Some(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err}");
    assert_eq!(err.kind(), LoadErrorKind::DownloadFailed);
    assert!(!f.loader.is_resident_in_memory("ui"));
}

#[tokio::test]
async fn test_missing_asset_in_package_is_null() {
    let f = LoaderFixture::new();
    let body = package_body(&[("title.txt", "hi")]);
    f.install(catalog(
        "1.0.0",
        vec![serve_body(&f.transport, "ui", &body, &["title.txt", "ghost.txt"], &[])],
    ));

    let err = f.loader.load_asset("ghost.txt", None).await.unwrap_err();

    assert_eq!(err.kind(), LoadErrorKind::NullAssetFound);
    assert!(f.loader.is_resident_in_memory("ui"));
}

#[tokio::test]
async fn test_typed_load_mismatch_is_null() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let title: String = f.loader.load_asset_as("title.txt", None).await.unwrap();
    assert_eq!(title, "ui:title.txt");

    let err = f
        .loader
        .load_asset_as::<bytes::Bytes>("title.txt", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LoadErrorKind::NullAssetFound);
}

#[tokio::test]
async fn test_clean_cached_packages_forces_download() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));
    f.loader.load_asset("title.txt", None).await.unwrap();

    f.loader.clean_cached_packages().await.unwrap();
    assert!(!f.loader.is_resident_in_memory("ui"));
    assert!(!f.loader.is_resident_on_disk("ui").await);

    f.loader.load_asset("title.txt", None).await.unwrap();
    assert_eq!(f.transport.hits(&package_path("ui")), 2);
}

#[tokio::test]
async fn test_remove_catalog_keeps_shadowed_resident() {
    let f = LoaderFixture::new();
    let shared = serve(&f.transport, "shared", &["s.txt"], &[]);
    f.install(catalog("1.0.0", vec![shared.clone()]));
    f.install(Arc::new(
        Catalog::new(
            "dlc",
            "1.0.0",
            vec![shared, serve(&f.transport, "extra", &["e.txt"], &[])],
        )
        .unwrap(),
    ));
    f.loader.load_asset("s.txt", None).await.unwrap();
    f.loader.load_asset("e.txt", None).await.unwrap();

    f.loader.remove_catalog("dlc").unwrap();

    assert!(f.loader.is_resident_in_memory("shared"));
    assert!(!f.loader.is_resident_in_memory("extra"));
}
