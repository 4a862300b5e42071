//! Preloading through `Preloader`.
//!
//! # What is tested
//!
//! - The concurrency bound holds
//! - Dependencies are planned before their dependents
//! - Observer decisions: proceed, cancel, dropped without an answer
//! - List and package failures are reported and `on_done` still fires
//! - Resident packages with changed content are reported, not replaced

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bundlekit_core::HTTP_TIMEOUT_CODE;
use bundlekit_loader::{
    PreloadDecision, PreloadError, PreloadObserver, PreloadPlan, PreloadRequest, Preloader,
    ProceedAll,
};
use common::{LoaderFixture, catalog, package_body, package_path, serve, serve_body, text};
use url::Url;

// ── Recording observer ─────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Answer {
    Proceed,
    Cancel,
    Drop,
}

struct Recorder {
    answer: Answer,
    plans: Mutex<Vec<PreloadPlan>>,
    progress: Mutex<Vec<f64>>,
    done: AtomicUsize,
    list_failures: Mutex<Vec<(i32, String)>>,
    package_failures: Mutex<Vec<(String, i32)>>,
}

impl Recorder {
    fn new(answer: Answer) -> Self {
        Self {
            answer,
            plans: Mutex::new(Vec::new()),
            progress: Mutex::new(Vec::new()),
            done: AtomicUsize::new(0),
            list_failures: Mutex::new(Vec::new()),
            package_failures: Mutex::new(Vec::new()),
        }
    }

    fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    fn plans(&self) -> Vec<PreloadPlan> {
        self.plans.lock().unwrap().clone()
    }

    fn progress(&self) -> Vec<f64> {
        self.progress.lock().unwrap().clone()
    }
}

impl PreloadObserver for Recorder {
    fn before_start(&self, plan: &PreloadPlan, decision: PreloadDecision) {
        self.plans.lock().unwrap().push(plan.clone());
        match self.answer {
            Answer::Proceed => decision.proceed(),
            Answer::Cancel => decision.cancel(),
            Answer::Drop => drop(decision),
        }
    }

    fn on_progress(&self, progress: f64) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    fn on_list_failed(&self, code: i32, reason: &str) {
        self.list_failures
            .lock()
            .unwrap()
            .push((code, reason.to_string()));
    }

    fn on_package_failed(&self, name: &str, code: i32, _reason: &str) {
        self.package_failures
            .lock()
            .unwrap()
            .push((name.to_string(), code));
    }
}

fn preloader(f: &LoaderFixture) -> Preloader {
    Preloader::new(Arc::clone(&f.loader))
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_parallelism_is_bounded() {
    let f = LoaderFixture::new();
    let names: Vec<String> = (0..6).map(|i| format!("pkg{i}")).collect();
    let entries = names
        .iter()
        .map(|name| {
            let asset = format!("{name}.txt");
            serve(&f.transport, name, &[asset.as_str()], &[])
        })
        .collect();
    f.install(catalog("1.0.0", entries));
    f.transport.set_latency(Duration::from_millis(20));

    let observer = Recorder::new(Answer::Proceed);
    let report = preloader(&f)
        .run(
            PreloadRequest::names(names.clone()).with_max_parallel(2),
            &observer,
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.downloaded.len(), 6);
    assert!(f.transport.max_in_flight() <= 2);
    assert_eq!(observer.done(), 1);
    let progress = observer.progress();
    assert_eq!(progress.len(), 6);
    assert!((progress[5] - 1.0).abs() < f64::EPSILON);
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_dependency_closure_is_planned_first() {
    let f = LoaderFixture::new();
    f.install(catalog(
        "1.0.0",
        vec![
            serve(&f.transport, "base", &["base.txt"], &[]),
            serve(&f.transport, "mid", &["mid.txt"], &["base"]),
            serve(&f.transport, "nested", &["nested.txt"], &["mid"]),
        ],
    ));

    let observer = Recorder::new(Answer::Proceed);
    let report = preloader(&f)
        .run(PreloadRequest::names(["nested", "unknown"]), &observer)
        .await
        .unwrap();

    let plan = &observer.plans()[0];
    assert_eq!(plan.downloads, vec!["base", "mid", "nested"]);
    assert!(plan.total_bytes > 0);
    assert_eq!(report.unknown, vec!["unknown"]);
    for name in ["base", "mid", "nested"] {
        assert!(f.loader.is_resident_on_disk(name).await);
        assert!(!f.loader.is_resident_in_memory(name));
    }
}

#[tokio::test]
async fn test_cached_packages_are_skipped() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));
    let p = preloader(&f);

    p.run(PreloadRequest::names(["ui"]), &ProceedAll).await.unwrap();
    let observer = Recorder::new(Answer::Proceed);
    let report = p.run(PreloadRequest::names(["ui"]), &observer).await.unwrap();

    assert!(report.downloaded.is_empty());
    assert!(observer.plans().is_empty());
    assert_eq!(observer.done(), 1);
    assert_eq!(f.transport.hits(&package_path("ui")), 1);
}

#[tokio::test]
async fn test_dropped_decision_fails() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let observer = Recorder::new(Answer::Drop);
    let err = preloader(&f)
        .run(PreloadRequest::names(["ui"]), &observer)
        .await
        .unwrap_err();

    assert_eq!(err, PreloadError::NoDecision);
    assert_eq!(f.transport.total_requests(), 0);
    assert_eq!(observer.done(), 0);
}

#[tokio::test]
async fn test_cancel_downloads_nothing() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let observer = Recorder::new(Answer::Cancel);
    let report = preloader(&f)
        .run(PreloadRequest::names(["ui"]), &observer)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(!report.is_complete());
    assert_eq!(f.transport.total_requests(), 0);
}

#[tokio::test]
async fn test_preload_list_is_fetched() {
    let f = LoaderFixture::new();
    f.install(catalog(
        "1.0.0",
        vec![
            serve(&f.transport, "ui", &["title.txt"], &[]),
            serve(&f.transport, "audio", &["theme.ogg"], &[]),
        ],
    ));
    f.transport.route(
        "/lists/intro.json",
        200,
        serde_json::json!({"name": "intro", "packages": ["ui"]}).to_string(),
    );

    let url = Url::parse("http://cdn.test/lists/intro.json").unwrap();
    let report = preloader(&f)
        .run(PreloadRequest::list(url), &ProceedAll)
        .await
        .unwrap();

    assert_eq!(report.downloaded, vec!["ui"]);
    assert_eq!(f.transport.hits(&package_path("audio")), 0);
}

#[tokio::test]
async fn test_list_failure_is_reported() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));

    let observer = Recorder::new(Answer::Proceed);
    let url = Url::parse("http://cdn.test/lists/missing.json").unwrap();
    let err = preloader(&f)
        .run(PreloadRequest::list(url), &observer)
        .await
        .unwrap_err();

    assert!(matches!(err, PreloadError::ListFailed(_)));
    let failures = observer.list_failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 404);
}

#[tokio::test]
async fn test_package_failure_still_finishes() {
    let f = LoaderFixture::new();
    let broken = package_body(&[("broken.txt", "x")]);
    let broken_entry = common::entry_for("broken", &broken, &["broken.txt"], &[]);
    f.transport.route(&package_path("broken"), 500, "server error");
    f.install(catalog(
        "1.0.0",
        vec![serve(&f.transport, "ui", &["title.txt"], &[]), broken_entry],
    ));

    let observer = Recorder::new(Answer::Proceed);
    let report = preloader(&f)
        .run(
            PreloadRequest::names(["ui", "broken"]).with_max_parallel(2),
            &observer,
        )
        .await
        .unwrap();

    assert_eq!(report.downloaded, vec!["ui"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].package, "broken");
    assert_eq!(report.failed[0].code, 500);
    assert_eq!(report.failed[0].reason, "server error");
    assert_eq!(
        observer.package_failures.lock().unwrap().clone(),
        vec![("broken".to_string(), 500)]
    );
    assert_eq!(observer.done(), 1);
}

#[tokio::test]
async fn test_transfer_timeout_uses_timeout_code() {
    let f = LoaderFixture::new();
    f.install(catalog("1.0.0", vec![serve(&f.transport, "ui", &["title.txt"], &[])]));
    f.transport.delay(&package_path("ui"), Duration::from_secs(5));

    let report = preloader(&f)
        .run(
            PreloadRequest::names(["ui"]).with_timeout(Some(Duration::from_millis(50))),
            &ProceedAll,
        )
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].code, HTTP_TIMEOUT_CODE);
}

/// v1.0.0 is loaded, v1.0.1 changes the package. A preload must leave the
/// resident content alone until the caller unloads it.
#[tokio::test]
async fn test_stale_resident_waits_for_unload() {
    let f = LoaderFixture::new();
    let c1 = package_body(&[("title.txt", "c1")]);
    f.install(catalog(
        "1.0.0",
        vec![serve_body(&f.transport, "ui", &c1, &["title.txt"], &[])],
    ));
    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("c1"));

    let c2 = package_body(&[("title.txt", "c2")]);
    f.install(catalog(
        "1.0.1",
        vec![serve_body(&f.transport, "ui", &c2, &["title.txt"], &[])],
    ));

    let p = preloader(&f);
    let observer = Recorder::new(Answer::Proceed);
    let report = p.run(PreloadRequest::names(["ui"]), &observer).await.unwrap();

    assert_eq!(report.stale_resident, vec!["ui"]);
    assert!(report.downloaded.is_empty());
    assert_eq!(observer.plans()[0].stale_resident, vec!["ui"]);
    assert_eq!(f.transport.hits(&package_path("ui")), 1);
    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("c1"));

    f.loader.unload_all();
    let report = p.run(PreloadRequest::names(["ui"]), &ProceedAll).await.unwrap();

    assert_eq!(report.downloaded, vec!["ui"]);
    assert!(report.stale_resident.is_empty());
    assert_eq!(f.loader.load_asset("title.txt", None).await.unwrap(), text("c2"));
    assert_eq!(f.transport.hits(&package_path("ui")), 2);
}
