// tests/copy_mode.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, with_timeout};

use std::fs;
use std::sync::Arc;

use buildgate::build::{BuildOutcome, Builder, CopyBuilder, builder_for_config};
use buildgate::config::ModuleConfig;
use buildgate::coordinator::{Coordinator, ModuleState};
use buildgate::dispatch::{Dispatcher, Handling, Request};
use buildgate::errors::BuildError;
use buildgate::fs::RealFileSystem;
use buildgate::fs::mock::MockFileSystem;
use buildgate::watch::ChangeKind;
use buildgate_test_utils::fake_watch::FakeWatchBackend;
use tempfile::tempdir;

#[tokio::test]
async fn copies_source_verbatim_and_watches_it() {
    init_tracing();

    let tmp = tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dest = tmp.path().join("dest");
    fs::create_dir_all(src.join("lib")).expect("mkdir");
    let body = b"// not bundled\nexport const x = 1;\n\xE2\x9C\x93\n";
    fs::write(src.join("lib/foo.js"), body).expect("write source");

    let cfg = ConfigFileBuilder::new()
        .src(&src)
        .dest(&dest)
        .with_module("/lib/foo.js", ModuleConfig::default())
        .build();

    let fs_impl = Arc::new(RealFileSystem);
    let builder = builder_for_config(&cfg, fs_impl.clone(), tmp.path());
    assert!(format!("{builder:?}").contains("CopyBuilder"));

    let watch = FakeWatchBackend::new();
    let coordinator = Coordinator::from_config(&cfg, builder, Arc::new(watch.clone()));
    let dispatcher = Dispatcher::new(&cfg, coordinator, fs_impl);

    let verdict = with_timeout(dispatcher.handle(&Request::get("/lib/foo.js"))).await;
    assert_eq!(verdict.handling, Handling::Rebuilt);
    assert_eq!(fs::read(dest.join("lib/foo.js")).expect("copied"), body);
    assert_eq!(watch.registrations(), vec![vec![src.join("lib/foo.js")]]);

    // Fresh: no second copy, no second watch.
    fs::write(src.join("lib/foo.js"), "changed").expect("rewrite");
    for _ in 0..3 {
        let verdict = with_timeout(dispatcher.handle(&Request::get("/lib/foo.js"))).await;
        assert_eq!(verdict.handling, Handling::AlreadyFresh);
    }
    assert_eq!(fs::read(dest.join("lib/foo.js")).expect("copied"), body);
    assert_eq!(watch.registrations().len(), 1);

    // Once the watch reports the edit, the next request copies again.
    assert_eq!(watch.fire(src.join("lib/foo.js"), ChangeKind::Modified), 1);
    let verdict = with_timeout(dispatcher.handle(&Request::get("/lib/foo.js"))).await;
    assert_eq!(verdict.handling, Handling::Rebuilt);
    assert_eq!(fs::read_to_string(dest.join("lib/foo.js")).expect("copied"), "changed");
    assert_eq!(watch.registrations().len(), 1);
}

#[tokio::test]
async fn copy_failure_reports_io_error_and_leaves_module_stale() {
    let cfg = ConfigFileBuilder::new()
        .with_module("/gone.js", ModuleConfig::default())
        .build();
    let fs = MockFileSystem::new();
    let builder = CopyBuilder::new(Arc::new(fs.clone()), "/");
    let module = cfg.module("/gone.js").expect("configured");

    let outcome = with_timeout(builder.build(module)).await;
    assert!(matches!(
        outcome,
        BuildOutcome::Failure(BuildError::Io { ref module, .. }) if module == "/gone.js"
    ));

    let watch = FakeWatchBackend::new();
    let coordinator = Coordinator::from_config(&cfg, Arc::new(builder), Arc::new(watch.clone()));
    let result = with_timeout(coordinator.ensure_fresh("/gone.js")).await;
    assert!(matches!(result, Err(BuildError::Io { .. })));

    let snapshot = coordinator.snapshot("/gone.js").await.expect("configured");
    assert_eq!(snapshot.state, ModuleState::Stale);
    assert!(!snapshot.watched);
    assert!(watch.registrations().is_empty());
}

#[tokio::test]
async fn copy_into_mock_filesystem_creates_destination() {
    let cfg = ConfigFileBuilder::new()
        .with_module("/app.js", ModuleConfig::default())
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/src/app.js", "console.log(1);");
    let builder = CopyBuilder::new(Arc::new(fs.clone()), "/");

    let outcome = with_timeout(builder.build(cfg.module("/app.js").expect("configured"))).await;
    assert_eq!(outcome, BuildOutcome::Success(vec!["/src/app.js".into()]));
    assert_eq!(fs.contents("/dest/app.js"), Some(b"console.log(1);".to_vec()));
}
