// tests/dispatch_per_module.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{fake_coordinator, init_tracing, with_timeout};

use std::sync::Arc;

use buildgate::config::{ConfigFile, ModuleConfig};
use buildgate::coordinator::ModuleState;
use buildgate::dispatch::{DispatchMode, Dispatcher, Handling, Method, Request};
use buildgate::errors::{BuildError, BuildgateError};
use buildgate::fs::mock::MockFileSystem;
use buildgate::watch::ChangeKind;
use buildgate_test_utils::fake_builder::FakeBuilder;
use buildgate_test_utils::fake_watch::FakeWatchBackend;

fn two_module_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .bundle()
        .with_module("/app.js", ModuleConfig::default())
        .with_module("/admin.js", ModuleConfig::default())
        .build()
}

fn setup(cfg: &ConfigFile, builder: &FakeBuilder, watch: &FakeWatchBackend) -> (Dispatcher, MockFileSystem) {
    let fs = MockFileSystem::new();
    fs.add_file("/src/app.js", "define([], function () {});");
    let coordinator = fake_coordinator(cfg, builder, watch);
    let dispatcher = Dispatcher::new(cfg, coordinator, Arc::new(fs.clone()));
    (dispatcher, fs)
}

#[tokio::test]
async fn first_get_builds_the_module() {
    init_tracing();

    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    builder.succeed_with("/app.js", &["/src/app.js"]);
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);
    assert_eq!(dispatcher.mode(), DispatchMode::PerModule);

    let verdict = with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    assert_eq!(verdict.handling, Handling::Rebuilt);
    assert!(verdict.error.is_none());
    assert!(verdict.is_fresh());
    assert_eq!(builder.calls("/app.js"), 1);

    let again = with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    assert_eq!(again.handling, Handling::AlreadyFresh);
    assert_eq!(builder.calls("/app.js"), 1);
}

#[tokio::test]
async fn writes_and_unknown_paths_pass_through() {
    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    let post = Request::new(Method::Other("POST".to_string()), "/app.js");
    assert_eq!(with_timeout(dispatcher.handle(&post)).await.handling, Handling::Untouched);

    let unknown = Request::get("/vendor/jquery.js");
    assert_eq!(with_timeout(dispatcher.handle(&unknown)).await.handling, Handling::Untouched);

    assert!(builder.call_log().is_empty());
    let snapshot = dispatcher.coordinator().snapshot("/app.js").await.expect("configured");
    assert_eq!(snapshot.state, ModuleState::Unbuilt);
    assert_eq!(snapshot.builds_started, 0);
}

#[tokio::test]
async fn head_requests_count_as_reads() {
    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    let head = Request::new(Method::Head, "/app.js");
    assert_eq!(with_timeout(dispatcher.handle(&head)).await.handling, Handling::Rebuilt);
}

#[tokio::test]
async fn query_and_fragment_are_ignored_for_lookup() {
    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    let verdict = with_timeout(dispatcher.handle(&Request::get("/app.js?v=12#top"))).await;
    assert_eq!(verdict.handling, Handling::Rebuilt);
    assert_eq!(builder.call_log(), vec!["/app.js".to_string()]);
}

#[tokio::test]
async fn missing_source_is_left_to_the_host() {
    init_tracing();

    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    // `/src/admin.js` was never created.
    let verdict = with_timeout(dispatcher.handle(&Request::get("/admin.js"))).await;
    assert_eq!(verdict.handling, Handling::SourceMissing);
    assert!(verdict.error.is_none());
    assert!(!verdict.is_fresh());
    assert_eq!(builder.calls("/admin.js"), 0);
}

#[tokio::test]
async fn source_appearing_later_gets_built() {
    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    let watch = FakeWatchBackend::new();
    let (dispatcher, fs) = setup(&cfg, &builder, &watch);

    let first = with_timeout(dispatcher.handle(&Request::get("/admin.js"))).await;
    assert_eq!(first.handling, Handling::SourceMissing);

    fs.add_file("/src/admin.js", "define({});");
    let second = with_timeout(dispatcher.handle(&Request::get("/admin.js"))).await;
    assert_eq!(second.handling, Handling::Rebuilt);
}

#[tokio::test]
async fn build_failure_is_forwarded_and_retried_next_time() {
    init_tracing();

    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    builder.fail("/app.js", "Error: Missing dependency 'lib/x'");
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    let verdict = with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    assert_eq!(verdict.handling, Handling::BuildFailed);
    assert!(matches!(
        verdict.error,
        Some(BuildgateError::Build(BuildError::Failed { ref module, .. })) if module == "/app.js"
    ));
    assert!(!verdict.is_fresh());

    let snapshot = dispatcher.coordinator().snapshot("/app.js").await.expect("configured");
    assert_eq!(snapshot.state, ModuleState::Stale);

    builder.succeed_with("/app.js", &["/src/app.js"]);
    let retry = with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    assert_eq!(retry.handling, Handling::Rebuilt);
    assert_eq!(builder.calls("/app.js"), 2);
}

#[tokio::test]
async fn stale_module_is_rebuilt_on_next_request() {
    let cfg = two_module_config();
    let builder = FakeBuilder::new();
    builder.succeed_with("/app.js", &["/src/app.js", "/src/lib/util.js"]);
    let watch = FakeWatchBackend::new();
    let (dispatcher, _fs) = setup(&cfg, &builder, &watch);

    with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    watch.fire("/src/lib/util.js", ChangeKind::Modified);

    let verdict = with_timeout(dispatcher.handle(&Request::get("/app.js"))).await;
    assert_eq!(verdict.handling, Handling::Rebuilt);
    assert_eq!(builder.calls("/app.js"), 2);
}

#[test]
fn request_lines_parse_into_method_and_target() {
    let req = Request::parse_line("get /app.js?x=1").expect("two words");
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.pathname(), "/app.js");

    let req = Request::parse_line("PUT /app.js").expect("two words");
    assert_eq!(req.method, Method::Other("PUT".to_string()));
    assert!(!req.method.is_read());

    assert!(Request::parse_line("").is_none());
    assert!(Request::parse_line("GET").is_none());
}
