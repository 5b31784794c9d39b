// tests/optimizer_builder.rs
#![cfg(unix)]

mod common;
use crate::common::builders::{ConfigFileBuilder, ModuleConfigBuilder};
use crate::common::{init_tracing, with_timeout};

use std::fs;

use buildgate::build::{BuildOutcome, Builder, OptimizerBuilder};
use buildgate::config::ConfigFile;
use buildgate::errors::BuildError;
use buildgate::logging::Diagnostics;
use tempfile::tempdir;

fn shell(script: &str) -> Vec<String> {
    ["sh", "-c", script, "sh"].iter().map(|s| s.to_string()).collect()
}

fn app_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .bundle()
        .with_module(
            "/app.js",
            ModuleConfigBuilder::new()
                .base_url("js")
                .option("optimize", "none")
                .build(),
        )
        .build()
}

#[tokio::test]
async fn parses_report_on_success() {
    init_tracing();

    let tmp = tempdir().expect("tempdir");
    let script = r#"
printf '\nout.js\n----------------\n'
printf 'app.js\nlib/util.js\n../shared/x.js\n\napp.js\n'
"#;
    let builder = OptimizerBuilder::new(shell(script), tmp.path(), Diagnostics::default());
    let cfg = app_config();

    let outcome = with_timeout(builder.build(cfg.module("/app.js").expect("configured"))).await;
    let base = tmp.path().join("js");
    assert_eq!(
        outcome,
        BuildOutcome::Success(vec![
            base.join("app.js"),
            base.join("lib/util.js"),
            tmp.path().join("shared/x.js"),
        ])
    );
}

#[tokio::test]
async fn passes_module_settings_as_arguments() {
    let tmp = tempdir().expect("tempdir");
    let args_file = tmp.path().join("args.txt");
    let script = format!(
        r#"for a in "$@"; do echo "$a" >> '{}'; done; printf 'h\nh\nh\n'"#,
        args_file.display()
    );
    let builder = OptimizerBuilder::new(shell(&script), tmp.path(), Diagnostics::default());
    let cfg = app_config();

    let outcome = with_timeout(builder.build(cfg.module("/app.js").expect("configured"))).await;
    assert_eq!(outcome, BuildOutcome::Success(vec![]));

    let recorded = fs::read_to_string(&args_file).expect("args recorded");
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        lines,
        vec!["name=app", "out=/dest/app.js", "baseUrl=js", "optimize=none"]
    );
}

#[tokio::test]
async fn non_zero_exit_is_a_failure_with_stderr() {
    let tmp = tempdir().expect("tempdir");
    let script = "echo 'Error: module lib/x not found' >&2; exit 3";
    let builder = OptimizerBuilder::new(shell(script), tmp.path(), Diagnostics::default());
    let cfg = app_config();

    let outcome = with_timeout(builder.build(cfg.module("/app.js").expect("configured"))).await;
    match outcome {
        BuildOutcome::Failure(BuildError::Failed { module, detail, .. }) => {
            assert_eq!(module, "/app.js");
            assert!(detail.contains("lib/x not found"), "{detail}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() {
    let tmp = tempdir().expect("tempdir");
    let builder = OptimizerBuilder::new(
        vec!["/nonexistent/optimizer-binary".to_string()],
        tmp.path(),
        Diagnostics::default(),
    );
    let cfg = app_config();

    let outcome = with_timeout(builder.build(cfg.module("/app.js").expect("configured"))).await;
    assert!(matches!(outcome, BuildOutcome::Failure(BuildError::Spawn { .. })));
}
