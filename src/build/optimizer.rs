// src/build/optimizer.rs

//! External optimizer invocation.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::build::{BuildOutcome, Builder, parse_build_report};
use crate::config::BuildConfig;
use crate::diag;
use crate::errors::BuildError;
use crate::logging::Diagnostics;
use crate::watch::normalize_path;

/// How much of the optimizer's stderr is kept in a [`BuildError`].
const MAX_ERROR_DETAIL: usize = 4096;

/// Runs the configured optimizer command once per build.
///
/// The module's build config is appended as `key=value` arguments:
/// `name=<entry> out=<out> [baseUrl=<base_url>]`, then every option. Nested
/// option tables become dotted keys (`paths.jquery=...`), arrays are joined
/// with commas.
#[derive(Debug, Clone)]
pub struct OptimizerBuilder {
    command: Vec<String>,
    working_dir: PathBuf,
    diag: Diagnostics,
}

impl OptimizerBuilder {
    pub fn new(command: Vec<String>, working_dir: impl Into<PathBuf>, diag: Diagnostics) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
            diag,
        }
    }

    async fn run(&self, config: &BuildConfig) -> BuildOutcome {
        let Some((program, fixed_args)) = self.command.split_first() else {
            return BuildOutcome::Failure(BuildError::Spawn {
                module: config.name.clone(),
                detail: "no optimizer command configured".to_string(),
            });
        };

        let args = build_args(config);
        info!(module = %config.name, cmd = %program, "compiling now");
        diag!(self.diag, module = %config.name, ?args, "optimizer arguments");

        let output = Command::new(program)
            .args(fixed_args)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!(module = %config.name, error = %err, "failed to spawn optimizer");
                return BuildOutcome::Failure(BuildError::Spawn {
                    module: config.name.clone(),
                    detail: err.to_string(),
                });
            }
        };

        if !output.status.success() {
            let detail = tail(&String::from_utf8_lossy(&output.stderr), MAX_ERROR_DETAIL);
            warn!(
                module = %config.name,
                status = %output.status,
                "compilation failed"
            );
            return BuildOutcome::Failure(BuildError::Failed {
                module: config.name.clone(),
                status: output.status.to_string(),
                detail,
            });
        }

        let report = String::from_utf8_lossy(&output.stdout);
        let base = match &config.base_url {
            Some(base_url) => normalize_path(&self.working_dir, base_url),
            None => self.working_dir.clone(),
        };
        let deps = parse_build_report(&report, &base);
        diag!(self.diag, module = %config.name, deps = deps.len(), "optimizer reported dependencies");

        BuildOutcome::Success(deps)
    }
}

impl Builder for OptimizerBuilder {
    fn build<'a>(
        &'a self,
        config: &'a BuildConfig,
    ) -> Pin<Box<dyn Future<Output = BuildOutcome> + Send + 'a>> {
        Box::pin(self.run(config))
    }
}

/// Arguments describing one module build.
pub fn build_args(config: &BuildConfig) -> Vec<String> {
    let mut args = vec![
        format!("name={}", config.entry),
        format!("out={}", config.out.display()),
    ];
    if let Some(base_url) = &config.base_url {
        args.push(format!("baseUrl={}", base_url.display()));
    }
    push_options(&mut args, "", &config.options);
    args
}

fn push_options(args: &mut Vec<String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => push_options(args, &key, nested),
            other => args.push(format!("{key}={}", render_value(other))),
        }
    }
}

fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        toml::Value::Table(_) => String::new(),
    }
}

fn tail(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
