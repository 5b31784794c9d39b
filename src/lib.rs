// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::build::builder_for_config;
use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::coordinator::Coordinator;
use crate::dispatch::{Dispatched, Dispatcher, Request};
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::Diagnostics;
use crate::watch::NotifyWatchBackend;

/// Wire the real collaborators into a dispatcher for `cfg`.
///
/// Must be called inside a Tokio runtime (module actors are spawned here).
pub fn dispatcher_from_config(cfg: &ConfigFile) -> Dispatcher {
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let builder = builder_for_config(cfg, Arc::clone(&fs), working_dir);
    let watcher = Arc::new(NotifyWatchBackend::new(Diagnostics::new(cfg.debug)));

    let coordinator = Coordinator::from_config(cfg, builder, watcher);
    Dispatcher::new(cfg, coordinator, fs)
}

/// High-level entry point used by `main.rs`.
///
/// Acts as a minimal host pipeline: each stdin line `METHOD PATH` is one
/// inbound request, and the pass-through verdict is printed to stdout.
/// Requests are handled concurrently so a slow build never blocks requests
/// for other modules. Stops at end of input or on Ctrl-C.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let dispatcher = Arc::new(dispatcher_from_config(&cfg));
    let modules: Vec<&str> = dispatcher.coordinator().module_names().collect();
    info!(mode = ?dispatcher.mode(), ?modules, "buildgate ready; reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = tokio::task::JoinSet::new();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received; shutting down");
                break;
            }
        };

        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };

        let Some(request) = Request::parse_line(&line) else {
            continue;
        };

        let dispatcher = Arc::clone(&dispatcher);
        in_flight.spawn(async move {
            let verdict = dispatcher.handle(&request).await;
            println!("{}", render_verdict(&request, &verdict));
        });
    }

    while in_flight.join_next().await.is_some() {}

    info!("buildgate exiting");
    Ok(())
}

fn render_verdict(request: &Request, verdict: &Dispatched) -> String {
    match &verdict.error {
        Some(err) => format!(
            "{} {} -> {:?} error: {err}",
            request.method, request.target, verdict.handling
        ),
        None => format!(
            "{} {} -> {:?}",
            request.method, request.target, verdict.handling
        ),
    }
}

/// Simple dry-run output: print the resolved modules.
fn print_dry_run(cfg: &ConfigFile) {
    println!("buildgate dry-run");
    println!("  src = {}", cfg.src.display());
    println!("  dest = {}", cfg.dest.display());
    println!("  build = {}", cfg.build);
    println!("  once = {}", cfg.once);
    println!("  rewatch = {}", cfg.rewatch);
    if !cfg.optimizer.is_empty() {
        println!("  optimizer = {:?}", cfg.optimizer);
    }
    println!();

    println!("modules ({}):", cfg.modules.len());
    for (name, module) in cfg.modules.iter() {
        println!("  - {name}");
        println!("      entry: {}", module.entry);
        println!("      source: {}", module.source.display());
        println!("      out: {}", module.out.display());
        if let Some(ref base_url) = module.base_url {
            println!("      base_url: {}", base_url.display());
        }
        if cfg.build || cfg.once {
            println!("      optimizer args: {:?}", build::optimizer::build_args(module));
        }
    }

    debug!("dry-run complete (nothing served)");
}
