// src/dispatch/mod.rs

//! Request dispatch.
//!
//! Maps an inbound request onto a module and decides whether the host should
//! just continue, or whether a rebuild has to happen first. Two mutually
//! exclusive modes, picked from `[config].once`:
//!
//! - per-module: `GET`/`HEAD` for a configured module path rebuilds that
//!   module if it is not fresh.
//! - build-once: the first artifact request compiles every module, and
//!   artifact requests arriving during that pass wait for its outcome. Nothing
//!   is ever rebuilt afterwards, even if the pass failed.

pub mod request;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::coordinator::{BuildStatus, Coordinator, ModuleState};
use crate::diag;
use crate::errors::{BuildError, BuildgateError};
use crate::fs::FileSystem;
use crate::logging::Diagnostics;

pub use request::{Method, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    PerModule,
    BuildOnce,
}

/// What the dispatcher did with a request before passing it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Not a read, not a configured module, or build-once already ran.
    Untouched,
    AlreadyFresh,
    Rebuilt,
    /// The module's source file does not exist; the host answers not-found.
    SourceMissing,
    /// Looking up the source failed for another reason.
    SourceUnreadable,
    BuildFailed,
    /// This request ran the build-once pass or waited for it.
    CompiledAll,
}

/// Pass-through verdict: the host always continues, optionally with an error.
#[derive(Debug)]
pub struct Dispatched {
    pub handling: Handling,
    pub error: Option<BuildgateError>,
}

impl Dispatched {
    fn pass(handling: Handling) -> Self {
        Self {
            handling,
            error: None,
        }
    }

    fn fail(handling: Handling, error: impl Into<BuildgateError>) -> Self {
        Self {
            handling,
            error: Some(error.into()),
        }
    }

    /// True when the artifact can be served as-is.
    pub fn is_fresh(&self) -> bool {
        matches!(
            self.handling,
            Handling::AlreadyFresh | Handling::Rebuilt | Handling::CompiledAll
        ) && self.error.is_none()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    coordinator: Coordinator,
    fs: Arc<dyn FileSystem>,
    mode: DispatchMode,
    artifact_pattern: Regex,
    sources: BTreeMap<String, PathBuf>,
    /// Build-once: outcome of the single compile pass, set once it finished.
    compiled: OnceCell<Result<(), BuildError>>,
    diag: Diagnostics,
}

impl Dispatcher {
    pub fn new(cfg: &ConfigFile, coordinator: Coordinator, fs: Arc<dyn FileSystem>) -> Self {
        let mode = if cfg.once {
            DispatchMode::BuildOnce
        } else {
            DispatchMode::PerModule
        };

        Self {
            coordinator,
            fs,
            mode,
            artifact_pattern: cfg.artifact_pattern.clone(),
            sources: cfg
                .modules
                .iter()
                .map(|(name, module)| (name.clone(), module.source.clone()))
                .collect(),
            compiled: OnceCell::new(),
            diag: Diagnostics::new(cfg.debug),
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub async fn handle(&self, request: &Request) -> Dispatched {
        match self.mode {
            DispatchMode::BuildOnce => self.handle_once(request).await,
            DispatchMode::PerModule => self.handle_per_module(request).await,
        }
    }

    async fn handle_once(&self, request: &Request) -> Dispatched {
        let path = request.pathname();
        if !self.artifact_pattern.is_match(path) {
            return Dispatched::pass(Handling::Untouched);
        }

        if self.compiled.initialized() {
            diag!(self.diag, path, "build-once pass already ran; skipping");
            return Dispatched::pass(Handling::Untouched);
        }

        // Only one caller runs the pass; the rest wait for the same outcome.
        let outcome = self
            .compiled
            .get_or_init(|| async {
                info!(path, "requested an artifact; attempting one-off compilation");
                let outcome = self.coordinator.compile_all().await;
                if let Err(err) = &outcome {
                    warn!(error = %err, "failed to compile modules; no further attempts will be made");
                }
                outcome
            })
            .await;

        match outcome {
            Ok(()) => Dispatched::pass(Handling::CompiledAll),
            Err(err) => Dispatched::fail(Handling::CompiledAll, err.clone()),
        }
    }

    async fn handle_per_module(&self, request: &Request) -> Dispatched {
        if !request.method.is_read() {
            return Dispatched::pass(Handling::Untouched);
        }

        let name = request.pathname();
        let Some(source) = self.sources.get(name) else {
            return Dispatched::pass(Handling::Untouched);
        };

        if let Some(snapshot) = self.coordinator.snapshot(name).await {
            if snapshot.state == ModuleState::Fresh {
                diag!(self.diag, module = name, "fresh; passing through");
                return Dispatched::pass(Handling::AlreadyFresh);
            }
        }

        if let Err(err) = self.fs.entry_kind(source) {
            let err = BuildgateError::from(err);
            if err.is_not_found() {
                diag!(self.diag, module = name, ?source, "source missing; host answers not-found");
                return Dispatched::pass(Handling::SourceMissing);
            }
            warn!(module = name, error = %err, "cannot stat module source");
            return Dispatched::fail(Handling::SourceUnreadable, err);
        }

        match self.coordinator.ensure_fresh(name).await {
            Ok(BuildStatus::AlreadyFresh) => Dispatched::pass(Handling::AlreadyFresh),
            Ok(BuildStatus::Rebuilt) => Dispatched::pass(Handling::Rebuilt),
            Err(err) => Dispatched::fail(Handling::BuildFailed, err),
        }
    }
}
