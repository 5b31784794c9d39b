// src/coordinator/mod.rs

//! Rebuild coordination.
//!
//! This module ties together:
//! - per-module state ([`state`]): the `Unbuilt/Building/Fresh/Stale`
//!   machine and the watch bookkeeping
//! - per-module actors ([`actor`]): the exclusive section that serialises
//!   builds and invalidations for one module
//! - the [`Coordinator`] handle that requests, and the compile-everything
//!   pass of build-once mode, go through
//!
//! Different modules are handled by different actors, so their builds run
//! concurrently.

pub mod actor;
pub mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::build::Builder;
use crate::config::{BuildConfig, ConfigFile};
use crate::errors::BuildError;
use crate::logging::Diagnostics;
use crate::watch::WatchBackend;

pub use actor::{BuildStatus, ModuleActor, ModuleRequest};
pub use state::{ModuleRecord, ModuleSnapshot, ModuleState, WatchAction};

/// Capacity of each module's request queue.
const REQUEST_QUEUE: usize = 64;

/// Options shared by every module actor.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    /// Register a watch on each successful build's dependency set. Off in
    /// build-once mode, where nothing is ever rebuilt.
    pub watch: bool,
    /// Re-register watches when a rebuild reports a different dependency set.
    pub rewatch: bool,
    pub diag: Diagnostics,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            watch: true,
            rewatch: true,
            diag: Diagnostics::default(),
        }
    }
}

/// Cloneable handle to every module actor.
///
/// Modules are fixed at construction and live for as long as any handle
/// does.
#[derive(Debug, Clone)]
pub struct Coordinator {
    modules: Arc<BTreeMap<String, mpsc::Sender<ModuleRequest>>>,
}

impl Coordinator {
    /// Spawn one actor per module. Must be called inside a Tokio runtime.
    ///
    /// No module is built until something asks for it.
    pub fn new(
        modules: impl IntoIterator<Item = BuildConfig>,
        builder: Arc<dyn Builder>,
        watcher: Arc<dyn WatchBackend>,
        options: CoordinatorOptions,
    ) -> Self {
        let mut handles = BTreeMap::new();

        for config in modules {
            let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
            let name = config.name.clone();
            let actor = ModuleActor::new(
                config,
                Arc::clone(&builder),
                Arc::clone(&watcher),
                options,
                rx,
            );
            tokio::spawn(actor.run());
            handles.insert(name, tx);
        }

        info!(modules = handles.len(), "rebuild coordinator started");

        Self {
            modules: Arc::new(handles),
        }
    }

    pub fn from_config(
        cfg: &ConfigFile,
        builder: Arc<dyn Builder>,
        watcher: Arc<dyn WatchBackend>,
    ) -> Self {
        let options = CoordinatorOptions {
            watch: !cfg.once,
            rewatch: cfg.rewatch,
            diag: Diagnostics::new(cfg.debug),
        };
        Self::new(cfg.modules.values().cloned(), builder, watcher, options)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Make sure `name` is fresh, building it if it is `Unbuilt` or `Stale`.
    ///
    /// Concurrent callers for the same module share a single build and all
    /// observe its outcome.
    pub async fn ensure_fresh(&self, name: &str) -> Result<BuildStatus, BuildError> {
        let sender = self
            .modules
            .get(name)
            .ok_or_else(|| BuildError::UnknownModule(name.to_string()))?;

        let (reply, rx) = oneshot::channel();
        sender
            .send(ModuleRequest::Ensure { reply })
            .await
            .map_err(|_| actor_gone(name))?;

        rx.await.map_err(|_| actor_gone(name))?
    }

    /// Current state of a module, or `None` if it is not configured.
    pub async fn snapshot(&self, name: &str) -> Option<ModuleSnapshot> {
        let sender = self.modules.get(name)?;
        let (reply, rx) = oneshot::channel();
        sender.send(ModuleRequest::Snapshot { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Build every configured module, one after another in name order.
    ///
    /// Builds are not fanned out: the pass stops at the first failure and
    /// returns it, so modules after the failing one are never started.
    pub async fn compile_all(&self) -> Result<(), BuildError> {
        if self.modules.is_empty() {
            return Err(BuildError::NoModules);
        }

        for name in self.modules.keys() {
            if let Err(err) = self.ensure_fresh(name).await {
                warn!(module = %name, error = %err, "failed to compile modules");
                return Err(err);
            }
        }

        info!(modules = self.modules.len(), "compiled all modules");
        Ok(())
    }
}

fn actor_gone(name: &str) -> BuildError {
    BuildError::Aborted {
        module: name.to_string(),
        detail: "module actor stopped".to_string(),
    }
}
