// src/coordinator/actor.rs

//! The per-module exclusive section.
//!
//! One Tokio task per module owns that module's [`ModuleRecord`]. Requests,
//! watch invalidations and build completions all arrive as messages and are
//! applied one at a time, so there is never more than one build in flight
//! per module and invalidations are applied in arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::build::{BuildOutcome, Builder, DependencySet};
use crate::config::BuildConfig;
use crate::coordinator::CoordinatorOptions;
use crate::coordinator::state::{ModuleRecord, ModuleSnapshot, ModuleState, WatchAction};
use crate::diag;
use crate::errors::BuildError;
use crate::logging::Diagnostics;
use crate::watch::{Invalidation, InvalidationSink, WatchBackend, WatchRegistration};

/// How a successful `ensure_fresh` was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The module was already fresh; nothing ran.
    AlreadyFresh,
    /// The request waited on a build that succeeded.
    Rebuilt,
}

pub type EnsureReply = oneshot::Sender<Result<BuildStatus, BuildError>>;

/// Messages from the coordinator handle to a module actor.
#[derive(Debug)]
pub enum ModuleRequest {
    Ensure { reply: EnsureReply },
    Snapshot { reply: oneshot::Sender<ModuleSnapshot> },
}

enum Step {
    BuildFinished(BuildOutcome),
    Invalidated(Invalidation),
    Request(ModuleRequest),
    Closed,
}

pub struct ModuleActor {
    config: Arc<BuildConfig>,
    record: ModuleRecord,
    builder: Arc<dyn Builder>,
    watcher: Arc<dyn WatchBackend>,
    watch: bool,
    rewatch: bool,
    diag: Diagnostics,
    requests: mpsc::Receiver<ModuleRequest>,
    invalidations: mpsc::UnboundedReceiver<Invalidation>,
    invalidation_tx: InvalidationSink,
    in_flight: Option<JoinHandle<BuildOutcome>>,
    waiters: Vec<EnsureReply>,
    registration: Option<WatchRegistration>,
}

impl ModuleActor {
    pub fn new(
        config: BuildConfig,
        builder: Arc<dyn Builder>,
        watcher: Arc<dyn WatchBackend>,
        options: CoordinatorOptions,
        requests: mpsc::Receiver<ModuleRequest>,
    ) -> Self {
        let (invalidation_tx, invalidations) = mpsc::unbounded_channel();
        Self {
            config: Arc::new(config),
            record: ModuleRecord::new(),
            builder,
            watcher,
            watch: options.watch,
            rewatch: options.rewatch,
            diag: options.diag,
            requests,
            invalidations,
            invalidation_tx,
            in_flight: None,
            waiters: Vec::new(),
            registration: None,
        }
    }

    /// Main loop; runs until the coordinator handle is dropped.
    ///
    /// Priority: a finished build first, then queued invalidations, then new
    /// requests. A request therefore always observes every invalidation that
    /// arrived before it.
    pub async fn run(mut self) {
        debug!(module = %self.config.name, "module actor started");

        loop {
            let step = tokio::select! {
                biased;
                outcome = join_build(&mut self.in_flight, &self.config.name), if self.in_flight.is_some() => {
                    Step::BuildFinished(outcome)
                }
                Some(invalidation) = self.invalidations.recv() => Step::Invalidated(invalidation),
                request = self.requests.recv() => match request {
                    Some(request) => Step::Request(request),
                    None => Step::Closed,
                },
            };

            match step {
                Step::BuildFinished(outcome) => self.finish_build(outcome),
                Step::Invalidated(invalidation) => self.invalidate(invalidation),
                Step::Request(request) => self.handle_request(request),
                Step::Closed => break,
            }
        }

        debug!(module = %self.config.name, "module actor finished (channel closed)");
    }

    fn handle_request(&mut self, request: ModuleRequest) {
        match request {
            ModuleRequest::Snapshot { reply } => {
                let snapshot = ModuleSnapshot {
                    waiting: self.waiters.len(),
                    ..self.record.snapshot()
                };
                let _ = reply.send(snapshot);
            }
            ModuleRequest::Ensure { reply } => match self.record.state() {
                ModuleState::Fresh => {
                    diag!(self.diag, module = %self.config.name, "already fresh");
                    let _ = reply.send(Ok(BuildStatus::AlreadyFresh));
                }
                ModuleState::Building => {
                    diag!(
                        self.diag,
                        module = %self.config.name,
                        waiting = self.waiters.len() + 1,
                        "build in flight; request waits for its outcome"
                    );
                    self.waiters.push(reply);
                }
                ModuleState::Unbuilt | ModuleState::Stale => {
                    self.start_build();
                    self.waiters.push(reply);
                }
            },
        }
    }

    fn start_build(&mut self) {
        if !self.record.begin_build() {
            return;
        }

        if self.record.builds_started() > 1 {
            info!(module = %self.config.name, "module is stale; rebuilding");
        } else {
            info!(module = %self.config.name, "first build of module");
        }

        let builder = Arc::clone(&self.builder);
        let config = Arc::clone(&self.config);
        self.in_flight = Some(tokio::spawn(async move { builder.build(&config).await }));
    }

    fn finish_build(&mut self, outcome: BuildOutcome) {
        self.in_flight = None;

        match self.record.finish_build(&outcome, self.rewatch) {
            WatchAction::Register(paths) if self.watch => self.register_watch(paths),
            WatchAction::Register(_) => {
                diag!(self.diag, module = %self.config.name, "watching disabled; not registering");
            }
            WatchAction::Keep => {}
        }

        let reply = match &outcome {
            BuildOutcome::Success(deps) => {
                info!(
                    module = %self.config.name,
                    deps = deps.len(),
                    state = ?self.record.state(),
                    "build succeeded"
                );
                Ok(BuildStatus::Rebuilt)
            }
            BuildOutcome::Failure(err) => {
                warn!(module = %self.config.name, error = %err, "build failed; module stays stale");
                Err(err.clone())
            }
        };

        for waiter in self.waiters.drain(..) {
            // A waiter whose request was dropped no longer needs the result.
            let _ = waiter.send(reply.clone());
        }
    }

    /// Failure here never fails the request that triggered the build.
    fn register_watch(&mut self, paths: DependencySet) {
        match self.watcher.watch(&paths, self.invalidation_tx.clone()) {
            Ok(registration) => {
                let first = !self.record.is_watched();
                info!(
                    module = %self.config.name,
                    files = paths.len(),
                    first,
                    "watching dependency set"
                );
                // Replacing the old registration stops watching the old set.
                self.registration = Some(registration);
                self.record.watch_registered(paths);
            }
            Err(err) => {
                warn!(module = %self.config.name, error = %err, "failed to register watch");
                self.record.watch_failed();
            }
        }
    }

    fn invalidate(&mut self, invalidation: Invalidation) {
        diag!(
            self.diag,
            module = %self.config.name,
            path = ?invalidation.path,
            kind = ?invalidation.kind,
            "invalidation received"
        );
        if self.record.invalidate() {
            info!(
                module = %self.config.name,
                path = ?invalidation.path,
                "dependency changed; module is stale"
            );
        }
    }
}

async fn join_build(slot: &mut Option<JoinHandle<BuildOutcome>>, module: &str) -> BuildOutcome {
    match slot {
        Some(handle) => match handle.await {
            Ok(outcome) => outcome,
            Err(err) => BuildOutcome::Failure(BuildError::Aborted {
                module: module.to_string(),
                detail: err.to_string(),
            }),
        },
        None => std::future::pending().await,
    }
}
