// src/coordinator/state.rs

//! Per-module record and its transitions.
//!
//! Pure and synchronous: the module actor owns one [`ModuleRecord`] and is
//! the only code that mutates it, so every read-check-then-write transition
//! here is atomic with respect to concurrent requests for the module.

use std::path::PathBuf;

use crate::build::BuildOutcome;

/// Lifecycle of a module's artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Never built since process start.
    Unbuilt,
    /// A build is in flight; requests wait for its outcome.
    Building,
    /// Last build succeeded and no watched dependency changed since.
    Fresh,
    /// A dependency changed, or the last build failed.
    Stale,
}

/// What the actor should do about watching after a build finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    Keep,
    Register(Vec<PathBuf>),
}

/// Read-only view of a module for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSnapshot {
    pub state: ModuleState,
    pub watched: bool,
    pub watched_paths: Vec<PathBuf>,
    pub builds_started: u64,
    pub invalidations: u64,
    /// Requests currently suspended on the in-flight build.
    pub waiting: usize,
}

#[derive(Debug, Clone)]
pub struct ModuleRecord {
    state: ModuleState,
    /// Only ever goes false -> true.
    watched: bool,
    watched_paths: Vec<PathBuf>,
    builds_started: u64,
    invalidations: u64,
    /// An invalidation arrived while `Building`; applied once the build ends.
    invalidated_while_building: bool,
}

impl Default for ModuleRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRecord {
    pub fn new() -> Self {
        Self {
            state: ModuleState::Unbuilt,
            watched: false,
            watched_paths: Vec::new(),
            builds_started: 0,
            invalidations: 0,
            invalidated_while_building: false,
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn builds_started(&self) -> u64 {
        self.builds_started
    }

    pub fn is_watched(&self) -> bool {
        self.watched
    }

    /// `Unbuilt`/`Stale` -> `Building`.
    ///
    /// Returns `false` (and changes nothing) when a build is already in
    /// flight or the module is fresh.
    pub fn begin_build(&mut self) -> bool {
        match self.state {
            ModuleState::Unbuilt | ModuleState::Stale => {
                self.state = ModuleState::Building;
                self.builds_started += 1;
                self.invalidated_while_building = false;
                true
            }
            ModuleState::Building | ModuleState::Fresh => false,
        }
    }

    /// `Building` -> `Fresh` on success, `Building` -> `Stale` on failure.
    ///
    /// An invalidation that arrived during the build is applied afterwards,
    /// so a success started before the change still ends `Stale`.
    pub fn finish_build(&mut self, outcome: &BuildOutcome, rewatch: bool) -> WatchAction {
        if self.state != ModuleState::Building {
            return WatchAction::Keep;
        }

        match outcome {
            BuildOutcome::Success(deps) => {
                self.state = ModuleState::Fresh;
                if std::mem::take(&mut self.invalidated_while_building) {
                    self.invalidate();
                }

                if !self.watched || (rewatch && *deps != self.watched_paths) {
                    WatchAction::Register(deps.clone())
                } else {
                    WatchAction::Keep
                }
            }
            BuildOutcome::Failure(_) => {
                self.state = ModuleState::Stale;
                self.invalidated_while_building = false;
                WatchAction::Keep
            }
        }
    }

    /// A watch now covers `paths`.
    pub fn watch_registered(&mut self, paths: Vec<PathBuf>) {
        self.watched = true;
        self.watched_paths = paths;
    }

    /// Registration failed. The module still counts as watched; the previous
    /// path set (if any) is kept so a later rebuild can retry.
    pub fn watch_failed(&mut self) {
        self.watched = true;
    }

    /// Apply one dependency-change event.
    ///
    /// Returns `true` when this event flipped the module from `Fresh` to
    /// `Stale`. Repeated events on an already-stale module are no-ops.
    pub fn invalidate(&mut self) -> bool {
        match self.state {
            ModuleState::Fresh => {
                self.state = ModuleState::Stale;
                self.invalidations += 1;
                true
            }
            ModuleState::Building => {
                self.invalidated_while_building = true;
                false
            }
            ModuleState::Unbuilt | ModuleState::Stale => false,
        }
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            state: self.state,
            watched: self.watched,
            watched_paths: self.watched_paths.clone(),
            builds_started: self.builds_started,
            invalidations: self.invalidations,
            waiting: 0,
        }
    }
}
