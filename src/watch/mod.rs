// src/watch/mod.rs

//! Filesystem watching for module dependency sets.
//!
//! This module only turns filesystem changes into per-module
//! [`Invalidation`] messages. It does not know about module state; the
//! coordinator's module actor is the only consumer of the messages.

pub mod path_utils;
pub mod watcher;

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::errors::WatchError;

pub use path_utils::{dedup_paths, normalize_path};
pub use watcher::{NotifyWatchBackend, change_kind};

/// Kind of change observed on a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Added,
    Removed,
}

/// One dependency-change event for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Per-module queue the watch adapter pushes invalidations onto.
///
/// Unbounded because `notify` delivers from its own thread and must never
/// block.
pub type InvalidationSink = mpsc::UnboundedSender<Invalidation>;

/// A live watch over one dependency set.
///
/// Dropping it stops the watch.
pub struct WatchRegistration {
    paths: Vec<PathBuf>,
    _guard: Box<dyn Any + Send>,
}

impl WatchRegistration {
    pub fn new(paths: Vec<PathBuf>, guard: impl Any + Send) -> Self {
        Self {
            paths,
            _guard: Box::new(guard),
        }
    }

    /// The dependency set this registration covers.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl fmt::Debug for WatchRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistration")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// The raw filesystem-watch primitive.
///
/// Production code uses [`NotifyWatchBackend`]; tests provide a fake that
/// records registrations and fires events on demand.
pub trait WatchBackend: Send + Sync + fmt::Debug {
    /// Observe every path in `paths`, pushing one [`Invalidation`] onto
    /// `sink` per change, rename or removal, for as long as the returned
    /// registration is alive.
    fn watch(
        &self,
        paths: &[PathBuf],
        sink: InvalidationSink,
    ) -> Result<WatchRegistration, WatchError>;
}
