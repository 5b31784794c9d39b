// src/watch/watcher.rs

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::diag;
use crate::errors::WatchError;
use crate::logging::Diagnostics;
use crate::watch::{ChangeKind, Invalidation, InvalidationSink, WatchBackend, WatchRegistration};

/// `notify`-backed watch primitive.
///
/// Each registration watches the parent directories of the dependency files
/// non-recursively and filters events down to the exact files, so editors
/// that save by rename-over-original still produce events.
#[derive(Debug, Clone, Default)]
pub struct NotifyWatchBackend {
    diag: Diagnostics,
}

impl NotifyWatchBackend {
    pub fn new(diag: Diagnostics) -> Self {
        Self { diag }
    }
}

impl WatchBackend for NotifyWatchBackend {
    fn watch(
        &self,
        paths: &[PathBuf],
        sink: InvalidationSink,
    ) -> Result<WatchRegistration, WatchError> {
        let targets = Arc::new(watch_targets(paths));
        let diag = self.diag;

        let callback_targets = Arc::clone(&targets);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward_event(&event, &callback_targets, &sink, diag),
                Err(err) => warn!("file watch error: {err}"),
            },
            Config::default(),
        )
        .map_err(|e| WatchError {
            path: paths.first().cloned().unwrap_or_default(),
            detail: e.to_string(),
        })?;

        for dir in parent_dirs(paths) {
            watcher
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|e| WatchError {
                    path: dir.clone(),
                    detail: e.to_string(),
                })?;
        }

        info!(files = paths.len(), "watching dependency set");
        diag!(diag, ?paths, "watch registered");

        Ok(WatchRegistration::new(paths.to_vec(), watcher))
    }
}

/// Map a `notify` event kind onto the three kinds the core cares about.
///
/// Access events and backend-specific noise are dropped.
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Removed),
        EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

fn forward_event(
    event: &Event,
    targets: &HashSet<PathBuf>,
    sink: &InvalidationSink,
    diag: Diagnostics,
) {
    let Some(kind) = change_kind(&event.kind) else {
        return;
    };

    for path in event.paths.iter().filter(|p| targets.contains(p.as_path())) {
        diag!(diag, path = ?path, ?kind, "dependency changed");
        // The receiver lives as long as its module; a closed channel only
        // happens during shutdown.
        let _ = sink.send(Invalidation {
            kind,
            path: path.clone(),
        });
    }
}

/// Every path an event for one of `paths` may be reported under: the path as
/// given plus its canonical form when that differs (symlinked trees).
fn watch_targets(paths: &[PathBuf]) -> HashSet<PathBuf> {
    let mut targets = HashSet::new();
    for path in paths {
        targets.insert(path.clone());
        if let Ok(canon) = path.canonicalize() {
            targets.insert(canon);
        }
    }
    targets
}

fn parent_dirs(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .map(|p| p.parent().unwrap_or(Path::new("/")).to_path_buf())
        .collect()
}
