use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use buildgate::errors::WatchError;
use buildgate::watch::{ChangeKind, Invalidation, InvalidationSink, WatchBackend, WatchRegistration};

#[derive(Debug)]
struct Registered {
    paths: Vec<PathBuf>,
    sink: InvalidationSink,
    /// Dead once the coordinator drops the registration.
    alive: Weak<()>,
}

#[derive(Debug, Default)]
struct FakeWatchState {
    registered: Vec<Registered>,
    fail: bool,
}

/// A fake watch backend that records every registration and lets tests
/// fire change events at the live ones.
#[derive(Debug, Clone, Default)]
pub struct FakeWatchBackend {
    state: Arc<Mutex<FakeWatchState>>,
}

impl FakeWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `watch` call fail.
    pub fn fail_registrations(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Path sets of every successful registration, in order.
    pub fn registrations(&self) -> Vec<Vec<PathBuf>> {
        self.state
            .lock()
            .unwrap()
            .registered
            .iter()
            .map(|r| r.paths.clone())
            .collect()
    }

    /// Number of registrations that have not been dropped.
    pub fn live_registrations(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .registered
            .iter()
            .filter(|r| r.alive.strong_count() > 0)
            .count()
    }

    /// Deliver a change event for `path` to every live registration that
    /// covers it. Returns how many registrations received it.
    pub fn fire(&self, path: impl AsRef<Path>, kind: ChangeKind) -> usize {
        let path = path.as_ref();
        let state = self.state.lock().unwrap();
        let mut delivered = 0;
        for reg in &state.registered {
            if reg.alive.strong_count() == 0 || !reg.paths.iter().any(|p| p == path) {
                continue;
            }
            let sent = reg.sink.send(Invalidation {
                kind,
                path: path.to_path_buf(),
            });
            if sent.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

impl WatchBackend for FakeWatchBackend {
    fn watch(
        &self,
        paths: &[PathBuf],
        sink: InvalidationSink,
    ) -> Result<WatchRegistration, WatchError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(WatchError {
                path: paths.first().cloned().unwrap_or_default(),
                detail: "fake watch failure".to_string(),
            });
        }

        let token = Arc::new(());
        state.registered.push(Registered {
            paths: paths.to_vec(),
            sink,
            alive: Arc::downgrade(&token),
        });
        Ok(WatchRegistration::new(paths.to_vec(), token))
    }
}
