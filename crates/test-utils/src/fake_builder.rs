use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildgate::build::{BuildOutcome, Builder};
use buildgate::config::BuildConfig;
use buildgate::errors::BuildError;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct FakeBuilderState {
    /// One-shot outcomes, consumed before `standing`.
    queued: HashMap<String, VecDeque<BuildOutcome>>,
    /// Outcome returned whenever nothing is queued.
    standing: HashMap<String, BuildOutcome>,
    /// Module names in the order builds were started.
    calls: Vec<String>,
}

/// A fake builder that:
/// - records which modules were built
/// - returns scripted outcomes (default: success with no dependencies)
/// - optionally holds every build open until the test releases it
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    state: Arc<Mutex<FakeBuilderState>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds block until [`release`](Self::release) hands out a permit.
    pub fn gated() -> Self {
        Self {
            state: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Let `n` held builds finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every build of `module` produces `outcome` unless one is queued.
    pub fn always(&self, module: &str, outcome: BuildOutcome) {
        self.state
            .lock()
            .unwrap()
            .standing
            .insert(module.to_string(), outcome);
    }

    /// The next build of `module` produces `outcome`.
    pub fn then(&self, module: &str, outcome: BuildOutcome) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(module.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn succeed_with(&self, module: &str, deps: &[&str]) {
        self.always(
            module,
            BuildOutcome::Success(deps.iter().map(|d| PathBuf::from(*d)).collect()),
        );
    }

    pub fn fail(&self, module: &str, detail: &str) {
        self.always(module, BuildOutcome::Failure(failure(module, detail)));
    }

    pub fn calls(&self, module: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|m| m.as_str() == module)
            .count()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Poll until `module` has been started at least `n` times.
    pub async fn wait_for_calls(&self, module: &str, n: usize) {
        while self.calls(module) < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn next_outcome(&self, module: &str) -> BuildOutcome {
        let mut state = self.state.lock().unwrap();
        if let Some(outcome) = state.queued.get_mut(module).and_then(VecDeque::pop_front) {
            return outcome;
        }
        state
            .standing
            .get(module)
            .cloned()
            .unwrap_or(BuildOutcome::Success(Vec::new()))
    }
}

/// A `BuildError::Failed` for `module` with the given detail.
pub fn failure(module: &str, detail: &str) -> BuildError {
    BuildError::Failed {
        module: module.to_string(),
        status: "exit status: 1".to_string(),
        detail: detail.to_string(),
    }
}

impl Builder for FakeBuilder {
    fn build<'a>(
        &'a self,
        config: &'a BuildConfig,
    ) -> Pin<Box<dyn Future<Output = BuildOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.state.lock().unwrap().calls.push(config.name.clone());

            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            self.next_outcome(&config.name)
        })
    }
}
