#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use buildgate::config::ConfigFile;
use buildgate::coordinator::{Coordinator, ModuleSnapshot};
use buildgate_test_utils::fake_builder::FakeBuilder;
use buildgate_test_utils::fake_watch::FakeWatchBackend;

#[allow(unused_imports)]
pub use buildgate_test_utils::builders;
#[allow(unused_imports)]
pub use buildgate_test_utils::{init_tracing, with_timeout};

/// Coordinator over `cfg`'s modules with fake collaborators.
pub fn fake_coordinator(
    cfg: &ConfigFile,
    builder: &FakeBuilder,
    watch: &FakeWatchBackend,
) -> Coordinator {
    Coordinator::from_config(cfg, Arc::new(builder.clone()), Arc::new(watch.clone()))
}

/// Poll a module's snapshot until `pred` holds.
pub async fn wait_for_snapshot<F>(coordinator: &Coordinator, module: &str, pred: F) -> ModuleSnapshot
where
    F: Fn(&ModuleSnapshot) -> bool,
{
    loop {
        let snapshot = coordinator
            .snapshot(module)
            .await
            .expect("module is configured");
        if pred(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
