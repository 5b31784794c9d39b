// src/build/mod.rs

//! Build invocation layer.
//!
//! The coordinator talks to a [`Builder`] instead of running the optimizer
//! directly. This makes it easy to swap in a fake builder in tests while
//! keeping the production implementations here:
//!
//! - [`OptimizerBuilder`] runs the external optimizer and parses the build
//!   report it prints into a dependency set.
//! - [`CopyBuilder`] is used when bundling is disabled: it copies the
//!   requested source file into `dest` and reports that single file.

pub mod copy;
pub mod optimizer;
pub mod report;

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{BuildConfig, ConfigFile};
use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::logging::Diagnostics;

pub use copy::CopyBuilder;
pub use optimizer::OptimizerBuilder;
pub use report::parse_build_report;

/// Normalised, absolute file paths a build reported as consumed, in report
/// order without duplicates.
pub type DependencySet = Vec<PathBuf>;

/// Result of one build attempt. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success(DependencySet),
    Failure(BuildError),
}

/// Trait abstracting how a module's artifact is produced.
///
/// Implementations may take arbitrary wall-clock time but must not block the
/// executor thread; the coordinator runs each build on its own task so other
/// modules keep building. A builder never touches module state.
pub trait Builder: Send + Sync + Debug {
    fn build<'a>(
        &'a self,
        config: &'a BuildConfig,
    ) -> Pin<Box<dyn Future<Output = BuildOutcome> + Send + 'a>>;
}

/// Pick the builder a configuration asks for.
///
/// Build-once mode always bundles; otherwise `build = false` selects the
/// plain-copy collaborator and the optimizer is never run.
pub fn builder_for_config(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    working_dir: impl Into<PathBuf>,
) -> Arc<dyn Builder> {
    let diag = Diagnostics::new(cfg.debug);
    if cfg.build || cfg.once {
        Arc::new(OptimizerBuilder::new(cfg.optimizer.clone(), working_dir, diag))
    } else {
        Arc::new(CopyBuilder::new(fs, working_dir))
    }
}
