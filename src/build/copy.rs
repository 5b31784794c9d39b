// src/build/copy.rs

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::build::{BuildOutcome, Builder};
use crate::config::BuildConfig;
use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::watch::normalize_path;

/// Plain-copy collaborator used when bundling is disabled.
///
/// Copies the module's source file byte-for-byte into `dest` (creating
/// directories as needed) and reports the source file as the only
/// dependency, so exactly that file gets watched.
#[derive(Debug, Clone)]
pub struct CopyBuilder {
    fs: Arc<dyn FileSystem>,
    working_dir: PathBuf,
}

impl CopyBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            working_dir: working_dir.into(),
        }
    }
}

impl Builder for CopyBuilder {
    fn build<'a>(
        &'a self,
        config: &'a BuildConfig,
    ) -> Pin<Box<dyn Future<Output = BuildOutcome> + Send + 'a>> {
        let fs = Arc::clone(&self.fs);
        let source = config.source.clone();
        let out = config.out.clone();
        let module = config.name.clone();
        let watched = normalize_path(&self.working_dir, &config.source);

        Box::pin(async move {
            let copied = tokio::task::spawn_blocking(move || fs.copy_file(&source, &out)).await;

            match copied {
                Ok(Ok(bytes)) => {
                    info!(module = %module, bytes, "copied source into dest");
                    BuildOutcome::Success(vec![watched])
                }
                Ok(Err(err)) => {
                    warn!(module = %module, error = %err, "error copying file");
                    BuildOutcome::Failure(BuildError::Io {
                        module,
                        detail: format!("{err:#}"),
                    })
                }
                Err(join_err) => BuildOutcome::Failure(BuildError::Aborted {
                    module,
                    detail: join_err.to_string(),
                }),
            }
        })
    }
}
