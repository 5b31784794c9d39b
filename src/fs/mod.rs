// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Abstract filesystem interface.
///
/// Errors keep the underlying `std::io::Error` reachable through
/// `anyhow::Error::downcast_ref`, so callers can tell "not found" apart.
pub trait FileSystem: Send + Sync + Debug {
    /// `stat` the path.
    fn entry_kind(&self, path: &Path) -> Result<EntryKind>;
    /// Copy `from` to `to` verbatim, creating `to`'s parent directories.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn entry_kind(&self, path: &Path) -> Result<EntryKind> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))
    }
}
