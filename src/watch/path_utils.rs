// src/watch/path_utils.rs

//! Path identity helpers.
//!
//! Watch registration and event matching compare paths by equality, so every
//! dependency path is normalised before it is used.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against `base` and resolve `.` / `..` lexically.
///
/// Symlinks are not resolved; the file may not exist yet.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root.
                if !out.pop() && !joined.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Drop repeated paths, keeping the first occurrence.
pub fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
