// src/fs/mock.rs

use super::{EntryKind, FileSystem};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

fn not_found(path: &Path) -> anyhow::Error {
    anyhow::Error::new(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file: {:?}", path),
    ))
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            files.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }
        files.insert(path, MockEntry::File(content.into()));
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }
}

impl FileSystem for MockFileSystem {
    fn entry_kind(&self, path: &Path) -> Result<EntryKind> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(_)) => Ok(EntryKind::File),
            Some(MockEntry::Dir) => Ok(EntryKind::Dir),
            None => Err(not_found(path)),
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64> {
        let content = {
            let files = self.files.lock().unwrap();
            match files.get(from) {
                Some(MockEntry::File(content)) => content.clone(),
                Some(MockEntry::Dir) => return Err(anyhow!("Is a directory: {:?}", from)),
                None => return Err(not_found(from)),
            }
        };
        let len = content.len() as u64;
        self.add_file(to, content);
        Ok(len)
    }
}
