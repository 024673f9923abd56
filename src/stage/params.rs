//! `key = value` parameter files
//!
//! A stage's parameter files are written together: each file goes to a
//! temporary sibling first and all of them are renamed into place only after
//! every write succeeded. If a rename fails, files already moved into place
//! get their previous contents back, or are removed when they did not exist.

use crate::error::StageError;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered `key = value` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamFile {
    entries: Vec<(String, String)>,
}

impl ParamFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing an earlier one with the same key in place
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{} = {}\n", k, v))
            .collect()
    }
}

/// Write every file or none of them
pub fn write_all(files: &[(PathBuf, ParamFile)]) -> Result<(), StageError> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(files.len());

    for (path, file) in files {
        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, file.render()) {
            discard(&staged);
            let _ = fs::remove_file(&tmp);
            return Err(StageError::write_failure(path, e));
        }
        staged.push((tmp, path.as_path()));
    }

    let previous: Vec<Option<Vec<u8>>> = staged
        .iter()
        .map(|(_, path)| fs::read(path).ok())
        .collect();
    for (idx, (tmp, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            discard(&staged[idx..]);
            restore(&staged[..idx], &previous[..idx]);
            return Err(StageError::write_failure(*path, e));
        }
    }
    Ok(())
}

fn restore(renamed: &[(PathBuf, &Path)], previous: &[Option<Vec<u8>>]) {
    for ((_, path), old) in renamed.iter().zip(previous) {
        let restored = match old {
            Some(content) => fs::write(path, content),
            None => fs::remove_file(path),
        };
        if let Err(e) = restored {
            log::warn!("cannot roll back {}: {}", path.display(), e);
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}
