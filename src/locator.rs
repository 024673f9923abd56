//! Tool file lookup
//!
//! Features:
//! - Searches each installation root and its immediate subdirectories
//! - Accepts absolute paths as-is when the file exists
//! - Collapses candidates that point at the same file
//! - Never guesses between several candidates

use crate::domain::ToolResolution;
use crate::error::LocateError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Resolves required tool files against a fixed set of roots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolLocator {
    roots: Vec<PathBuf>,
}

impl ToolLocator {
    /// Create a locator searching `roots` in order
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find every candidate for each name
    pub fn locate<S: AsRef<str>>(&self, names: &[S]) -> Vec<ToolResolution> {
        names
            .iter()
            .map(|name| ToolResolution::new(name.as_ref(), self.candidates(name.as_ref())))
            .collect()
    }

    /// Resolve each name to exactly one file
    ///
    /// Missing names are reported together before any ambiguity.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PathBuf>, LocateError> {
        let resolutions = self.locate(names);

        let missing: Vec<String> = resolutions
            .iter()
            .filter(|r| !r.found())
            .map(|r| r.logical_name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(LocateError::MissingDependency { names: missing });
        }

        resolutions
            .into_iter()
            .map(|r| match r.resolved_path() {
                Some(path) => Ok(path.clone()),
                None => Err(LocateError::AmbiguousDependency {
                    name: r.logical_name,
                    candidates: r.candidates,
                }),
            })
            .collect()
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return if direct.is_file() {
                vec![direct.to_path_buf()]
            } else {
                Vec::new()
            };
        }

        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for root in &self.roots {
            for dir in search_dirs(root) {
                let path = dir.join(name);
                if !path.is_file() {
                    continue;
                }
                let identity = path.canonicalize().unwrap_or_else(|_| path.clone());
                if seen.insert(identity) {
                    found.push(path);
                }
            }
        }
        found
    }
}

/// The root itself followed by its subdirectories in name order
fn search_dirs(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    subdirs.sort();

    let mut dirs = vec![root.to_path_buf()];
    dirs.extend(subdirs);
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_resolve_in_root_and_subdir() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jar"));
        touch(&dir.path().join("smile").join("b.jar"));

        let locator = ToolLocator::new(vec![dir.path().to_path_buf()]);
        let paths = locator.resolve(&["a.jar", "b.jar"]).unwrap();
        assert_eq!(paths[0], dir.path().join("a.jar"));
        assert_eq!(paths[1], dir.path().join("smile").join("b.jar"));
    }

    #[test]
    fn test_missing_names_all_reported() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jar"));

        let locator = ToolLocator::new(vec![dir.path().to_path_buf()]);
        let err = locator.resolve(&["a.jar", "b.jar", "c.jar"]).unwrap_err();
        assert_eq!(
            err,
            LocateError::MissingDependency {
                names: vec!["b.jar".to_string(), "c.jar".to_string()]
            }
        );
    }

    #[test]
    fn test_ambiguous_across_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(&first.path().join("diann"));
        touch(&second.path().join("v1").join("diann"));

        let locator =
            ToolLocator::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        match locator.resolve(&["diann"]).unwrap_err() {
            LocateError::AmbiguousDependency { name, candidates } => {
                assert_eq!(name, "diann");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_same_root_listed_twice_is_not_ambiguous() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jar"));
        let root = dir.path().to_path_buf();
        let locator = ToolLocator::new(vec![root.clone(), root.join(".")]);
        assert!(locator.resolve(&["a.jar"]).is_ok());
    }

    #[test]
    fn test_absolute_path() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("MSFragger-3.7.jar");
        touch(&jar);
        let name = jar.to_string_lossy().to_string();

        let locator = ToolLocator::default();
        assert_eq!(locator.resolve(&[name.as_str()]).unwrap(), vec![jar]);
        assert!(locator.resolve(&["/definitely/not/here.jar"]).is_err());
    }

    #[test]
    fn test_missing_root_is_ignored() {
        let locator = ToolLocator::new(vec![PathBuf::from("/no/such/root")]);
        let resolutions = locator.locate(&["a.jar"]);
        assert_eq!(resolutions.len(), 1);
        assert!(!resolutions[0].found());
    }
}
