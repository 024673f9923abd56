//! Tool resolution results

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of searching for one required file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResolution {
    /// Name the stage asked for
    pub logical_name: String,
    /// Every existing path that matched
    pub candidates: Vec<PathBuf>,
}

impl ToolResolution {
    /// Create a resolution from the matching candidates
    pub fn new(logical_name: impl Into<String>, candidates: Vec<PathBuf>) -> Self {
        Self {
            logical_name: logical_name.into(),
            candidates,
        }
    }

    /// Whether at least one file matched
    pub fn found(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Whether more than one file matched
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    /// The single resolved path, if unambiguous
    pub fn resolved_path(&self) -> Option<&PathBuf> {
        match self.candidates.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let r = ToolResolution::new("a.jar", vec![]);
        assert!(!r.found());
        assert!(r.resolved_path().is_none());
    }

    #[test]
    fn test_single_candidate() {
        let r = ToolResolution::new("a.jar", vec![PathBuf::from("/tools/a.jar")]);
        assert!(r.found());
        assert!(!r.is_ambiguous());
        assert_eq!(r.resolved_path(), Some(&PathBuf::from("/tools/a.jar")));
    }

    #[test]
    fn test_ambiguous() {
        let r = ToolResolution::new(
            "a.jar",
            vec![PathBuf::from("/x/a.jar"), PathBuf::from("/y/a.jar")],
        );
        assert!(r.found());
        assert!(r.is_ambiguous());
        assert!(r.resolved_path().is_none());
    }
}
