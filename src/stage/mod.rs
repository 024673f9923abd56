//! Pipeline stages
//!
//! Each stage turns run parameters into ready-to-launch process descriptors:
//! 1. Resolve its tool files through the [`ToolLocator`]
//! 2. Write its parameter files unless running dry
//! 3. Queue one or more descriptors
//!
//! Nothing is spawned here; the [`crate::pipeline`] module runs the queue.

mod more_rescore;
mod msfragger;
pub mod params;
mod peptide_prophet;

pub use more_rescore::{MoreRescore, MoreRescoreParams};
pub use msfragger::{Msfragger, MsfraggerParams};
pub use params::ParamFile;
pub use peptide_prophet::{PeptideProphet, PeptideProphetParams};

use crate::domain::{ProcessDescriptor, ResourceLimits};
use crate::error::StageError;
use crate::locator::ToolLocator;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Configuration state of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageState {
    Unconfigured,
    Configuring,
    Configured,
    Failed,
}

/// Read side of a stage, used by the pipeline
pub trait CommandBuilder: Send + Sync {
    /// Stage name used in logs and errors
    fn name(&self) -> &str;

    /// Current configuration state
    fn state(&self) -> StageState;

    /// Queued descriptors; only available after a successful configure
    fn descriptors(&self) -> Result<&[ProcessDescriptor], StageError>;

    /// How many queued descriptors may run at once
    fn parallelism(&self) -> usize {
        1
    }
}

/// What every stage needs to build commands
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Where tool files are searched
    pub locator: ToolLocator,
    /// JVM launcher
    pub java: PathBuf,
    /// Memory and thread budget
    pub limits: ResourceLimits,
}

impl StageContext {
    pub fn new(locator: ToolLocator, java: impl Into<PathBuf>, limits: ResourceLimits) -> Self {
        Self {
            locator,
            java: java.into(),
            limits,
        }
    }

    /// `java [-Xmx<N>G]` prefix shared by JVM stages
    pub(crate) fn java_command(&self) -> (PathBuf, Vec<String>) {
        (self.java.clone(), self.limits.heap_flag().into_iter().collect())
    }
}

/// State shared by all stages
#[derive(Debug, Clone)]
pub(crate) struct StageBase {
    name: &'static str,
    work_dir: PathBuf,
    state: StageState,
    queue: Vec<ProcessDescriptor>,
}

impl StageBase {
    pub(crate) fn new(name: &'static str, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            name,
            work_dir: work_dir.into(),
            state: StageState::Unconfigured,
            queue: Vec::new(),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn state(&self) -> StageState {
        self.state
    }

    /// An absent working directory means preview mode: no files are written
    pub(crate) fn is_dry_run(&self) -> bool {
        !self.work_dir.is_dir()
    }

    /// Run one configure attempt, replacing whatever was queued before
    pub(crate) fn configure_with<F>(&mut self, build: F) -> Result<(), StageError>
    where
        F: FnOnce(&Self) -> Result<Vec<ProcessDescriptor>, StageError>,
    {
        self.state = StageState::Configuring;
        self.queue.clear();

        match build(self) {
            Ok(descriptors) => {
                log::debug!("{}: {} process(es) queued", self.name, descriptors.len());
                self.queue = descriptors;
                self.state = StageState::Configured;
                Ok(())
            }
            Err(e) => {
                log::warn!("{}: configure failed: {}", self.name, e);
                self.state = StageState::Failed;
                Err(e)
            }
        }
    }

    pub(crate) fn descriptors(&self) -> Result<&[ProcessDescriptor], StageError> {
        match self.state {
            StageState::Configured => Ok(&self.queue),
            _ => Err(StageError::NotConfigured {
                stage: self.name.to_string(),
            }),
        }
    }

    pub(crate) fn resolve<S: AsRef<str>>(
        &self,
        locator: &ToolLocator,
        names: &[S],
    ) -> Result<Vec<PathBuf>, StageError> {
        locator
            .resolve(names)
            .map_err(|e| StageError::from_locate(self.name, e))
    }

    /// Absolute form of a path inside the working directory
    pub(crate) fn absolute(&self, file_name: &str) -> Result<PathBuf, StageError> {
        absolute(&self.work_dir.join(file_name), self.name)
    }
}

/// Absolute path without touching the filesystem
pub(crate) fn absolute(path: &Path, stage: &str) -> Result<PathBuf, StageError> {
    std::path::absolute(path).map_err(|e| {
        StageError::invalid_input(stage, format!("cannot resolve {}: {}", path.display(), e))
    })
}

/// Join jar paths with the platform path separator
pub fn classpath(jars: &[PathBuf]) -> Result<String, StageError> {
    let joined = std::env::join_paths(jars)
        .map_err(|e| StageError::invalid_input("classpath", e.to_string()))?;
    joined
        .into_string()
        .map_err(|_| StageError::invalid_input("classpath", "classpath is not valid UTF-8"))
}

/// Render a path for a command line or parameter file
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classpath_uses_platform_separator() {
        let jars = vec![PathBuf::from("/t/a.jar"), PathBuf::from("/t/b.jar")];
        let cp = classpath(&jars).unwrap();
        let sep = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(cp, format!("/t/a.jar{}/t/b.jar", sep));
    }

    #[cfg(unix)]
    #[test]
    fn test_classpath_rejects_separator_in_path() {
        let jars = vec![PathBuf::from("/t/a:b.jar")];
        assert!(classpath(&jars).is_err());
    }

    #[test]
    fn test_base_not_configured() {
        let base = StageBase::new("Test", "/no/such/dir");
        assert_eq!(base.state(), StageState::Unconfigured);
        assert!(base.is_dry_run());
        assert!(matches!(
            base.descriptors(),
            Err(StageError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_base_failed_configure_clears_queue() {
        let mut base = StageBase::new("Test", "/no/such/dir");
        base.configure_with(|_| Ok(vec![ProcessDescriptor::new("a", vec![], "/")]))
            .unwrap();
        assert_eq!(base.descriptors().unwrap().len(), 1);

        let err = base
            .configure_with(|b| Err(StageError::invalid_input(b.name(), "bad")))
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
        assert_eq!(base.state(), StageState::Failed);
        assert!(base.descriptors().is_err());
    }

    #[test]
    fn test_java_command_heap_flag() {
        let ctx = StageContext::new(ToolLocator::default(), "java", ResourceLimits::new(8, 4));
        let (java, args) = ctx.java_command();
        assert_eq!(java, PathBuf::from("java"));
        assert_eq!(args, vec!["-Xmx8G"]);

        let ctx = StageContext::new(ToolLocator::default(), "java", ResourceLimits::new(0, 4));
        assert!(ctx.java_command().1.is_empty());
    }
}
