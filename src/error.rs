//! Application error types using thiserror
//!
//! Error hierarchy:
//! - SourceError: a version source could not produce a version
//! - LocateError: required tool files are missing or ambiguous
//! - StageError: a pipeline stage failed to configure
//! - PipelineError: the assembled pipeline failed to run
//! - ChangelogError: the changelog table is inconsistent
//! - ConfigError: invalid run configuration

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Version source errors
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Stage configuration errors
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Pipeline execution errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Changelog errors
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while fetching a version from one source
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Network or IO failure, or a document without the expected content
    #[error("version source '{source_name}' unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    /// The source answered but no version could be extracted
    #[error("version source '{source_name}' returned an unparsable version '{value}'")]
    Unparsable { source_name: String, value: String },

    /// The source did not answer in time
    #[error("timeout while querying version source '{source_name}'")]
    Timeout { source_name: String },
}

/// Errors raised while resolving tool files
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// One or more names resolved to no file
    #[error("missing dependencies: {}", .names.join(", "))]
    MissingDependency { names: Vec<String> },

    /// A name resolved to more than one file
    #[error("ambiguous dependency '{name}': {} candidates", .candidates.len())]
    AmbiguousDependency {
        name: String,
        candidates: Vec<PathBuf>,
    },
}

/// Errors raised by a stage's `configure`
#[derive(Error, Debug)]
pub enum StageError {
    /// Required files were not found
    #[error("{stage}: missing dependencies: {}", .names.join(", "))]
    MissingDependency { stage: String, names: Vec<String> },

    /// A required file matched several candidates
    #[error("{stage}: more than one candidate for '{name}': {}", display_paths(.candidates))]
    AmbiguousDependency {
        stage: String,
        name: String,
        candidates: Vec<PathBuf>,
    },

    /// A parameter file could not be written
    #[error("failed to write parameter file {path}: {source}")]
    ParameterWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stage's descriptors were requested before a successful configure
    #[error("stage '{stage}' is not configured")]
    NotConfigured { stage: String },

    /// Run parameters cannot be turned into a command
    #[error("{stage}: {message}")]
    InvalidInput { stage: String, message: String },
}

/// Errors raised while running the assembled pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage was added before it was configured
    #[error("stage '{stage}' cannot be queued: it is not configured")]
    NotConfigured { stage: String },

    /// A process exited with a non-zero code
    #[error("stage '{stage}' failed{}: {command}", exit_suffix(.exit_code))]
    StageFailed {
        stage: String,
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// A process could not be started
    #[error("stage '{stage}' could not start '{command}': {message}")]
    Spawn {
        stage: String,
        command: String,
        message: String,
    },

    /// Cancellation was requested
    #[error("pipeline cancelled")]
    Cancelled,
}

/// Errors in the changelog table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    /// The same version was registered twice
    #[error("changelog already contains version {version}")]
    DuplicateVersion { version: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value is out of range or malformed
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    /// The bundled manifest lacks a required key
    #[error("key '{key}' not found in the bundled manifest")]
    MissingBundleKey { key: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl SourceError {
    /// Creates a new Unavailable error
    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new Unparsable error
    pub fn unparsable(source_name: impl Into<String>, value: impl Into<String>) -> Self {
        SourceError::Unparsable {
            source_name: source_name.into(),
            value: value.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(source_name: impl Into<String>) -> Self {
        SourceError::Timeout {
            source_name: source_name.into(),
        }
    }
}

impl StageError {
    /// Attach the stage name to a locator failure
    pub fn from_locate(stage: impl Into<String>, err: LocateError) -> Self {
        let stage = stage.into();
        match err {
            LocateError::MissingDependency { names } => {
                StageError::MissingDependency { stage, names }
            }
            LocateError::AmbiguousDependency { name, candidates } => {
                StageError::AmbiguousDependency {
                    stage,
                    name,
                    candidates,
                }
            }
        }
    }

    /// Creates a new ParameterWriteFailure
    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::ParameterWriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Creates a new InvalidInput error
    pub fn invalid_input(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::InvalidInput {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a new InvalidValue error
    pub fn invalid_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }
}
