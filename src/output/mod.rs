//! Output formatting for update checks, changelogs and pipeline runs
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing
//! - The release download preamble printed with the changelog

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::PROGRAM_TITLE;
use crate::domain::{UpdatePackage, VersionAdvisory};
use crate::pipeline::{PipelineReport, QueuedStage};
use crate::version::ChangelogEntry;
use serde::Serialize;
use std::io::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Minimal output
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Detailed output with additional information
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output format (text, json)
    pub format: OutputFormat,
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            color: true,
        }
    }
}

impl OutputConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            color: true,
        }
    }
}

/// One checked component and the notice built for it
#[derive(Debug, Clone, Serialize)]
pub struct CheckedComponent {
    pub advisory: VersionAdvisory,
    /// Rendered notice; `None` when there is nothing to tell
    pub message: Option<String>,
}

/// Everything `check-updates` found
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCheckReport {
    pub components: Vec<CheckedComponent>,
    /// Add-on packages that apply to the running version
    pub packages: Vec<UpdatePackage>,
}

impl UpdateCheckReport {
    /// Whether any component has a newer version
    pub fn has_updates(&self) -> bool {
        self.components.iter().any(|c| c.advisory.has_update())
    }
}

/// Download links of one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDownloads {
    pub version: String,
    /// Archive without a bundled Java runtime
    pub zip_url: String,
    /// Archive with a bundled Java runtime
    pub jre_zip_url: String,
}

impl ReleaseDownloads {
    /// Build the archive links from a download page url
    ///
    /// A trailing `/`, then `latest`, then `/` are removed from the url before
    /// `download/<version>/<file>` is appended.
    pub fn new(version: &str, download_url: &str) -> Self {
        let base = download_url.strip_suffix('/').unwrap_or(download_url);
        let base = base.strip_suffix("latest").unwrap_or(base);
        let base = base.strip_suffix('/').unwrap_or(base);

        let url = |file: String| format!("{}/download/{}/{}", base, version, file);
        Self {
            version: version.to_string(),
            zip_url: url(Self::zip_name(version)),
            jre_zip_url: url(Self::jre_zip_name(version)),
        }
    }

    pub fn zip_name(version: &str) -> String {
        format!("{}-{}.zip", PROGRAM_TITLE, version)
    }

    pub fn jre_zip_name(version: &str) -> String {
        format!("{}-jre-{}.zip", PROGRAM_TITLE, version)
    }
}

/// Changelog entries to print, newest first
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangelogView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseDownloads>,
    pub entries: Vec<ChangelogEntry>,
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format the result of an update check
    fn format_updates(
        &self,
        report: &UpdateCheckReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;

    /// Format changelog entries
    fn format_changelog(&self, view: &ChangelogView, writer: &mut dyn Write)
        -> std::io::Result<()>;

    /// Format the commands a dry run would execute
    fn format_plan(&self, stages: &[QueuedStage], writer: &mut dyn Write) -> std::io::Result<()>;

    /// Format a finished pipeline run
    fn format_report(&self, report: &PipelineReport, writer: &mut dyn Write)
        -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}
