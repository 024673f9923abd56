//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of update checks and changelogs
//! - Structured dry-run plans and run reports

use crate::output::{ChangelogView, OutputFormatter, UpdateCheckReport, Verbosity};
use crate::pipeline::{PipelineReport, QueuedStage};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn write_json<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)?;
        Ok(())
    }
}

/// JSON representation of a dry-run plan
#[derive(Serialize)]
struct JsonPlan {
    dry_run: bool,
    stages: Vec<JsonPlannedStage>,
}

/// JSON representation of one queued stage
#[derive(Serialize)]
struct JsonPlannedStage {
    name: String,
    parallelism: usize,
    commands: Vec<String>,
    /// Full descriptors (only in verbose mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    processes: Vec<crate::domain::ProcessDescriptor>,
}

impl OutputFormatter for JsonFormatter {
    fn format_updates(
        &self,
        report: &UpdateCheckReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(report, writer)
    }

    fn format_changelog(
        &self,
        view: &ChangelogView,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(view, writer)
    }

    fn format_plan(&self, stages: &[QueuedStage], writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonPlan {
            dry_run: true,
            stages: stages
                .iter()
                .map(|stage| JsonPlannedStage {
                    name: stage.name.clone(),
                    parallelism: stage.parallelism,
                    commands: stage
                        .descriptors
                        .iter()
                        .map(|d| d.command_line())
                        .collect(),
                    processes: if self.verbosity == Verbosity::Verbose {
                        stage.descriptors.clone()
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
        };
        self.write_json(&output, writer)
    }

    fn format_report(
        &self,
        report: &PipelineReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(report, writer)
    }
}
