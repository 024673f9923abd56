//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Update notices with the "up to date" summary per component
//! - The changelog in the markdown layout used for release pages
//! - Dry-run command listings and finished run summaries

use crate::output::{ChangelogView, OutputFormatter, ReleaseDownloads, UpdateCheckReport, Verbosity};
use crate::pipeline::{PipelineReport, QueuedStage};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn check_mark(&self) -> String {
        if self.color {
            "✓".green().to_string()
        } else {
            "✓".to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dimmed(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_release(&self, release: &ReleaseDownloads, writer: &mut dyn Write) -> std::io::Result<()> {
        let zip = ReleaseDownloads::zip_name(&release.version);
        let jre_zip = ReleaseDownloads::jre_zip_name(&release.version);
        writeln!(writer, "FragPipe v{}", release.version)?;
        writeln!(writer)?;
        writeln!(writer, "## Downloading")?;
        writeln!(
            writer,
            "- [{}]({}) does not include Java; Java 1.8+ is needed to run it.",
            zip, release.zip_url
        )?;
        writeln!(
            writer,
            "- [{}]({}) includes a Java runtime **for Windows only**.",
            jre_zip, release.jre_zip_url
        )?;
        writeln!(writer, "## Running")?;
        writeln!(writer, "- Unzip the file")?;
        writeln!(
            writer,
            "- The `bin` subdirectory holds a shell script for Linux and a bat file for Windows"
        )?;
        writeln!(writer)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_updates(
        &self,
        report: &UpdateCheckReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        for component in &report.components {
            let advisory = &component.advisory;
            if let Some(message) = &component.message {
                writeln!(writer, "{}", message)?;
                writeln!(writer)?;
                continue;
            }
            if self.verbosity == Verbosity::Quiet {
                continue;
            }
            match &advisory.local_version {
                Some(local) => writeln!(
                    writer,
                    "{} {} {} is up to date",
                    self.check_mark(),
                    advisory.subject,
                    local
                )?,
                None => writeln!(
                    writer,
                    "{}",
                    self.dimmed(&format!(
                        "{}: local version unknown, not checked",
                        advisory.subject
                    ))
                )?,
            }
        }

        if !report.packages.is_empty() && self.verbosity != Verbosity::Quiet {
            writeln!(writer)?;
            writeln!(writer, "{}", self.heading("Add-on packages:"))?;
            for package in &report.packages {
                writeln!(
                    writer,
                    " - {}: {}",
                    package.description_or_name(),
                    package.download_url
                )?;
            }
        }

        Ok(())
    }

    fn format_changelog(
        &self,
        view: &ChangelogView,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if let Some(release) = &view.release {
            self.write_release(release, writer)?;
        }

        writeln!(writer, "### Changelog:")?;
        for entry in &view.entries {
            writeln!(writer)?;
            writeln!(writer, "v{}:", entry.version)?;
            for note in &entry.notes {
                writeln!(writer, " - {}", note)?;
            }
        }
        Ok(())
    }

    fn format_plan(&self, stages: &[QueuedStage], writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            let total: usize = stages.iter().map(|s| s.descriptors.len()).sum();
            writeln!(
                writer,
                "{}",
                self.heading(&format!(
                    "Dry run: {} process(es) in {} stage(s)",
                    total,
                    stages.len()
                ))
            )?;
        }

        for stage in stages {
            if self.verbosity != Verbosity::Quiet {
                writeln!(writer)?;
                writeln!(writer, "[{}]", stage.name)?;
            }
            for descriptor in &stage.descriptors {
                writeln!(writer, "{}", descriptor.command_line())?;
                if self.verbosity == Verbosity::Verbose {
                    writeln!(
                        writer,
                        "{}",
                        self.dimmed(&format!(
                            "  in {}",
                            descriptor.working_directory().display()
                        ))
                    )?;
                }
            }
        }
        Ok(())
    }

    fn format_report(
        &self,
        report: &PipelineReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }

        for stage in &report.stages {
            writeln!(
                writer,
                "{} {}: {} process(es)",
                self.check_mark(),
                stage.name,
                stage.processes.len()
            )?;
            if self.verbosity == Verbosity::Verbose {
                for process in &stage.processes {
                    writeln!(
                        writer,
                        "{}",
                        self.dimmed(&format!(
                            "  {} ({} ms)",
                            process.command, process.duration_ms
                        ))
                    )?;
                }
            }
        }

        let elapsed = report.finished_at - report.started_at;
        writeln!(
            writer,
            "Finished {} process(es) in {}s",
            report.process_count(),
            elapsed.num_seconds()
        )?;
        Ok(())
    }
}
