//! Progress display for update checks and pipeline runs
//!
//! The pipeline bar counts finished processes across all stages and names
//! the running stage with its own tally, e.g. `MSFragger 2/5`.

use crate::error::PipelineError;
use crate::pipeline::{PipelineReport, QueuedStage};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})";

/// Processes finished within the running stage
#[derive(Debug, Clone, PartialEq, Eq)]
struct StageTally {
    name: String,
    done: usize,
    total: usize,
}

impl StageTally {
    fn message(&self) -> String {
        format!("{} {}/{}", self.name, self.done, self.total)
    }
}

/// Progress reporter, silent when disabled (quiet or JSON output)
pub struct Progress {
    enabled: bool,
    /// Track state without drawing
    hidden: bool,
    bar: Option<ProgressBar>,
    stage: Option<StageTally>,
    failed: usize,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            hidden: false,
            bar: None,
            stage: None,
            failed: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new(true)
        }
    }

    fn new_bar(&self, len: Option<u64>) -> ProgressBar {
        if self.hidden {
            return ProgressBar::with_draw_target(len, ProgressDrawTarget::hidden());
        }
        match len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        }
    }

    /// Spinner while update sources are queried
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let spinner = self.new_bar(None);
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid template"),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(spinner);
    }

    /// Bar over every queued process of the pipeline
    pub fn begin_pipeline(&mut self, stages: &[QueuedStage]) {
        self.failed = 0;
        self.stage = None;
        if !self.enabled {
            return;
        }

        let total: usize = stages.iter().map(|s| s.descriptors.len()).sum();
        let bar = self.new_bar(Some(total as u64));
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .expect("Invalid template")
                .progress_chars("█▓▒░"),
        );
        bar.set_message(format!("{} stage(s)", stages.len()));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    /// Name the stage whose processes run next
    pub fn begin_stage(&mut self, stage: &QueuedStage) {
        let tally = StageTally {
            name: stage.name.clone(),
            done: 0,
            total: stage.descriptors.len(),
        };
        if let Some(bar) = &self.bar {
            bar.set_message(tally.message());
        }
        self.stage = Some(tally);
    }

    /// Count one finished process of the running stage
    pub fn process_finished(&mut self, succeeded: bool) {
        if !succeeded {
            self.failed += 1;
        }
        let Some(tally) = self.stage.as_mut() else {
            return;
        };
        tally.done += 1;
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(tally.message());
        }
    }

    /// Close the bar with a summary of the run
    pub fn finish_pipeline(&mut self, result: Result<&PipelineReport, &PipelineError>) {
        let Some(bar) = self.bar.take() else {
            return;
        };
        match result {
            Ok(report) => bar.finish_with_message(format!(
                "{} process(es) finished",
                report.process_count()
            )),
            Err(PipelineError::Cancelled) => bar.abandon_with_message("cancelled"),
            Err(_) => {
                let stage = self.stage.as_ref().map(|t| t.name.as_str()).unwrap_or("pipeline");
                bar.abandon_with_message(format!("{} failed ({} process(es))", stage, self.failed));
            }
        }
    }

    /// Remove the spinner or bar from the terminal
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    #[cfg(test)]
    fn message(&self) -> Option<String> {
        self.bar.as_ref().map(|b| b.message())
    }

    #[cfg(test)]
    fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(|b| b.position())
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}
