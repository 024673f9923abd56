//! Pipeline assembly and execution
//!
//! This module provides:
//! - Configuration gating: only configured stages can be queued
//! - Stage-by-stage execution in declared order
//! - A bounded worker pool per stage, sized by the stage's parallelism hint
//! - Cooperative cancellation checked before each process starts
//!
//! A process exiting with an unexpected code stops every process that has
//! not started yet. Processes already running are left to finish.

use crate::domain::ProcessDescriptor;
use crate::error::PipelineError;
use crate::progress::Progress;
use crate::stage::CommandBuilder;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Captured result of one external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Both streams, stdout first
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Trait for launching external processes
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the process to completion and capture its output
    async fn run(&self, descriptor: &ProcessDescriptor) -> std::io::Result<ProcessOutput>;
}

/// Runner that starts real operating-system processes
#[derive(Debug, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, descriptor: &ProcessDescriptor) -> std::io::Result<ProcessOutput> {
        let output = Command::new(descriptor.executable())
            .args(descriptor.arguments())
            .current_dir(descriptor.working_directory())
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// One finished process
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub command: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// All processes of one stage, in queue order
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub processes: Vec<ProcessReport>,
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn process_count(&self) -> usize {
        self.stages.iter().map(|s| s.processes.len()).sum()
    }
}

/// A stage's queue as captured when it was added
#[derive(Debug, Clone)]
pub struct QueuedStage {
    pub name: String,
    pub descriptors: Vec<ProcessDescriptor>,
    pub parallelism: usize,
}

enum Outcome {
    Finished {
        index: usize,
        output: ProcessOutput,
        elapsed_ms: u64,
    },
    SpawnFailed {
        index: usize,
        message: String,
    },
}

impl Outcome {
    fn succeeded(&self, descriptor: &ProcessDescriptor) -> bool {
        matches!(
            self,
            Outcome::Finished { output, .. } if output.exit_code == Some(descriptor.expected_exit_code())
        )
    }
}

/// Ordered run queue of configured stages
#[derive(Debug, Default)]
pub struct PipelineAssembler {
    stages: Vec<QueuedStage>,
    cancel: CancellationToken,
}

impl PipelineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an external token to request cancellation
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Queue a stage; fails unless its configure succeeded
    pub fn add(&mut self, stage: &dyn CommandBuilder) -> Result<(), PipelineError> {
        let descriptors = stage
            .descriptors()
            .map_err(|_| PipelineError::NotConfigured {
                stage: stage.name().to_string(),
            })?
            .to_vec();
        self.stages.push(QueuedStage {
            name: stage.name().to_string(),
            descriptors,
            parallelism: stage.parallelism().max(1),
        });
        Ok(())
    }

    pub fn stages(&self) -> &[QueuedStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn process_count(&self) -> usize {
        self.stages.iter().map(|s| s.descriptors.len()).sum()
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(
        &self,
        runner: Arc<dyn ProcessRunner>,
        progress: &mut Progress,
    ) -> Result<PipelineReport, PipelineError> {
        progress.begin_pipeline(&self.stages);
        let result = self.run_stages(runner, progress).await;
        progress.finish_pipeline(result.as_ref());
        result
    }

    async fn run_stages(
        &self,
        runner: Arc<dyn ProcessRunner>,
        progress: &mut Progress,
    ) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            progress.begin_stage(stage);
            reports.push(self.run_stage(stage, runner.clone(), progress).await?);
        }

        Ok(PipelineReport {
            stages: reports,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Start processes in queue order, at most `parallelism` at a time
    async fn run_stage(
        &self,
        stage: &QueuedStage,
        runner: Arc<dyn ProcessRunner>,
        progress: &mut Progress,
    ) -> Result<StageReport, PipelineError> {
        let permits = Arc::new(Semaphore::new(stage.parallelism));
        let abort = self.cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut pending = stage.descriptors.iter().cloned().enumerate().peekable();
        let mut outcomes = StageOutcomes::new(stage);

        loop {
            tokio::select! {
                biased;
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let outcome = joined.unwrap_or_else(|e| Outcome::SpawnFailed {
                        index: usize::MAX,
                        message: format!("task failed: {}", e),
                    });
                    if !outcomes.record(stage, outcome, progress) {
                        abort.cancel();
                    }
                }
                permit = permits.clone().acquire_owned(),
                    if pending.peek().is_some() && !abort.is_cancelled() =>
                {
                    let Ok(permit) = permit else { break };
                    if abort.is_cancelled() {
                        continue;
                    }
                    let Some((index, descriptor)) = pending.next() else { continue };
                    let runner = runner.clone();
                    let abort = abort.clone();
                    log::info!("{}: {}", stage.name, descriptor.command_line());
                    tasks.spawn(async move {
                        let start = Instant::now();
                        let outcome = match runner.run(&descriptor).await {
                            Ok(output) => Outcome::Finished {
                                index,
                                output,
                                elapsed_ms: start.elapsed().as_millis() as u64,
                            },
                            Err(e) => Outcome::SpawnFailed {
                                index,
                                message: e.to_string(),
                            },
                        };
                        // stop queued siblings before this permit is released
                        if !outcome.succeeded(&descriptor) {
                            abort.cancel();
                        }
                        drop(permit);
                        outcome
                    });
                }
                else => break,
            }
        }

        if let Some(e) = outcomes.failure {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        Ok(StageReport {
            name: stage.name.clone(),
            processes: outcomes.finished.into_iter().flatten().collect(),
        })
    }
}

/// Finished processes of one stage and its first failure
struct StageOutcomes {
    finished: Vec<Option<ProcessReport>>,
    failure: Option<PipelineError>,
}

impl StageOutcomes {
    fn new(stage: &QueuedStage) -> Self {
        Self {
            finished: vec![None; stage.descriptors.len()],
            failure: None,
        }
    }

    /// Record one outcome; false when it failed
    fn record(&mut self, stage: &QueuedStage, outcome: Outcome, progress: &mut Progress) -> bool {
        match outcome {
            Outcome::Finished {
                index,
                output,
                elapsed_ms,
            } => {
                let descriptor = &stage.descriptors[index];
                let command = descriptor.command_line();
                let succeeded = output.exit_code == Some(descriptor.expected_exit_code());
                progress.process_finished(succeeded);
                if !succeeded {
                    log::warn!("{}: process failed: {}", stage.name, command);
                    self.failure.get_or_insert(PipelineError::StageFailed {
                        stage: stage.name.clone(),
                        command: command.clone(),
                        exit_code: output.exit_code,
                        output: output.combined(),
                    });
                }
                self.finished[index] = Some(ProcessReport {
                    command,
                    exit_code: output.exit_code,
                    duration_ms: elapsed_ms,
                });
                succeeded
            }
            Outcome::SpawnFailed { index, message } => {
                progress.process_finished(false);
                self.failure.get_or_insert(PipelineError::Spawn {
                    stage: stage.name.clone(),
                    command: stage
                        .descriptors
                        .get(index)
                        .map(ProcessDescriptor::command_line)
                        .unwrap_or_default(),
                    message,
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::stage::StageState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Stage with a fixed queue
    struct FixedStage {
        name: &'static str,
        descriptors: Option<Vec<ProcessDescriptor>>,
        parallelism: usize,
    }

    impl FixedStage {
        fn configured(name: &'static str, programs: &[&str], parallelism: usize) -> Self {
            Self {
                name,
                descriptors: Some(
                    programs
                        .iter()
                        .map(|p| ProcessDescriptor::new(*p, vec![], "."))
                        .collect(),
                ),
                parallelism,
            }
        }
    }

    impl CommandBuilder for FixedStage {
        fn name(&self) -> &str {
            self.name
        }

        fn state(&self) -> StageState {
            if self.descriptors.is_some() {
                StageState::Configured
            } else {
                StageState::Unconfigured
            }
        }

        fn descriptors(&self) -> Result<&[ProcessDescriptor], StageError> {
            self.descriptors
                .as_deref()
                .ok_or_else(|| StageError::NotConfigured {
                    stage: self.name.to_string(),
                })
        }

        fn parallelism(&self) -> usize {
            self.parallelism
        }
    }

    /// Runner that records launches; programs named "fail*" exit with 1
    #[derive(Default)]
    struct MockRunner {
        launched: Mutex<Vec<String>>,
        running: AtomicUsize,
        peak: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ProcessRunner for MockRunner {
        async fn run(&self, descriptor: &ProcessDescriptor) -> std::io::Result<ProcessOutput> {
            let program = descriptor.executable().display().to_string();
            self.launched.lock().unwrap().push(program.clone());
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);

            if program.starts_with("missing") {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found"));
            }
            let failed = program.starts_with("fail");
            Ok(ProcessOutput {
                exit_code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed { "boom".to_string() } else { String::new() },
            })
        }
    }

    impl MockRunner {
        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_add_requires_configured_stage() {
        let mut pipeline = PipelineAssembler::new();
        let stage = FixedStage {
            name: "MSFragger",
            descriptors: None,
            parallelism: 1,
        };
        let err = pipeline.add(&stage).unwrap_err();
        assert!(matches!(err, PipelineError::NotConfigured { ref stage } if stage == "MSFragger"));
        assert!(pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_runs_stages_in_order() {
        let mut pipeline = PipelineAssembler::new();
        pipeline.add(&FixedStage::configured("first", &["a"], 1)).unwrap();
        pipeline.add(&FixedStage::configured("second", &["b", "c"], 1)).unwrap();
        assert_eq!(pipeline.process_count(), 3);

        let runner = Arc::new(MockRunner::default());
        let report = pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap();
        assert_eq!(runner.launched(), vec!["a", "b", "c"]);
        assert_eq!(report.process_count(), 3);
        assert_eq!(report.stages[1].name, "second");
    }

    #[tokio::test]
    async fn test_failure_stops_later_work() {
        let mut pipeline = PipelineAssembler::new();
        pipeline
            .add(&FixedStage::configured("search", &["ok", "fail", "never"], 1))
            .unwrap();
        pipeline.add(&FixedStage::configured("validate", &["later"], 1)).unwrap();

        let runner = Arc::new(MockRunner::default());
        let err = pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap_err();
        match err {
            PipelineError::StageFailed {
                stage,
                exit_code,
                output,
                ..
            } => {
                assert_eq!(stage, "search");
                assert_eq!(exit_code, Some(1));
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(runner.launched(), vec!["ok", "fail"]);
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let mut pipeline = PipelineAssembler::new();
        pipeline
            .add(&FixedStage::configured("pp", &["a", "b", "c", "d", "e", "f"], 2))
            .unwrap();
        let runner = Arc::new(MockRunner {
            delay: Some(Duration::from_millis(20)),
            ..MockRunner::default()
        });
        pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap();
        assert_eq!(runner.launched().len(), 6);
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_started_siblings_finish_after_failure() {
        let mut pipeline = PipelineAssembler::new();
        pipeline
            .add(&FixedStage::configured("pp", &["fail", "slow", "queued"], 2))
            .unwrap();
        let runner = Arc::new(MockRunner {
            delay: Some(Duration::from_millis(50)),
            ..MockRunner::default()
        });
        let err = pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { .. }));
        let launched = runner.launched();
        assert!(launched.contains(&"slow".to_string()));
        assert!(!launched.contains(&"queued".to_string()));
    }

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("p{:02}", i)).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_serial_stage_keeps_queue_order() {
        let names = numbered(32);
        let programs: Vec<&str> = names.iter().map(String::as_str).collect();
        for _ in 0..20 {
            let mut pipeline = PipelineAssembler::new();
            pipeline.add(&FixedStage::configured("search", &programs, 1)).unwrap();
            let runner = Arc::new(MockRunner::default());
            pipeline
                .run(runner.clone(), &mut Progress::disabled())
                .await
                .unwrap();
            assert_eq!(runner.launched(), names);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_serial_failure_skips_rest_of_queue() {
        let mut programs = vec!["ok", "fail"];
        let names = numbered(16);
        programs.extend(names.iter().map(String::as_str));
        let mut pipeline = PipelineAssembler::new();
        pipeline.add(&FixedStage::configured("search", &programs, 1)).unwrap();

        let runner = Arc::new(MockRunner::default());
        let err = pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { .. }));
        assert_eq!(runner.launched(), vec!["ok", "fail"]);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut pipeline = PipelineAssembler::new();
        pipeline
            .add(&FixedStage::configured("search", &["missing-java"], 1))
            .unwrap();
        let err = pipeline
            .run(Arc::new(MockRunner::default()), &mut Progress::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        let mut pipeline = PipelineAssembler::new().with_cancellation(cancel.clone());
        pipeline.add(&FixedStage::configured("search", &["a"], 1)).unwrap();
        cancel.cancel();

        let runner = Arc::new(MockRunner::default());
        let err = pipeline
            .run(runner.clone(), &mut Progress::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(runner.launched().is_empty());
    }

    #[test]
    fn test_combined_output() {
        let out = ProcessOutput {
            exit_code: Some(0),
            stdout: "a\n".to_string(),
            stderr: "b\n".to_string(),
        };
        assert_eq!(out.combined(), "a\nb");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner() {
        let ok = ProcessDescriptor::new(
            "sh",
            vec!["-c".to_string(), "echo hello; echo warn 1>&2".to_string()],
            ".",
        );
        let output = SystemProcessRunner::new().run(&ok).await.unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "warn");

        let failing = ProcessDescriptor::new("sh", vec!["-c".to_string(), "exit 3".to_string()], ".");
        let output = SystemProcessRunner::new().run(&failing).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
    }
}
