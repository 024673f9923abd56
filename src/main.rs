//! fragrun - proteomics pipeline runner CLI tool
//!
//! Subcommands:
//! - check-updates: compare the running application, and optionally an
//!   MSFragger jar, against the published versions
//! - changelog: print what changed in each release
//! - run: configure the search stages and run them

use clap::Parser;
use fragrun::cli::{CheckUpdatesArgs, ChangelogArgs, CliArgs, Command, RunArgs};
use fragrun::config::RunConfig;
use fragrun::error::PipelineError;
use fragrun::orchestrator::Orchestrator;
use fragrun::output::{create_formatter, OutputConfig, OutputFormatter};
use fragrun::pipeline::SystemProcessRunner;
use fragrun::progress::Progress;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exit code for a pipeline process that failed
const STAGE_FAILED_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the logger; `RUST_LOG` overrides the level chosen here
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    if args.verbose {
        eprintln!("fragrun v{}", env!("CARGO_PKG_VERSION"));
    }

    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));
    let show_progress = !args.quiet && !args.json;

    match &args.command {
        Command::CheckUpdates(check) => {
            check_updates(check, formatter.as_ref(), show_progress).await
        }
        Command::Changelog(changelog) => print_changelog(changelog, formatter.as_ref()),
        Command::Run(run_args) => run_pipeline(run_args, &args, formatter.as_ref()).await,
    }
}

async fn check_updates(
    args: &CheckUpdatesArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> anyhow::Result<ExitCode> {
    let orchestrator = Orchestrator::new(args.offline)?;

    let mut progress = Progress::new(show_progress);
    progress.spinner("Checking for updates...");
    let report = orchestrator.check_updates(args).await;
    progress.finish_and_clear();

    let mut stdout = io::stdout().lock();
    formatter.format_updates(&report, &mut stdout)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn print_changelog(args: &ChangelogArgs, formatter: &dyn OutputFormatter) -> anyhow::Result<ExitCode> {
    let orchestrator = Orchestrator::new(true)?;
    let view = orchestrator.changelog_view(args)?;

    let mut stdout = io::stdout().lock();
    formatter.format_changelog(&view, &mut stdout)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

async fn run_pipeline(
    run_args: &RunArgs,
    args: &CliArgs,
    formatter: &dyn OutputFormatter,
) -> anyhow::Result<ExitCode> {
    let config = RunConfig::from_args(run_args)?;

    // Start the update check before any stage is configured
    let check_cancel = CancellationToken::new();
    let update_check = if config.update_check && !args.quiet {
        match Orchestrator::new(false) {
            Ok(orchestrator) => {
                let (sources, rx, handle) = orchestrator.spawn_app_check(check_cancel.clone());
                Some((orchestrator, sources, rx, handle))
            }
            Err(e) => {
                log::warn!("update check disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let pipeline_cancel = CancellationToken::new();
    {
        let cancel = pipeline_cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupted, stopping after running processes finish");
                cancel.cancel();
            }
        });
    }

    let assembler = Orchestrator::assemble(&config, pipeline_cancel)?;

    let exit_code = if config.dry_run || !config.work_dir.is_dir() {
        formatter.format_plan(assembler.stages(), &mut io::stdout().lock())?;
        ExitCode::SUCCESS
    } else {
        let mut progress = Progress::new(!args.quiet && !args.json);
        match assembler
            .run(Arc::new(SystemProcessRunner::new()), &mut progress)
            .await
        {
            Ok(report) => {
                formatter.format_report(&report, &mut io::stdout().lock())?;
                ExitCode::SUCCESS
            }
            Err(e) => {
                let PipelineError::StageFailed { output, .. } = &e else {
                    return Err(e.into());
                };
                eprintln!("Error: {}", e);
                if args.verbose && !output.is_empty() {
                    eprintln!("{}", output.trim_end());
                }
                ExitCode::from(STAGE_FAILED_EXIT)
            }
        }
    };
    io::stdout().flush()?;

    // Show the update notice only if the check already finished
    if let Some((orchestrator, sources, mut rx, handle)) = update_check {
        match rx.try_recv() {
            Ok(advisory) => {
                if let Some(message) = orchestrator.app_notice(&sources, advisory).message {
                    eprintln!();
                    eprintln!("{}", message);
                }
            }
            Err(_) => {
                log::debug!("update check still running, cancelling it");
                check_cancel.cancel();
            }
        }
        let _ = handle.await;
    }

    Ok(exit_code)
}
