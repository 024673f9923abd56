//! CLI argument parsing module for fragrun

use crate::domain::InputLcmsFile;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default options handed to `philosopher peptideprophet`
pub const DEFAULT_PEPTIDE_PROPHET_OPTIONS: &str =
    "--decoyprobs --ppm --accmass --nonparam --expectscore";

/// Parse a `key=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Proteomics pipeline runner with update checks
#[derive(Parser, Debug, Clone)]
#[command(name = "fragrun", version, about = "Proteomics pipeline runner with update checks")]
pub struct CliArgs {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check for newer versions of the application and MSFragger
    CheckUpdates(CheckUpdatesArgs),

    /// Print the changelog
    Changelog(ChangelogArgs),

    /// Assemble and run the pipeline
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CheckUpdatesArgs {
    /// Only consult the bundled manifest and local files
    #[arg(long)]
    pub offline: bool,

    /// MSFragger jar to inspect (file name under the tool roots, or a path)
    #[arg(long)]
    pub msfragger_jar: Option<String>,

    /// Directories searched for tools (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub tools: Vec<PathBuf>,

    /// Java executable
    #[arg(long, default_value = "java")]
    pub java: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ChangelogArgs {
    /// Show at most this many versions (0 shows all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Only show versions newer than this one
    #[arg(long)]
    pub since: Option<String>,

    /// Prepend release download links for the current version
    #[arg(long)]
    pub release_notes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Working directory; when it does not exist nothing is written or run
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// Print the commands without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Java heap size in GB (0 leaves the JVM default)
    #[arg(long, default_value_t = 0)]
    pub ram: u32,

    /// Worker threads (default: available parallelism)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directories searched for tools (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub tools: Vec<PathBuf>,

    /// Java executable
    #[arg(long, default_value = "java")]
    pub java: PathBuf,

    /// Protein database (FASTA)
    #[arg(long)]
    pub database: PathBuf,

    /// MSFragger jar (file name under the tool roots, or a path)
    #[arg(long, default_value = "MSFragger.jar")]
    pub msfragger_jar: String,

    /// Input file as PATH or PATH:TYPE with TYPE one of DDA, DIA, GPF-DIA, DIA-Quant
    #[arg(long, required = true, action = ArgAction::Append)]
    pub lcms: Vec<InputLcmsFile>,

    /// LCMS files per MSFragger process (0 searches all at once)
    #[arg(long, default_value_t = 0)]
    pub files_per_batch: usize,

    /// MSFragger search parameter as KEY=VALUE (can be specified multiple times)
    #[arg(long = "param", value_parser = parse_key_val, action = ArgAction::Append)]
    pub params: Vec<(String, String)>,

    /// Validate search results with PeptideProphet
    #[arg(long)]
    pub peptide_prophet: bool,

    /// Options passed to PeptideProphet
    #[arg(long, default_value = DEFAULT_PEPTIDE_PROPHET_OPTIONS, allow_hyphen_values = true)]
    pub peptide_prophet_options: String,

    /// Rescore search results with MoreRescore
    #[arg(long)]
    pub more_rescore: bool,

    /// Use predicted retention times when rescoring
    #[arg(long)]
    pub predict_rt: bool,

    /// Use predicted spectra when rescoring
    #[arg(long)]
    pub predict_spectra: bool,

    /// Skip the background update check
    #[arg(long)]
    pub no_update_check: bool,
}
