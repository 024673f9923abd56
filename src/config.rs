//! Run configuration
//!
//! Features:
//! - The embedded application manifest (local version, download links,
//!   manifest locations)
//! - Validated run settings assembled from command line arguments
//! - Default tool roots and thread budget

use crate::cli::RunArgs;
use crate::domain::{DataType, InputLcmsFile, ResourceLimits};
use crate::error::ConfigError;
use crate::locator::ToolLocator;
use crate::source::manifest::keys;
use crate::source::Manifest;
use crate::stage::{MoreRescoreParams, MsfraggerParams, PeptideProphetParams, StageContext};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name shown to users
pub const PROGRAM_TITLE: &str = "FragPipe";

/// Name of the checked dependency
pub const MSFRAGGER_TITLE: &str = "MSFragger";

const BUNDLE: &str = include_str!("bundle.properties");

/// The manifest shipped with this build
#[derive(Debug, Clone)]
pub struct Bundle {
    manifest: Manifest,
}

impl Bundle {
    /// The embedded manifest
    pub fn embedded() -> Self {
        Self::from_manifest(Manifest::parse(BUNDLE))
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn required(&self, key: &str) -> Result<&str, ConfigError> {
        self.manifest
            .get_non_blank(key)
            .ok_or_else(|| ConfigError::MissingBundleKey {
                key: key.to_string(),
            })
    }

    /// Version of the running application
    pub fn version(&self) -> Result<&str, ConfigError> {
        self.required(keys::VERSION)
    }

    /// Application download page
    pub fn download_url(&self) -> Result<&str, ConfigError> {
        self.required(keys::DOWNLOAD_URL)
    }

    pub fn issue_tracker_url(&self) -> Option<&str> {
        self.manifest.get_non_blank(keys::ISSUE_TRACKER_URL)
    }

    pub fn release_manifest_urls(&self) -> Vec<String> {
        self.url_list(keys::RELEASE_MANIFEST_URL)
    }

    pub fn dev_manifest_urls(&self) -> Vec<String> {
        self.url_list(keys::DEV_MANIFEST_URL)
    }

    pub fn msfragger_manifest_urls(&self) -> Vec<String> {
        self.url_list(keys::MSFRAGGER_MANIFEST_URL)
    }

    pub fn msfragger_download_url(&self) -> &str {
        self.manifest
            .get_non_blank(keys::MSFRAGGER_DOWNLOAD_URL)
            .unwrap_or_default()
    }

    fn url_list(&self, key: &str) -> Vec<String> {
        self.manifest
            .get(key)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Available parallelism, or 1 when it cannot be determined
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `./tools` and `<exe dir>/tools`
pub fn default_tool_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("tools")];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
    {
        let beside_exe = dir.join("tools");
        if !roots.contains(&beside_exe) {
            roots.push(beside_exe);
        }
    }
    roots
}

/// Tool roots given on the command line, or the defaults
pub fn tool_roots(explicit: &[PathBuf]) -> Vec<PathBuf> {
    if explicit.is_empty() {
        default_tool_roots()
    } else {
        explicit.to_vec()
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub work_dir: PathBuf,
    pub dry_run: bool,
    pub limits: ResourceLimits,
    pub tool_roots: Vec<PathBuf>,
    pub java: PathBuf,
    pub database: PathBuf,
    pub msfragger_jar: String,
    pub lcms_files: Vec<InputLcmsFile>,
    pub files_per_batch: usize,
    pub search_params: BTreeMap<String, String>,
    /// PeptideProphet options; `None` skips the stage
    pub peptide_prophet: Option<String>,
    pub more_rescore: bool,
    pub predict_rt: bool,
    pub predict_spectra: bool,
    pub update_check: bool,
}

impl RunConfig {
    /// Validate command line arguments into a run configuration
    pub fn from_args(args: &RunArgs) -> Result<Self, ConfigError> {
        let threads = args.threads.unwrap_or_else(default_threads);
        if threads == 0 {
            return Err(ConfigError::invalid_value("threads", "must be at least 1"));
        }
        if args.lcms.is_empty() {
            return Err(ConfigError::invalid_value("lcms", "at least one LCMS file is required"));
        }
        if args.msfragger_jar.trim().is_empty() {
            return Err(ConfigError::invalid_value("msfragger-jar", "must not be empty"));
        }

        let mut search_params = BTreeMap::new();
        for (key, value) in &args.params {
            search_params.insert(key.clone(), value.clone());
        }

        Ok(Self {
            work_dir: args.work_dir.clone(),
            dry_run: args.dry_run,
            limits: ResourceLimits::new(args.ram, threads),
            tool_roots: tool_roots(&args.tools),
            java: args.java.clone(),
            database: args.database.clone(),
            msfragger_jar: args.msfragger_jar.clone(),
            lcms_files: args.lcms.clone(),
            files_per_batch: args.files_per_batch,
            search_params,
            peptide_prophet: args
                .peptide_prophet
                .then(|| args.peptide_prophet_options.clone()),
            more_rescore: args.more_rescore,
            predict_rt: args.predict_rt,
            predict_spectra: args.predict_spectra,
            update_check: !args.no_update_check,
        })
    }

    pub fn stage_context(&self) -> StageContext {
        StageContext::new(
            ToolLocator::new(self.tool_roots.clone()),
            &self.java,
            self.limits,
        )
    }

    /// Search results MSFragger writes for an input file
    pub fn pepxml_for(&self, lcms: &InputLcmsFile) -> Vec<PathBuf> {
        let stem = lcms.stem();
        match lcms.data_type {
            DataType::Dda => vec![self.work_dir.join(format!("{}.pepXML", stem))],
            _ => vec![self.work_dir.join(format!("{}_rank1.pepXML", stem))],
        }
    }

    pub fn msfragger_params(&self) -> MsfraggerParams {
        MsfraggerParams {
            jar: self.msfragger_jar.clone(),
            database: self.database.clone(),
            lcms_files: self.lcms_files.clone(),
            search_params: self.search_params.clone(),
            files_per_batch: self.files_per_batch,
        }
    }

    pub fn more_rescore_params(&self) -> MoreRescoreParams {
        MoreRescoreParams {
            pepxml_by_lcms: self
                .lcms_files
                .iter()
                .map(|lcms| (lcms.clone(), self.pepxml_for(lcms)))
                .collect(),
            predict_rt: self.predict_rt,
            predict_spectra: self.predict_spectra,
        }
    }

    pub fn peptide_prophet_params(&self) -> Option<PeptideProphetParams> {
        self.peptide_prophet
            .as_ref()
            .map(|options| PeptideProphetParams {
                database: self.database.clone(),
                pepxml_files: self
                    .lcms_files
                    .iter()
                    .flat_map(|lcms| self.pepxml_for(lcms))
                    .collect(),
                options: options.clone(),
            })
    }
}
