//! MoreRescore: feature rescoring of search results on the JVM

use super::params::{write_all, ParamFile};
use super::{absolute, classpath, path_arg, CommandBuilder, StageBase, StageContext, StageState};
use crate::domain::{DataType, InputLcmsFile, ProcessDescriptor};
use crate::error::StageError;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const NAME: &str = "MoreRescore";
pub const JAR_MORERESCORE: &str = "morerescore-1.0.jar";
pub const MAIN_CLASS: &str = "Features.MainClass";
pub const JAR_DEPS: [&str; 3] = [
    "smile-core-2.6.0.jar",
    "smile-math-2.6.0.jar",
    "batmass-io-1.23.4.jar",
];
pub const PARAMS_FILE: &str = "morerescore_params.txt";

#[cfg(windows)]
pub const DIANN_EXE: &str = "DiaNN.exe";
#[cfg(not(windows))]
pub const DIANN_EXE: &str = "diann";

/// Inputs of one MoreRescore run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoreRescoreParams {
    /// Search results produced for each LCMS file
    pub pepxml_by_lcms: BTreeMap<InputLcmsFile, Vec<PathBuf>>,
    /// Use predicted retention times
    pub predict_rt: bool,
    /// Use predicted spectra
    pub predict_spectra: bool,
}

#[derive(Debug, Clone)]
pub struct MoreRescore {
    base: StageBase,
}

impl MoreRescore {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: StageBase::new(NAME, work_dir),
        }
    }

    pub fn configure(
        &mut self,
        ctx: &StageContext,
        params: &MoreRescoreParams,
    ) -> Result<(), StageError> {
        self.base.configure_with(|base| {
            if params.pepxml_by_lcms.is_empty() {
                return Err(StageError::invalid_input(NAME, "no search results to rescore"));
            }

            let mut names = vec![JAR_MORERESCORE];
            names.extend(JAR_DEPS);
            names.push(DIANN_EXE);
            let mut jars = base.resolve(&ctx.locator, &names)?;
            let diann = match jars.pop() {
                Some(path) => absolute(&path, NAME)?,
                None => return Err(StageError::invalid_input(NAME, "DIA-NN not resolved")),
            };

            let params_path = base.absolute(PARAMS_FILE)?;
            if !base.is_dry_run() {
                let file = params_file(base.work_dir(), ctx.limits.threads, &diann, params)?;
                write_all(&[(params_path.clone(), file)])?;
            }

            let (java, mut args) = ctx.java_command();
            args.push("-cp".to_string());
            args.push(classpath(&jars)?);
            args.push(MAIN_CLASS.to_string());
            args.push("--paramsList".to_string());
            args.push(path_arg(&params_path));

            Ok(vec![ProcessDescriptor::new(java, args, base.work_dir())])
        })
    }
}

impl CommandBuilder for MoreRescore {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn state(&self) -> StageState {
        self.base.state()
    }

    fn descriptors(&self) -> Result<&[ProcessDescriptor], StageError> {
        self.base.descriptors()
    }
}

fn params_file(
    work_dir: &Path,
    threads: usize,
    diann: &Path,
    params: &MoreRescoreParams,
) -> Result<ParamFile, StageError> {
    let mut lcms_dirs = BTreeSet::new();
    for lcms in params.pepxml_by_lcms.keys() {
        let dir = lcms
            .directory()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        lcms_dirs.insert(path_arg(&absolute(dir, NAME)?));
    }

    let pins: BTreeSet<String> = params
        .pepxml_by_lcms
        .iter()
        .flat_map(|(lcms, pepxmls)| {
            pepxmls
                .iter()
                .map(move |p| pin_name(work_dir, p, lcms.data_type))
        })
        .collect();

    let mut file = ParamFile::new();
    file.set("fragger", "null")
        .set("useDetect", false)
        .set("numThreads", threads)
        .set("DiaNN", path_arg(diann))
        .set("renamePin", 1)
        .set("useRT", params.predict_rt)
        .set("useSpectra", params.predict_spectra)
        .set("mzmlDirectory", join(lcms_dirs))
        .set("pinPepXMLDirectory", join(pins));
    Ok(file)
}

/// Pin file name for a pepXML, relative to the working directory
///
/// DDA results have one pepXML per file; other data types carry a
/// `_rank<N>` suffix that all map to the same pin.
pub fn pin_name(work_dir: &Path, pepxml: &Path, data_type: DataType) -> String {
    static DDA: OnceLock<Regex> = OnceLock::new();
    static RANKED: OnceLock<Regex> = OnceLock::new();

    let relative = pepxml.strip_prefix(work_dir).unwrap_or(pepxml);
    let relative = path_arg(relative);
    let re = match data_type {
        DataType::Dda => DDA.get_or_init(|| Regex::new(r"\.pepXML$").expect("valid regex")),
        _ => RANKED.get_or_init(|| Regex::new(r"_rank[0-9]+\.pepXML$").expect("valid regex")),
    };
    re.replace(&relative, ".pin").into_owned()
}

fn join(items: BTreeSet<String>) -> String {
    items.into_iter().collect::<Vec<_>>().join(" ")
}
