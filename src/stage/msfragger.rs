//! MSFragger database search

use super::params::{write_all, ParamFile};
use super::{absolute, path_arg, CommandBuilder, StageBase, StageContext, StageState};
use crate::domain::{InputLcmsFile, ProcessDescriptor};
use crate::error::StageError;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const NAME: &str = "MSFragger";
pub const PARAMS_FILE: &str = "fragger.params";

/// Inputs of one MSFragger search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsfraggerParams {
    /// Jar file name, or an absolute path to it
    pub jar: String,
    /// Protein database
    pub database: PathBuf,
    /// Files to search
    pub lcms_files: Vec<InputLcmsFile>,
    /// Search parameters passed through to `fragger.params`
    pub search_params: BTreeMap<String, String>,
    /// Files per process; 0 searches everything in one process
    pub files_per_batch: usize,
}

#[derive(Debug, Clone)]
pub struct Msfragger {
    base: StageBase,
}

impl Msfragger {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: StageBase::new(NAME, work_dir),
        }
    }

    pub fn configure(
        &mut self,
        ctx: &StageContext,
        params: &MsfraggerParams,
    ) -> Result<(), StageError> {
        self.base.configure_with(|base| {
            if params.lcms_files.is_empty() {
                return Err(StageError::invalid_input(NAME, "no LCMS files to search"));
            }
            if params.database.as_os_str().is_empty() {
                return Err(StageError::invalid_input(NAME, "no protein database given"));
            }

            let jar = base.resolve(&ctx.locator, &[params.jar.as_str()])?;
            let jar = absolute(&jar[0], NAME)?;
            let database = absolute(&params.database, NAME)?;
            let params_path = base.absolute(PARAMS_FILE)?;

            if !base.is_dry_run() {
                let mut file = ParamFile::new();
                for (key, value) in &params.search_params {
                    file.set(key.as_str(), value);
                }
                file.set("database_name", path_arg(&database))
                    .set("num_threads", ctx.limits.threads);
                write_all(&[(params_path.clone(), file)])?;
            }

            let batch_size = match params.files_per_batch {
                0 => params.lcms_files.len(),
                n => n,
            };

            params
                .lcms_files
                .chunks(batch_size)
                .map(|batch| -> Result<ProcessDescriptor, StageError> {
                    let (java, mut args) = ctx.java_command();
                    args.push("-jar".to_string());
                    args.push(path_arg(&jar));
                    args.push(path_arg(&params_path));
                    for lcms in batch {
                        args.push(path_arg(&absolute(&lcms.path, NAME)?));
                    }
                    Ok(ProcessDescriptor::new(java, args, base.work_dir()))
                })
                .collect()
        })
    }
}

impl CommandBuilder for Msfragger {
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
