//! PeptideProphet validation through Philosopher

use super::{absolute, path_arg, CommandBuilder, StageBase, StageContext, StageState};
use crate::domain::ProcessDescriptor;
use crate::error::StageError;
use std::path::PathBuf;

pub const NAME: &str = "PeptideProphet";

#[cfg(windows)]
pub const PHILOSOPHER_EXE: &str = "philosopher.exe";
#[cfg(not(windows))]
pub const PHILOSOPHER_EXE: &str = "philosopher";

/// Inputs of one PeptideProphet run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeptideProphetParams {
    /// Protein database
    pub database: PathBuf,
    /// Search results to validate, one process each
    pub pepxml_files: Vec<PathBuf>,
    /// Extra command line options, whitespace separated
    pub options: String,
}

#[derive(Debug, Clone)]
pub struct PeptideProphet {
    base: StageBase,
    threads: usize,
}

impl PeptideProphet {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: StageBase::new(NAME, work_dir),
            threads: 1,
        }
    }

    pub fn configure(
        &mut self,
        ctx: &StageContext,
        params: &PeptideProphetParams,
    ) -> Result<(), StageError> {
        self.threads = ctx.limits.threads.max(1);
        self.base.configure_with(|base| {
            if params.pepxml_files.is_empty() {
                return Err(StageError::invalid_input(NAME, "no pepXML files to validate"));
            }

            let exe = base.resolve(&ctx.locator, &[PHILOSOPHER_EXE])?;
            let exe = absolute(&exe[0], NAME)?;
            let database = absolute(&params.database, NAME)?;

            params
                .pepxml_files
                .iter()
                .map(|pepxml| -> Result<ProcessDescriptor, StageError> {
                    let mut args = vec!["peptideprophet".to_string()];
                    args.extend(params.options.split_whitespace().map(str::to_string));
                    args.push("--database".to_string());
                    args.push(path_arg(&database));
                    args.push(path_arg(&absolute(pepxml, NAME)?));
                    Ok(ProcessDescriptor::new(&exe, args, base.work_dir()))
                })
                .collect()
        })
    }
}

impl CommandBuilder for PeptideProphet {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn state(&self) -> StageState {
        self.base.state()
    }

    fn descriptors(&self) -> Result<&[ProcessDescriptor], StageError> {
        self.base.descriptors()
    }

    fn parallelism(&self) -> usize {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceLimits;
    use crate::locator::ToolLocator;
    use std::fs;
    use tempfile::TempDir;

    fn context(tools: &TempDir, threads: usize) -> StageContext {
        StageContext::new(
            ToolLocator::new(vec![tools.path().to_path_buf()]),
            "java",
            ResourceLimits::new(0, threads),
        )
    }

    #[test]
    fn test_one_process_per_pepxml() {
        let tools = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        fs::create_dir_all(tools.path().join("philosopher")).unwrap();
        fs::write(tools.path().join("philosopher").join(PHILOSOPHER_EXE), b"").unwrap();

        let params = PeptideProphetParams {
            database: PathBuf::from("/db/p.fasta"),
            pepxml_files: vec![work.path().join("a.pepXML"), work.path().join("b.pepXML")],
            options: "--decoyprobs  --ppm --accmass".to_string(),
        };
        let mut stage = PeptideProphet::new(work.path());
        stage.configure(&context(&tools, 4), &params).unwrap();

        let d = stage.descriptors().unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(stage.parallelism(), 4);
        assert_eq!(
            d[0].executable(),
            tools.path().join("philosopher").join(PHILOSOPHER_EXE)
        );
        assert_eq!(
            &d[0].arguments()[..6],
            ["peptideprophet", "--decoyprobs", "--ppm", "--accmass", "--database", "/db/p.fasta"]
        );
        assert!(d[1].arguments()[6].ends_with("b.pepXML"));
    }

    #[test]
    fn test_missing_philosopher() {
        let tools = TempDir::new().unwrap();
        let params = PeptideProphetParams {
            database: PathBuf::from("/db/p.fasta"),
            pepxml_files: vec![PathBuf::from("/w/a.pepXML")],
            options: String::new(),
        };
        let mut stage = PeptideProphet::new("/w");
        let err = stage.configure(&context(&tools, 1), &params).unwrap_err();
        assert!(matches!(err, StageError::MissingDependency { .. }));
        assert_eq!(stage.state(), StageState::Failed);
    }
}
