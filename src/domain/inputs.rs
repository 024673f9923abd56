//! Run inputs shared by pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Acquisition type of an LCMS file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    /// Data-dependent acquisition
    #[serde(rename = "DDA")]
    Dda,
    /// Data-independent acquisition
    #[serde(rename = "DIA")]
    Dia,
    /// Gas-phase fractionated DIA
    #[serde(rename = "GPF-DIA")]
    GpfDia,
    /// DIA used only for quantification
    #[serde(rename = "DIA-Quant")]
    DiaQuant,
}

impl DataType {
    /// Label used by the tools
    pub fn label(&self) -> &'static str {
        match self {
            DataType::Dda => "DDA",
            DataType::Dia => "DIA",
            DataType::GpfDia => "GPF-DIA",
            DataType::DiaQuant => "DIA-Quant",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DDA" => Ok(DataType::Dda),
            "DIA" => Ok(DataType::Dia),
            "GPF-DIA" => Ok(DataType::GpfDia),
            "DIA-QUANT" => Ok(DataType::DiaQuant),
            other => Err(format!(
                "unknown data type '{}': expected DDA, DIA, GPF-DIA or DIA-Quant",
                other
            )),
        }
    }
}

/// An input mass spectrometry file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputLcmsFile {
    /// Location of the file
    pub path: PathBuf,
    /// Acquisition type
    pub data_type: DataType,
}

impl InputLcmsFile {
    /// Create a new input file
    pub fn new(path: impl Into<PathBuf>, data_type: DataType) -> Self {
        Self {
            path: path.into(),
            data_type,
        }
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory containing the file
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }
}

impl FromStr for InputLcmsFile {
    type Err = String;

    /// Parse `path` or `path:TYPE`; the type defaults to DDA
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((path, kind)) = s.rsplit_once(':') {
            if let Ok(data_type) = kind.parse::<DataType>() {
                return Ok(Self::new(path, data_type));
            }
        }
        if s.trim().is_empty() {
            return Err("empty LCMS file path".to_string());
        }
        Ok(Self::new(s, DataType::Dda))
    }
}

/// Memory and thread budget for external tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Heap size in GB; 0 leaves the JVM default
    pub ram_gb: u32,
    /// Worker threads
    pub threads: usize,
}

impl ResourceLimits {
    /// Create resource limits
    pub fn new(ram_gb: u32, threads: usize) -> Self {
        Self { ram_gb, threads }
    }

    /// JVM heap flag, if a limit was set
    pub fn heap_flag(&self) -> Option<String> {
        (self.ram_gb > 0).then(|| format!("-Xmx{}G", self.ram_gb))
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            ram_gb: 0,
            threads: 1,
        }
    }
}
