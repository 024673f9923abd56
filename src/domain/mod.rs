//! Core domain models for fragrun
//!
//! This module contains the fundamental types used throughout the application:
//! - Add-on packages and the version window they apply to
//! - Process descriptors produced by pipeline stages
//! - Tool resolution results
//! - Version advisories produced by update checks
//! - Run inputs shared by stages

mod advisory;
mod inputs;
mod process;
mod tool;
mod update_package;

pub use advisory::VersionAdvisory;
pub use inputs::{DataType, InputLcmsFile, ResourceLimits};
pub use process::ProcessDescriptor;
pub use tool::ToolResolution;
pub use update_package::{InvalidPackage, UpdatePackage};
