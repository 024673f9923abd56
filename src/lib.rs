//! fragrun - proteomics pipeline runner library
//!
//! This library provides:
//! - Update checks for the application and the tools it drives, over an
//!   ordered chain of version sources
//! - A changelog registry and user-facing update notices
//! - Tool discovery under configurable root directories
//! - Pipeline stages that turn run parameters into external processes
//! - A pipeline assembler that runs the queued processes in stage order

pub mod advisory;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod locator;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod source;
pub mod stage;
pub mod version;
