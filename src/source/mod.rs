//! Version sources
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - Key-value manifest parsing
//! - Remote manifest source
//! - Bundled (embedded) manifest source
//! - Local jar inspection source

mod bundled;
mod client;
mod local;
pub mod manifest;
mod remote;

pub use bundled::BundledManifestSource;
pub use client::HttpClient;
pub use local::LocalInspectionSource;
pub use manifest::Manifest;
pub use remote::RemoteManifestSource;

use crate::error::SourceError;
use crate::version::VersionRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// One origin of version information
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short name used in logs and advisories
    fn name(&self) -> &str;

    /// Fetch the version this source currently reports
    async fn fetch_version(&self) -> Result<VersionRecord, SourceError>;

    /// Best-effort manual download link, may be empty
    fn download_url(&self) -> String;
}

#[async_trait]
impl<T: VersionSource + ?Sized> VersionSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_version(&self) -> Result<VersionRecord, SourceError> {
        (**self).fetch_version().await
    }

    fn download_url(&self) -> String {
        (**self).download_url()
    }
}
