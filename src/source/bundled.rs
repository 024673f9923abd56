//! Version from the manifest shipped inside the binary

use super::{Manifest, VersionSource};
use crate::error::SourceError;
use crate::version::{Version, VersionRecord};
use async_trait::async_trait;

/// Offline source backed by an embedded manifest
#[derive(Debug, Clone)]
pub struct BundledManifestSource {
    manifest: Manifest,
    version_key: String,
    download_key: String,
}

impl BundledManifestSource {
    pub fn new(
        manifest: Manifest,
        version_key: impl Into<String>,
        download_key: impl Into<String>,
    ) -> Self {
        Self {
            manifest,
            version_key: version_key.into(),
            download_key: download_key.into(),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The bundled version without going through the async trait
    pub fn record(&self) -> VersionRecord {
        match self.manifest.get_non_blank(&self.version_key) {
            Some(v) if Version::parse(v).is_some() => VersionRecord::parsed(v),
            Some(v) => VersionRecord::unparsed(v),
            None => VersionRecord::unparsed(""),
        }
    }
}

#[async_trait]
impl VersionSource for BundledManifestSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn fetch_version(&self) -> Result<VersionRecord, SourceError> {
        let record = self.record();
        if record.is_parsed {
            Ok(record)
        } else {
            Err(SourceError::unparsable("bundled", record.value))
        }
    }

    fn download_url(&self) -> String {
        self.manifest
            .get_non_blank(&self.download_key)
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled(text: &str) -> BundledManifestSource {
        BundledManifestSource::new(
            Manifest::parse(text),
            "msfragger.gui.version",
            "msfragger.gui.download-url",
        )
    }

    #[tokio::test]
    async fn test_bundled_version() {
        let s = bundled("msfragger.gui.version = 17.1\nmsfragger.gui.download-url = https://x/");
        assert_eq!(s.fetch_version().await.unwrap().value, "17.1");
        assert_eq!(s.download_url(), "https://x/");
    }

    #[tokio::test]
    async fn test_bundled_without_version() {
        let s = bundled("");
        assert!(!s.record().is_parsed);
        assert!(s.fetch_version().await.is_err());
        assert_eq!(s.download_url(), "");
    }
}
