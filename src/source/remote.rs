//! Version published in a hosted manifest

use super::{HttpClient, Manifest, VersionSource};
use crate::error::SourceError;
use crate::version::{Version, VersionRecord};
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Reads one key of a remote manifest
///
/// The manifest is fetched at most once per source; later calls reuse it.
pub struct RemoteManifestSource {
    name: String,
    client: HttpClient,
    urls: Vec<String>,
    version_key: String,
    download_key: Option<String>,
    fallback_url: String,
    fetched: OnceCell<Manifest>,
}

impl RemoteManifestSource {
    /// Create a source reading `version_key` from the first reachable url
    pub fn new(
        name: impl Into<String>,
        client: HttpClient,
        urls: Vec<String>,
        version_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            urls,
            version_key: version_key.into(),
            download_key: None,
            fallback_url: String::new(),
            fetched: OnceCell::new(),
        }
    }

    /// Take the download url from this manifest key when present
    pub fn with_download_key(mut self, key: impl Into<String>) -> Self {
        self.download_key = Some(key.into());
        self
    }

    /// Download url used when the manifest has none
    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = url.into();
        self
    }

    /// Use an already fetched manifest instead of going to the network
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.fetched = OnceCell::new_with(Some(manifest));
        self
    }

    /// The manifest, if it has been fetched
    pub fn manifest(&self) -> Option<&Manifest> {
        self.fetched.get()
    }

    async fn load(&self) -> Result<&Manifest, SourceError> {
        self.fetched
            .get_or_try_init(|| Manifest::fetch_first(&self.client, &self.urls, &self.name))
            .await
    }
}

#[async_trait]
impl VersionSource for RemoteManifestSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_version(&self) -> Result<VersionRecord, SourceError> {
        let manifest = self.load().await?;
        let value = manifest.get_non_blank(&self.version_key).ok_or_else(|| {
            SourceError::unavailable(&self.name, format!("key '{}' not found", self.version_key))
        })?;
        match Version::parse(value) {
            Some(v) => Ok(VersionRecord::parsed(v.as_str())),
            None => Err(SourceError::unparsable(&self.name, value)),
        }
    }

    fn download_url(&self) -> String {
        self.download_key
            .as_deref()
            .and_then(|key| self.manifest()?.get_non_blank(key))
            .unwrap_or(&self.fallback_url)
            .to_string()
    }
}
