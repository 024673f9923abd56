//! Flat key-value manifests
//!
//! Remote and bundled manifests share one `.properties`-style format:
//! `key = value` or `key: value` per line, `#` and `!` start comments, and a
//! trailing backslash continues the value on the next line.

use crate::domain::UpdatePackage;
use crate::error::SourceError;
use crate::source::HttpClient;
use std::collections::{BTreeMap, BTreeSet};

/// Keys recognized in application manifests
pub mod keys {
    /// Version of the application the manifest describes
    pub const VERSION: &str = "msfragger.gui.version";
    /// Last released application version
    pub const LAST_RELEASE_VERSION: &str = "fragpipe.last.release.version";
    /// Application download page
    pub const DOWNLOAD_URL: &str = "msfragger.gui.download-url";
    /// Issue tracker
    pub const ISSUE_TRACKER_URL: &str = "msfragger.gui.issue-tracker";
    /// Blanket message; `<DOWNLOAD_MESSAGE>.<version>` holds per-version messages
    pub const DOWNLOAD_MESSAGE: &str = "msfragger.gui.download-message";
    /// Comma separated important version tags
    pub const IMPORTANT_UPDATES: &str = "msfragger.gui.important-updates";
    /// Comma separated critical version tags
    pub const CRITICAL_UPDATES: &str = "msfragger.gui.critical-updates";
    /// Manifest of the release branch
    pub const RELEASE_MANIFEST_URL: &str = "fragpipe.release.manifest-url";
    /// Manifest of the development branch
    pub const DEV_MANIFEST_URL: &str = "fragpipe.dev.manifest-url";
    /// Manifest published by the MSFragger update server
    pub const MSFRAGGER_MANIFEST_URL: &str = "msfragger.manifest-url";
    /// Latest MSFragger version
    pub const MSFRAGGER_VERSION: &str = "msfragger.version";
    /// MSFragger manual download page
    pub const MSFRAGGER_DOWNLOAD_URL: &str = "msfragger.download-url";
    /// Prefix of add-on package entries
    pub const UPDATE_PACKAGE_PREFIX: &str = "fragpipe.update-package";
}

/// A parsed key-value manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest text; malformed lines are ignored
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        let mut pending = String::new();

        for raw in content.lines() {
            let line = raw.trim();
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
            {
                continue;
            }

            if let Some(continued) = line.strip_suffix('\\') {
                pending.push_str(continued);
                continue;
            }
            pending.push_str(line);

            let logical = std::mem::take(&mut pending);
            if let Some((key, value)) = split_entry(&logical) {
                entries.insert(key.to_string(), value.to_string());
            }
        }

        if let Some((key, value)) = split_entry(&pending) {
            entries.insert(key.to_string(), value.to_string());
        }

        Self { entries }
    }

    /// Fetch the first reachable manifest from a list of urls
    pub async fn fetch_first(
        client: &HttpClient,
        urls: &[String],
        source_name: &str,
    ) -> Result<Self, SourceError> {
        let mut last_error = None;
        for url in urls {
            match client.get_text(url, source_name).await {
                Ok(text) => return Ok(Self::parse(&text)),
                Err(e) => {
                    log::debug!("manifest {} not available: {}", url, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| SourceError::unavailable(source_name, "no manifest urls")))
    }

    /// Value for a key, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for a key, ignoring blank values
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Whether the manifest has a key
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add-on packages listed under `<prefix>.<key>.<field>`
    ///
    /// Entries without a download url are skipped.
    pub fn update_packages(&self, prefix: &str) -> Vec<UpdatePackage> {
        let lead = format!("{}.", prefix);
        let names: BTreeSet<&str> = self
            .entries
            .keys()
            .filter_map(|k| k.strip_prefix(&lead))
            .filter_map(|rest| rest.rsplit_once('.').map(|(name, _)| name))
            .collect();

        names
            .into_iter()
            .filter_map(|name| {
                let field = |f: &str| self.get(&format!("{}{}.{}", lead, name, f));
                let package = UpdatePackage::new(
                    field("download-url").unwrap_or_default(),
                    name,
                    field("description").unwrap_or_default(),
                );
                match package {
                    Ok(p) => Some(p.with_window(
                        field("min-version").map(str::to_string),
                        field("max-version").map(str::to_string),
                    )),
                    Err(e) => {
                        log::debug!("skipping update package: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(['=', ':'])?;
    let key = line[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[idx + 1..].trim()))
}
