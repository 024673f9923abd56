//! Version read from a locally installed jar
//!
//! The jar file name is matched against the known naming schemes first; when
//! that fails the jar is launched once and its output is scanned for the same
//! patterns.

use super::VersionSource;
use crate::error::SourceError;
use crate::version::VersionRecord;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

/// Default bound on the probe process
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

const SOURCE_NAME: &str = "local";

/// Naming schemes, newest first since most installations use it
fn schemes() -> &'static [Regex; 2] {
    static SCHEMES: OnceLock<[Regex; 2]> = OnceLock::new();
    SCHEMES.get_or_init(|| {
        [
            Regex::new(r"(?i)(msfragger[-_ ]v?)(\d+(?:\.\d+)+(?:-?[a-z]+\d*)?)")
                .expect("valid new-scheme regex"),
            Regex::new(r"(?i)(msfragger[-_ ])(\d{8})").expect("valid old-scheme regex"),
        ]
    })
}

/// Extract a version from one line of text
pub fn match_version(text: &str) -> Option<String> {
    schemes()
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Inspects a tool jar on disk
#[derive(Debug, Clone)]
pub struct LocalInspectionSource {
    jar: PathBuf,
    java: PathBuf,
    probe_timeout: Duration,
    download_url: String,
}

impl LocalInspectionSource {
    pub fn new(jar: impl Into<PathBuf>, java: impl Into<PathBuf>) -> Self {
        Self {
            jar: jar.into(),
            java: java.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            download_url: String::new(),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// Determine the installed version
    ///
    /// Never fails; a version that could not be found yields an unparsed
    /// record.
    pub async fn inspect(&self) -> VersionRecord {
        match self.detect().await {
            Ok(v) => VersionRecord::parsed(v),
            Err(e) => {
                log::debug!("{}", e);
                VersionRecord::unparsed("")
            }
        }
    }

    async fn detect(&self) -> Result<String, SourceError> {
        if let Some(v) = match_version(&self.jar.to_string_lossy()) {
            return Ok(v);
        }
        let lines = self.probe().await?;
        lines
            .iter()
            .find_map(|line| match_version(line))
            .ok_or_else(|| {
                SourceError::unparsable(SOURCE_NAME, format!("no version in output of {}", self.jar.display()))
            })
    }

    /// Run `java -jar <jar>` and collect stdout lines followed by stderr lines
    async fn probe(&self) -> Result<Vec<String>, SourceError> {
        if !self.jar.is_file() {
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                format!("{} does not exist", self.jar.display()),
            ));
        }

        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.probe_timeout, cmd.output())
            .await
            .map_err(|_| SourceError::timeout(SOURCE_NAME))?
            .map_err(|e| {
                SourceError::unavailable(
                    SOURCE_NAME,
                    format!("failed to run {}: {}", self.java.display(), e),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(stdout
            .lines()
            .chain(stderr.lines())
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl VersionSource for LocalInspectionSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_version(&self) -> Result<VersionRecord, SourceError> {
        self.detect().await.map(VersionRecord::parsed)
    }

    fn download_url(&self) -> String {
        self.download_url.clone()
    }
}
