//! Version advisory produced by an update check

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one update check, recomputed on every check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionAdvisory {
    /// What was checked (application or tool name)
    pub subject: String,
    /// Version currently in use; `None` when it could not be determined
    pub local_version: Option<String>,
    /// Newer version found, if any
    pub remote_version: Option<String>,
    /// Where the newer version can be downloaded
    pub download_url: Option<String>,
    /// Name of the source that reported the newer version
    pub source: Option<String>,
    /// Messages for critical updates since the local version
    pub critical_notes: Vec<String>,
    /// Messages for important updates since the local version
    pub important_notes: Vec<String>,
    /// Message shown regardless of version delta
    pub freeform_message: Option<String>,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

impl VersionAdvisory {
    /// An advisory that reports no newer version
    pub fn up_to_date(subject: impl Into<String>, local_version: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            local_version,
            remote_version: None,
            download_url: None,
            source: None,
            critical_notes: Vec::new(),
            important_notes: Vec::new(),
            freeform_message: None,
            checked_at: Utc::now(),
        }
    }

    /// An advisory that reports a newer version
    pub fn newer(
        subject: impl Into<String>,
        local_version: impl Into<String>,
        remote_version: impl Into<String>,
        download_url: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            remote_version: Some(remote_version.into()),
            download_url: download_url.filter(|u| !u.trim().is_empty()),
            source: Some(source.into()),
            ..Self::up_to_date(subject, Some(local_version.into()))
        }
    }

    /// Whether a newer version was found
    pub fn has_update(&self) -> bool {
        self.remote_version.is_some()
    }

    /// Whether there is anything to show the user
    pub fn is_empty(&self) -> bool {
        !self.has_update() && self.freeform_message.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_to_date_is_empty() {
        let a = VersionAdvisory::up_to_date("FragPipe", Some("17.0".to_string()));
        assert!(!a.has_update());
        assert!(a.is_empty());
    }

    #[test]
    fn test_newer_has_update() {
        let a = VersionAdvisory::newer("MSFragger", "3.3", "3.4", Some("https://x".into()), "server");
        assert!(a.has_update());
        assert_eq!(a.remote_version.as_deref(), Some("3.4"));
        assert_eq!(a.download_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_blank_download_url_dropped() {
        let a = VersionAdvisory::newer("MSFragger", "3.3", "3.4", Some("  ".into()), "server");
        assert!(a.download_url.is_none());
    }

    #[test]
    fn test_freeform_message_alone_is_not_empty() {
        let mut a = VersionAdvisory::up_to_date("FragPipe", None);
        a.freeform_message = Some("Happy new year!".to_string());
        assert!(!a.is_empty());
    }
}
