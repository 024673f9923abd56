//! Optional add-on components offered for download

use crate::version::compare_versions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// An add-on package and the application versions it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePackage {
    /// Where the package can be downloaded
    pub download_url: String,
    /// Unique identity of the package
    pub property_key: String,
    /// Human readable description (may be empty)
    pub description: String,
    /// Lowest application version the package applies to
    pub min_version: Option<String>,
    /// Highest application version the package applies to
    pub max_version: Option<String>,
}

/// Reason an [`UpdatePackage`] could not be constructed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPackage {
    #[error("update package is missing a property key")]
    MissingKey,
    #[error("update package '{0}' is missing a download url")]
    MissingUrl(String),
}

impl UpdatePackage {
    /// Create a package; the key and download url are mandatory
    pub fn new(
        download_url: impl Into<String>,
        property_key: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, InvalidPackage> {
        let download_url = download_url.into();
        let property_key = property_key.into();
        if property_key.trim().is_empty() {
            return Err(InvalidPackage::MissingKey);
        }
        if download_url.trim().is_empty() {
            return Err(InvalidPackage::MissingUrl(property_key));
        }
        Ok(Self {
            download_url,
            property_key,
            description: description.into(),
            min_version: None,
            max_version: None,
        })
    }

    /// Restrict the package to application versions `min..=max`
    pub fn with_window(mut self, min: Option<String>, max: Option<String>) -> Self {
        self.min_version = min.filter(|v| !v.trim().is_empty());
        self.max_version = max.filter(|v| !v.trim().is_empty());
        self
    }

    /// Description if present, otherwise the key
    pub fn description_or_name(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.property_key
        } else {
            &self.description
        }
    }

    /// Whether the package applies to the given application version
    pub fn applies_to(&self, version: &str) -> bool {
        let above_min = self
            .min_version
            .as_deref()
            .map_or(true, |min| compare_versions(version, min) != Ordering::Less);
        let below_max = self
            .max_version
            .as_deref()
            .map_or(true, |max| compare_versions(version, max) != Ordering::Greater);
        above_min && below_max
    }
}

impl fmt::Display for UpdatePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UpdatePackage[property_key='{}', download_url='{}', description='{}', min_version='{}', max_version='{}']",
            self.property_key,
            self.download_url,
            self.description,
            self.min_version.as_deref().unwrap_or(""),
            self.max_version.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> UpdatePackage {
        UpdatePackage::new("https://example.org/easypqp.zip", "easypqp", "EasyPQP").unwrap()
    }

    #[test]
    fn test_new_requires_key() {
        let err = UpdatePackage::new("https://example.org", "  ", "").unwrap_err();
        assert_eq!(err, InvalidPackage::MissingKey);
    }

    #[test]
    fn test_new_requires_url() {
        let err = UpdatePackage::new("", "easypqp", "").unwrap_err();
        assert_eq!(err, InvalidPackage::MissingUrl("easypqp".to_string()));
    }

    #[test]
    fn test_description_or_name() {
        assert_eq!(package().description_or_name(), "EasyPQP");
        let bare = UpdatePackage::new("https://example.org", "diann", "").unwrap();
        assert_eq!(bare.description_or_name(), "diann");
    }

    #[test]
    fn test_applies_without_window() {
        assert!(package().applies_to("1.0"));
        assert!(package().applies_to("99.0"));
    }

    #[test]
    fn test_applies_within_window() {
        let p = package().with_window(Some("15.0".to_string()), Some("17.0".to_string()));
        assert!(!p.applies_to("14.0"));
        assert!(p.applies_to("15.0"));
        assert!(p.applies_to("16.2"));
        assert!(p.applies_to("17.0"));
        assert!(!p.applies_to("17.1"));
    }

    #[test]
    fn test_blank_bounds_are_open() {
        let p = package().with_window(Some(String::new()), Some(" ".to_string()));
        assert!(p.min_version.is_none());
        assert!(p.max_version.is_none());
    }

    #[test]
    fn test_display() {
        let text = package().to_string();
        assert!(text.contains("property_key='easypqp'"));
        assert!(text.contains("download_url='https://example.org/easypqp.zip'"));
    }
}
