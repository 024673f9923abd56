//! Version handling for tools and for the application itself
//!
//! This module provides:
//! - A total order over free-form version strings
//! - The changelog registry with "what changed since" queries
//! - Version records that carry whether a value was actually parsed

mod changelog;
mod ordering;

pub use changelog::{builtin_changelog, ChangelogEntry, ChangelogRegistry};
pub use ordering::{compare_versions, is_dev_build, is_newer, Version};

use serde::{Deserialize, Serialize};

/// A version value obtained from some source
///
/// An unparsed record never takes part in comparisons; it stands for
/// "unknown", not for "oldest".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Raw value as found (may be empty when not parsed)
    pub value: String,
    /// Whether the value was successfully extracted
    pub is_parsed: bool,
}

impl VersionRecord {
    /// A successfully extracted version
    pub fn parsed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_parsed: true,
        }
    }

    /// A value that could not be extracted
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            value: raw.into(),
            is_parsed: false,
        }
    }

    /// The version if it is usable for comparisons
    pub fn version(&self) -> Option<&str> {
        let value = self.value.trim();
        if self.is_parsed && !value.is_empty() {
            Some(value)
        } else {
            None
        }
    }
}
