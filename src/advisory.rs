//! User-facing update messages
//!
//! Combines a resolver result with the remote manifest (severity tags,
//! per-version messages, blanket message) and the changelog into a single
//! plain-text notice.

use crate::domain::{UpdatePackage, VersionAdvisory};
use crate::source::manifest::keys;
use crate::source::Manifest;
use crate::version::{is_newer, ChangelogRegistry, Version};
use std::collections::BTreeSet;

/// Most changelog versions quoted in one notice
const MAX_CHANGELOG_VERSIONS: usize = 5;

/// Builds update notices from manifest data
pub struct UpdateAdvisory<'a> {
    manifest: &'a Manifest,
    changelog: &'a ChangelogRegistry,
    default_download_url: String,
}

impl<'a> UpdateAdvisory<'a> {
    pub fn new(manifest: &'a Manifest, changelog: &'a ChangelogRegistry) -> Self {
        Self {
            manifest,
            changelog,
            default_download_url: String::new(),
        }
    }

    /// Download url used when neither the manifest nor the resolver has one
    pub fn with_default_download_url(mut self, url: impl Into<String>) -> Self {
        self.default_download_url = url.into();
        self
    }

    /// Fill severity notes, download url and blanket message into `advisory`
    pub fn annotate(&self, advisory: &mut VersionAdvisory) {
        advisory.freeform_message = self
            .manifest
            .get_non_blank(keys::DOWNLOAD_MESSAGE)
            .map(str::to_string);

        let Some(local) = advisory.local_version.clone() else {
            return;
        };
        if !advisory.has_update() {
            return;
        }

        advisory.download_url = self
            .manifest
            .get_non_blank(keys::DOWNLOAD_URL)
            .map(str::to_string)
            .or_else(|| advisory.download_url.take())
            .or_else(|| non_blank(&self.default_download_url));

        advisory.critical_notes = self.severity_notes(keys::CRITICAL_UPDATES, &local, "critical");
        advisory.important_notes =
            self.severity_notes(keys::IMPORTANT_UPDATES, &local, "important");
    }

    /// Annotate `advisory` and render it; `None` means nothing to show
    pub fn build_message(&self, advisory: &mut VersionAdvisory) -> Option<String> {
        self.annotate(advisory);
        if advisory.is_empty() {
            return None;
        }

        let mut sections = Vec::new();

        if let (Some(local), Some(remote)) = (&advisory.local_version, &advisory.remote_version) {
            let mut notice = format!(
                "Your {subject} version is [{local}]\nThere is a newer version of {subject} available [{remote}].",
                subject = advisory.subject,
            );
            if let Some(url) = &advisory.download_url {
                notice.push_str(&format!("\nDownload it from: {}", url));
            }
            sections.push(notice);

            if !advisory.critical_notes.is_empty() {
                sections.push(render_notes("Critical updates:", &advisory.critical_notes));
            }
            if !advisory.important_notes.is_empty() {
                sections.push(render_notes("Important updates:", &advisory.important_notes));
            }

            let changes = self.changes_between(local, remote);
            if !changes.is_empty() {
                sections.push(changes);
            }
        }

        if let Some(message) = &advisory.freeform_message {
            sections.push(message.clone());
        }

        Some(sections.join("\n\n"))
    }

    /// Add-on packages from the manifest that apply to `version`
    pub fn applicable_packages(&self, version: &str) -> Vec<UpdatePackage> {
        self.manifest
            .update_packages(keys::UPDATE_PACKAGE_PREFIX)
            .into_iter()
            .filter(|p| p.applies_to(version))
            .collect()
    }

    fn severity_notes(&self, list_key: &str, local: &str, label: &str) -> Vec<String> {
        let list = self.manifest.get(list_key).unwrap_or_default();
        let tags: BTreeSet<Version> = ChangelogRegistry::updates_since(list, local)
            .into_iter()
            .map(Version::new)
            .collect();
        if tags.is_empty() {
            return Vec::new();
        }

        let messages: Vec<String> = tags
            .iter()
            .filter_map(|tag| {
                self.manifest
                    .get_non_blank(&format!("{}.{}", keys::DOWNLOAD_MESSAGE, tag))
                    .map(str::to_string)
            })
            .collect();

        if messages.is_empty() {
            let plural = if tags.len() == 1 { "" } else { "s" };
            vec![format!(
                "There have been {} {} update{}.",
                tags.len(),
                label,
                plural
            )]
        } else {
            messages
        }
    }

    fn changes_between(&self, local: &str, remote: &str) -> String {
        let entries: Vec<_> = self
            .changelog
            .changes_since(local, 0)
            .into_iter()
            .filter(|e| !is_newer(&e.version, remote))
            .take(MAX_CHANGELOG_VERSIONS)
            .collect();
        if entries.is_empty() {
            return String::new();
        }

        let mut out = String::from("What's new:");
        for entry in entries {
            out.push_str(&format!("\nv{}:", entry.version));
            for note in &entry.notes {
                out.push_str(&format!("\n - {}", note));
            }
        }
        out
    }
}

/// Build the notice for `advisory` from `manifest` and `changelog`
pub fn build_message(
    advisory: &mut VersionAdvisory,
    manifest: &Manifest,
    changelog: &ChangelogRegistry,
) -> Option<String> {
    UpdateAdvisory::new(manifest, changelog).build_message(advisory)
}

fn render_notes(heading: &str, notes: &[String]) -> String {
    let mut out = heading.to_string();
    for note in notes {
        out.push_str("\n - ");
        out.push_str(note);
    }
    out
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
