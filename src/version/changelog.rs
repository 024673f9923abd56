//! Changelog registry
//!
//! The registry is filled once from an authored table and is read-only
//! afterwards. Entries are keyed by [`Version`], so iteration order follows
//! the version ordering rather than insertion order.

use crate::error::ChangelogError;
use crate::version::ordering::{is_newer, Version};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Notes for a single released version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    /// Version the notes belong to
    pub version: String,
    /// Change notes in authored order
    pub notes: Vec<String>,
}

/// Ordered, de-duplicated mapping from version to change notes
#[derive(Debug, Clone, Default)]
pub struct ChangelogRegistry {
    entries: BTreeMap<Version, Vec<String>>,
}

impl ChangelogRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register notes for a version
    ///
    /// Registering the same version twice is an error; versions that compare
    /// equal (e.g. "1.2" and "1.2.0") count as the same version.
    pub fn record<S: Into<String>>(
        &mut self,
        version: &str,
        notes: impl IntoIterator<Item = S>,
    ) -> Result<(), ChangelogError> {
        let key = Version::new(version);
        if self.entries.contains_key(&key) {
            return Err(ChangelogError::DuplicateVersion {
                version: version.to_string(),
            });
        }
        self.entries
            .insert(key, notes.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Number of registered versions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Notes for an exact version
    pub fn notes(&self, version: &str) -> Option<&[String]> {
        self.entries
            .get(&Version::new(version))
            .map(Vec::as_slice)
    }

    /// All entries, newest first
    pub fn entries_descending(&self) -> Vec<ChangelogEntry> {
        self.entries
            .iter()
            .rev()
            .map(|(version, notes)| ChangelogEntry {
                version: version.to_string(),
                notes: notes.clone(),
            })
            .collect()
    }

    /// Entries strictly newer than `version`, newest first
    ///
    /// At most `limit` entries are returned; a limit of 0 means unlimited.
    pub fn changes_since(&self, version: &str, limit: usize) -> Vec<ChangelogEntry> {
        let since = Version::new(version);
        let newer = self
            .entries
            .iter()
            .rev()
            .take_while(|(v, _)| **v > since)
            .map(|(version, notes)| ChangelogEntry {
                version: version.to_string(),
                notes: notes.clone(),
            });

        if limit == 0 {
            newer.collect()
        } else {
            newer.take(limit).collect()
        }
    }

    /// Versions from a comma separated list that are newer than `current`
    ///
    /// Tokens are trimmed; tokens that are not versions are dropped. The
    /// surviving tokens keep their input order.
    pub fn updates_since(version_list: &str, current: &str) -> Vec<String> {
        version_list
            .split(',')
            .filter_map(Version::parse)
            .filter(|v| is_newer(v.as_str(), current))
            .map(|v| v.as_str().to_string())
            .collect()
    }
}

/// The application's own changelog, built on first use
pub fn builtin_changelog() -> &'static ChangelogRegistry {
    static CHANGELOG: OnceLock<ChangelogRegistry> = OnceLock::new();
    CHANGELOG.get_or_init(|| {
        let mut registry = ChangelogRegistry::new();
        for (version, notes) in AUTHORED {
            registry
                .record(version, notes.iter().copied())
                .expect("authored changelog contains a duplicate version");
        }
        registry
    })
}

const AUTHORED: &[(&str, &[&str])] = &[
    (
        "17.0",
        &[
            "Require MSFragger 3.4+",
            "Require Philosopher 4.1.0+",
            "Add MSBooster 1.0 for deep learning based rescoring (Validation)",
            "Add glycan assignment with FDR control (PTM)",
            "Add DIA quantification with DIA-NN 1.8 (DIA Quant tab)",
            "Support two enzymes and N-terminal cutting enzyme (MSFragger tab)",
            "Support DDA, DIA, GPF-DIA, and DIA-Quant data types",
            "Upgrade PTM-Shepherd to 1.2.5",
            "Upgrade DIA-Umpire to 2.2.3",
            "Upgrade IonQuant to 1.7.16",
            "Upgrade TMT-Integrator to 3.2.0",
            "Various minor bug fixes and improvements",
        ],
    ),
    (
        "16.0",
        &[
            "Require MSFragger 3.3+",
            "Require Philosopher 4.0.0+",
            "Upgrade Crystal-C to 1.4.2",
            "Upgrade IonQuant to 1.7.5",
            "Upgrade TMT-Integrator to 3.0.0",
            "Upgrade PTMShepherd to 1.1.0",
            "Upgrade batmass-io to 1.23.4",
            "Add Percolator as an alternative to PeptideProphet",
            "Change how files are passed to ProteinProphet, IonQuant, and EasyPQP to bypass the Windows command length limitation",
            "Various minor bug fixes and improvements",
        ],
    ),
    (
        "15.0",
        &[
            "Require MSFragger 3.2+.",
            "Upgrade IonQuant to 1.5.5.",
            "Upgrade TMT-Integrator to 2.4.0.",
            "Upgrade PTMShepherd to 1.0.0.",
            "Upgrade DIA-Umpire-SE to 2.2.1 (support mzML, mzXML, and raw formats natively)",
            "Support download MSFragger automatically.",
            "Add a button to install/upgrade EasyPQP.",
            "Remove 'process each experiment separately' checkbox.",
            "Don't allow space in the path of MSFragger and Philosopher.",
            "Follow XDG specification for Unix.",
            "Upgrade the bundled JRE to 11.",
            "Automatically detect data types for .d and .raw.",
        ],
    ),
    (
        "14.0",
        &[
            "Add PTMProphet.",
            "Upgrade Crystal-C to 1.3.2.",
            "Upgrade IonQuant to 1.4.4.",
            "Upgrade TMT-Integrator to 2.1.4.",
            "Upgrade PTM-Shepherd to 0.4.0.",
            "Require MSFragger 3.1+.",
            "Retire MsAdjuster. Using MSFragger's built-in isotope error correction module.",
            "New button to add contaminants and decoys to a fasta.",
            "Correct the path in interact-*.pep.xml file.",
            "Print related references after the job.",
        ],
    ),
    (
        "13.0",
        &[
            "Brand new fragpipe, rebuilt almost from ground up",
            "TMT-Integrator, PTM-Shepherd, IonQuant included",
            "Spectral library generation with EasyPQP",
            "Workflows for easier quick-start and sharing",
        ],
    ),
    (
        "12.2",
        &[
            "Check FASTA file for presence of decoys before running PeptideProphet or Report",
            "Fix some Philosopher workspace related bugs",
            "Spectral library generation update",
            "IMQuant is now IonQuant",
        ],
    ),
    ("12.1", &["IMQuant fixes after initial release."]),
    (
        "12.0",
        &[
            "Add IMQuant - quantitation for timsTOF.",
            "PTMShepherd updates - in-depth PTM analysis and reporting.",
            "Fix running FragPipe without an internet connection.",
            "Choice of default enzyme specifications in MSFragger config.",
        ],
    ),
    (
        "11.0",
        &[
            "Parallel execution engine. Used only for PeptideProphet now, utilizing all CPU cores.",
            "DIA-Umpire requires MSConvert from ProteoWizard on Linux.",
        ],
    ),
    (
        "10.0",
        &[
            "Add PTMShepherd with UI.",
            "Thermo RAW files and Bruker TimsTOF .d directories are supported. They do require new MSFragger with 'ext' directory for libraries and additional binaries.",
            "Fix for changes to modification tables not always being propagated to config files if the user didn't leave the editing field.",
            "Saving all the FragPipe options before run + buttons to Save/Load configurations.",
            "Fix iProphet command threads and how it's invoked when multi-experiment is enabled.",
        ],
    ),
    (
        "9.4",
        &["Fixes to MSFragger Split program for very large databases."],
    ),
    (
        "9.3",
        &[
            "Calibrate masses option in MSFragger",
            "Custom ion series option in MSFragger",
            "Turning off usage of protxml file in Filter command when ProteinProphet is not run",
            "Query user if protxml files exist while ProteinProphet is not run",
            "'Print Decoys' option/checkbox for Report command",
            "Update CrystalC-1.0.5",
            "Checkbox for generating report in mzID format",
            "UI for downloading protein databases via philosopher",
        ],
    ),
    (
        "9.1",
        &["Fix Abacus command bug with unrecognized options from Filter command being carried over."],
    ),
    (
        "9.0",
        &[
            "Downstream tab groups all downstream processing tools in one place.",
            "Simplified Config tab with more links and hint.",
            "Much improved saving and restoring of edited fields.",
            "Support MSFragger 20190222",
        ],
    ),
    (
        "8.8",
        &[
            "iProphet for peptide level reports.",
            "Moved all downstream tools (Peptide/Protein Prophet, Crystal-C) to a single tab.",
            "Simplified reports tab.",
            "Ask twice about loading defaults automatically.",
            "Removed decoy tag specification from command line fields. It's now always added implicitly.",
        ],
    ),
    (
        "8.7",
        &["Support for new Philosopher 20181119, Report Abacus --protein flag."],
    ),
    (
        "8.6",
        &[
            "Updated nonspecific search default options.",
            "Colorized console output.",
            "Multiple UI fixes and updates.",
        ],
    ),
    (
        "8.5",
        &[
            "Updated spectral library generation. LCMS files are copied and deleted from the right locations.",
            "Multi-experiment protein level report.",
            "Multi-experiment quantitation",
            "Allow separate processing of input files one-by-one.",
        ],
    ),
    ("8.4", &["Combined protein report for multiple file groups."]),
    (
        "8.3",
        &[
            "LCMS files can be processed in separate groups.",
            "Python detection on Windows via registry.",
            "Python binary location can be specified manually.",
        ],
    ),
    (
        "8.1",
        &["DIA-Umpire SE added as an optional component. Mark the checkbox on Config panel to enable."],
    ),
    (
        "8.0",
        &["Added MSAdjuster, Crystal-C. Both packaged with the release, no extra downloads."],
    ),
    (
        "7.2",
        &["Added database slicing via a python script (Requires Python 3, NumPy, Pandas)."],
    ),
    ("7.1", &["Added label free quantitation."]),
    (
        "7.0",
        &[
            "MFFragger-GUI is now calledFragPipe.",
            "Clear out Fragger modification tables when loading new parameter files to avoid ghost entries.",
            "Update the github urls for checking new versions.",
        ],
    ),
    (
        "6.0.1",
        &[
            "Allow loading of empty-valued parameters from fragger *.properties files.",
            "Comments in fragger.properties won't overwrite non-commented properties anymore.",
        ],
    ),
    (
        "6.0",
        &[
            "Automatic updates for MSFragger",
            "mass_offsets parameter for MSFragger",
            "Lower default number of fragments required in Closed search to 4",
            "Improved tooltips in MSFragger tab",
            "Initial defaults are loaded for Closed search now instead of Open",
        ],
    ),
    (
        "5.4",
        &[
            "Restore last location of MSfragger params file save/load operation.",
            "Show errors from loading msfragger.params files",
        ],
    ),
    (
        "5.3",
        &[
            "Button for auto-detection of decoy prefixes",
            "When sequence DB changes, display the number of proteins.",
            "Auto-detect buggy cached --clevel option and change it to -2.",
        ],
    ),
    (
        "5.2",
        &["Revert PeptideProphet --clevel option default to '-2' for Open Searching."],
    ),
    ("5.1", &["Bug fixes for cross-tool decoy tag updates."]),
    (
        "5.0",
        &[
            "Separate tab for sequence database.",
            "Display info about known compatibility of newer versions of Philosopher.",
        ],
    ),
    (
        "4.9",
        &[
            "Stop execution of the pipeline if one of the processes returns non-zero exit code.",
            "Colorize console output a bit, red color for errors.",
            "Button that redirects to the issue tracker online for bug reporting.",
        ],
    ),
    (
        "4.8",
        &[
            "Introduce notifications about update contents",
            "User-message can now be shown without a newer version available",
            "Added export button and context menu item to the console to simplify bug reporting by users.",
        ],
    ),
    ("4.7", &["Support new packaging of MSFragger jar with onejar."]),
    ("4.6", &["Fix mixed up order of philosopher calls."]),
    (
        "4.5",
        &[
            "Show parsed versions of tools in the UI.",
            "Print detected versions of tools to console before each run.",
        ],
    ),
    (
        "4.4",
        &["Only run Philosopher workspace --clean/--init once per analysis."],
    ),
    (
        "4.3",
        &[
            "Locale dependency fix for MSfragger parameters panel.",
            "Philosopher checks version comparing to GitHub at startup.",
        ],
    ),
    (
        "4.2",
        &["Fix the issue that Fragger panel constructor could cause IOException and prevent the whole app from loading."],
    ),
    (
        "4.1",
        &[
            "Variable mod site definition warning text if cached from older versions.",
            "Java 9 warning for Fragger.",
            "Non-symmetric precursor mass tolerance and detection of \"[*\" for var mods.",
            "Cache fragger params after a dry-run or a real run.",
        ],
    ),
    (
        "4.0",
        &[
            "Added version check for MSFragger-GUI itself, comparing to GitHub.",
            "Two way sync of decoy/tag prefix used by PeptideProphet and Philosopher Report.",
            "Fix how msfragger jar is auto-found.",
            "Added version to msfragger properties.",
            "MSFragger version check.",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(versions: &[&str]) -> ChangelogRegistry {
        let mut registry = ChangelogRegistry::new();
        for v in versions {
            registry
                .record(v, [format!("notes for {}", v)])
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_record_rejects_duplicate() {
        let mut registry = registry_with(&["1.0"]);
        let err = registry.record("1.0", ["again"]).unwrap_err();
        assert!(err.to_string().contains("1.0"));
    }

    #[test]
    fn test_record_rejects_equivalent_version() {
        let mut registry = registry_with(&["1.2"]);
        assert!(registry.record("1.2.0", ["same"]).is_err());
    }

    #[test]
    fn test_entries_descending() {
        let registry = registry_with(&["1.0", "10.0", "9.1", "2.0"]);
        let versions: Vec<String> = registry
            .entries_descending()
            .into_iter()
            .map(|e| e.version)
            .collect();
        assert_eq!(versions, vec!["10.0", "9.1", "2.0", "1.0"]);
    }

    #[test]
    fn test_changes_since_truncates_to_newest() {
        let registry = registry_with(&[
            "1.0", "2.0", "3.0", "4.0", "5.0", "6.0", "7.0", "8.0", "9.0", "10.0",
        ]);
        let entries = registry.changes_since("0.1", 2);
        let versions: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["10.0", "9.0"]);
    }

    #[test]
    fn test_changes_since_is_strict() {
        let registry = registry_with(&["1.0", "2.0", "3.0"]);
        let entries = registry.changes_since("2.0", 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "3.0");
    }

    #[test]
    fn test_changes_since_unlimited() {
        let registry = registry_with(&["1.0", "2.0", "3.0"]);
        assert_eq!(registry.changes_since("0", 0).len(), 3);
        assert!(registry.changes_since("3.0", 0).is_empty());
    }

    #[test]
    fn test_updates_since() {
        let updates = ChangelogRegistry::updates_since("3.1,3.5,4.9,5.2", "4.0");
        assert_eq!(updates, vec!["4.9", "5.2"]);
    }

    #[test]
    fn test_updates_since_trims_and_discards() {
        let updates = ChangelogRegistry::updates_since(" 5.0 , , junk,4.7,  6.1 ", "4.8");
        assert_eq!(updates, vec!["5.0", "6.1"]);
    }

    #[test]
    fn test_updates_since_empty_list() {
        assert!(ChangelogRegistry::updates_since("", "1.0").is_empty());
        assert!(ChangelogRegistry::updates_since("   ", "1.0").is_empty());
    }

    #[test]
    fn test_builtin_changelog_is_ordered() {
        let changelog = builtin_changelog();
        assert!(!changelog.is_empty());
        let entries = changelog.entries_descending();
        assert_eq!(entries[0].version, "17.0");
        assert_eq!(entries.last().map(|e| e.version.as_str()), Some("4.0"));
        assert!(changelog.notes("6.0.1").is_some());
    }

    #[test]
    fn test_builtin_changes_since() {
        let entries = builtin_changelog().changes_since("12.2", 0);
        let versions: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["17.0", "16.0", "15.0", "14.0", "13.0"]);
    }
}
