//! Total ordering over free-form version strings
//!
//! Versions are split into segments on any non-alphanumeric character and
//! on every digit/letter boundary, so "17.1-build5" becomes
//! `[17, 1, build, 5]`. Segments are compared pairwise:
//! - two numeric segments compare by value (leading zeros ignored)
//! - a numeric segment sorts before an alphabetic one ("9" < "9a")
//! - alphabetic segments compare case-insensitively
//!
//! A missing segment behaves like a numeric zero, which keeps
//! "1.2" < "1.2.1" while treating "1.2" and "1.2.0" as the same version.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Marker that identifies development builds
const DEV_BUILD_MARKER: &str = "build";

/// One comparable piece of a version string
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    /// Digits only, leading zeros stripped
    Numeric(&'a str),
    /// Letters only
    Alpha(&'a str),
}

impl Segment<'_> {
    fn cmp_segment(&self, other: &Segment<'_>) -> Ordering {
        match (self, other) {
            (Segment::Numeric(a), Segment::Numeric(b)) => compare_digits(a, b),
            (Segment::Numeric(_), Segment::Alpha(_)) => Ordering::Less,
            (Segment::Alpha(_), Segment::Numeric(_)) => Ordering::Greater,
            (Segment::Alpha(a), Segment::Alpha(b)) => compare_alpha(a, b),
        }
    }
}

/// Compare two digit strings numerically without overflowing
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_alpha(a: &str, b: &str) -> Ordering {
    let a = a.chars().flat_map(char::to_lowercase);
    let b = b.chars().flat_map(char::to_lowercase);
    a.cmp(b)
}

/// Strip a leading `v` when it is directly followed by a digit
fn strip_v_prefix(s: &str) -> &str {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some('v' | 'V'), Some(c)) if c.is_ascii_digit() => &s[1..],
        _ => s,
    }
}

fn segments(version: &str) -> Vec<Segment<'_>> {
    let version = strip_v_prefix(version.trim());
    let mut out = Vec::new();

    for chunk in version.split(|c: char| !c.is_alphanumeric()) {
        let mut start = 0;
        let mut prev_digit: Option<bool> = None;
        for (idx, c) in chunk.char_indices() {
            let is_digit = c.is_ascii_digit();
            if let Some(prev) = prev_digit {
                if prev != is_digit {
                    out.push(make_segment(&chunk[start..idx], prev));
                    start = idx;
                }
            }
            prev_digit = Some(is_digit);
        }
        if let Some(prev) = prev_digit {
            out.push(make_segment(&chunk[start..], prev));
        }
    }

    out
}

fn make_segment(piece: &str, numeric: bool) -> Segment<'_> {
    if numeric {
        let trimmed = piece.trim_start_matches('0');
        Segment::Numeric(if trimmed.is_empty() { "0" } else { trimmed })
    } else {
        Segment::Alpha(piece)
    }
}

const ZERO: Segment<'static> = Segment::Numeric("0");

/// Compare two version strings
///
/// This is a total order: reflexive, antisymmetric and transitive for any
/// input, including strings that mix numbers and letters.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = segments(a);
    let parts_b = segments(b);
    let len = parts_a.len().max(parts_b.len());

    for i in 0..len {
        let pa = parts_a.get(i).unwrap_or(&ZERO);
        let pb = parts_b.get(i).unwrap_or(&ZERO);
        match pa.cmp_segment(pb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Whether the version denotes a development build rather than a release
pub fn is_dev_build(version: &str) -> bool {
    version.to_lowercase().contains(DEV_BUILD_MARKER)
}

/// Whether `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(current, candidate) == Ordering::Less
}

/// A version string ordered by [`compare_versions`]
///
/// Equality follows the ordering, so "1.2" and "1.2.0" are equal values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Wrap a version string without validation
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Parse a user-supplied token, rejecting strings that cannot be a version
    ///
    /// A version must contain at least one digit and consist only of
    /// alphanumerics and the separators `.`, `-`, `_`, `+`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() || !token.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        if !token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
        {
            return None;
        }
        Some(Self(token.to_string()))
    }

    /// The original text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a development build
    pub fn is_dev_build(&self) -> bool {
        is_dev_build(&self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
