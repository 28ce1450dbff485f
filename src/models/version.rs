//! Dotted version numbers ("13", "15.0", "5.9.2").
//!
//! Components compare numerically and missing trailing components count as
//! zero, so `"9.0" < "17.0"` and `"15" == "15.0"`.

use crate::Error;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed dotted version.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    components: Vec<u64>,
}

impl DottedVersion {
    /// Parses a version string, returning `None` when it is not dotted numeric.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { components })
    }

    /// Returns the numeric components.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Returns true if `self <= other`.
    #[must_use]
    pub fn is_at_most(&self, other: &Self) -> bool {
        self.cmp(other) != Ordering::Greater
    }
}

/// Compares two version strings for the `version_le` SQL function.
///
/// Falls back to plain string comparison when either side is not a dotted
/// numeric version.
#[must_use]
pub fn version_at_most(recorded: &str, requested: &str) -> bool {
    match (DottedVersion::parse(recorded), DottedVersion::parse(requested)) {
        (Some(a), Some(b)) => a.is_at_most(&b),
        _ => recorded <= requested,
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {},
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl FromStr for DottedVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "version '{s}' must be dotted numbers such as 15.0 or 5.9"
            ))
        })
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v(s: &str) -> DottedVersion {
        DottedVersion::parse(s).unwrap()
    }

    #[test_case("9.0", "17.0", Ordering::Less; "single digit major below double digit")]
    #[test_case("17.0", "15.0", Ordering::Greater; "newer major")]
    #[test_case("15", "15.0", Ordering::Equal; "missing minor counts as zero")]
    #[test_case("5.10", "5.9", Ordering::Greater; "numeric minor")]
    #[test_case("13.0.1", "13.0", Ordering::Greater; "patch above release")]
    fn test_ordering(a: &str, b: &str, expected: Ordering) {
        assert_eq!(v(a).cmp(&v(b)), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("15."; "trailing dot")]
    #[test_case("v15"; "prefix")]
    #[test_case("15.0-beta"; "suffix")]
    #[test_case("1..2"; "empty component")]
    fn test_rejects(input: &str) {
        assert!(DottedVersion::parse(input).is_none());
        assert!(input.parse::<DottedVersion>().is_err());
    }

    #[test]
    fn test_version_at_most() {
        assert!(version_at_most("13.0", "15.0"));
        assert!(version_at_most("15.0", "15"));
        assert!(!version_at_most("17.0", "15.0"));
        assert!(version_at_most("9.0", "17.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(v(" 5.9 ").to_string(), "5.9");
    }
}
