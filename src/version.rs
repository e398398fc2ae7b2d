//! Dotted-numeric runtime versions.
//!
//! Ordering is component-wise with missing trailing components read as zero,
//! so `4.1`, `4.1.0` and `4.1.0.0` all compare equal. Equality follows the
//! ordering rather than the literal component list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{invalid_version, ProvisionError, Result};

/// A parsed version such as `4.1` or `4.2.3`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    /// Parse a dotted-numeric string. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid_version(input, "version is empty"));
        }

        let mut components = Vec::new();
        for part in trimmed.split('.') {
            if part.is_empty() {
                return Err(invalid_version(input, "empty component"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid_version(
                    input,
                    format!("component '{}' is not numeric", part),
                ));
            }
            let value = part.parse::<u64>().map_err(|_| {
                invalid_version(input, format!("component '{}' is out of range", part))
            })?;
            components.push(value);
        }

        Ok(Self { components })
    }

    /// Parse an optional version. `None` means "no preference" and stays
    /// `None`; a blank string is still an error.
    pub fn parse_optional(input: Option<&str>) -> Result<Option<Self>> {
        input.map(Self::parse).transpose()
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

/// Compare two versions, zero-padding the shorter one.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    let len = a.components.len().max(b.components.len());
    (0..len)
        .map(|i| {
            let left = a.components.get(i).copied().unwrap_or(0);
            let right = b.components.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_components() {
        assert_eq!(v("4.1").components(), &[4, 1]);
        assert_eq!(v(" 4.2.3 ").components(), &[4, 2, 3]);
        assert_eq!(v("10").components(), &[10]);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in ["", "   ", "4.x", "v4.1", "4..1", "4.1.", ".4", "4-1", "4.1 beta"] {
            let err = Version::parse(bad).unwrap_err();
            assert!(
                matches!(err, ProvisionError::InvalidVersion { .. }),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflowing_component() {
        assert!(Version::parse("99999999999999999999999.1").is_err());
    }

    #[test]
    fn test_trailing_zeros_compare_equal() {
        assert_eq!(compare(&v("4.1"), &v("4.1.0")), Ordering::Equal);
        assert_eq!(v("4.1"), v("4.1.0.0"));
        assert_eq!(v("4"), v("4.0"));
    }

    #[test]
    fn test_component_wise_ordering() {
        assert!(v("4.1") < v("4.1.1"));
        assert!(v("4.1.1") < v("4.2"));
        assert!(v("4.9") < v("4.10"));
        assert!(v("3.6.3") < v("4"));
        assert_eq!(compare(&v("4.2"), &v("4.1.9")), Ordering::Greater);
    }

    #[test]
    fn test_ordering_is_consistent_when_sorted() {
        let mut versions = vec![v("4.2"), v("3.6"), v("4.1.0"), v("4.1.1"), v("4.1")];
        versions.sort();
        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["3.6", "4.1.0", "4.1", "4.1.1", "4.2"]);
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(Version::parse_optional(None).unwrap(), None);
        assert_eq!(Version::parse_optional(Some("4.1")).unwrap(), Some(v("4.1")));
        assert!(Version::parse_optional(Some("")).is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let parsed: Version = "4.2.1".parse().unwrap();
        assert_eq!(parsed.to_string(), "4.2.1");
    }
}
