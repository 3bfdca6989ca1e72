//! Dotted version strings and their ordering.
//!
//! Versions compare segment by segment as unsigned integers, left to right.
//! The shorter version is padded with zeros, so `1.2.0` and `1.2` are equal.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version of this kernel, compared against the schema version stored in
/// the `version` config key.
pub const MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A dotted numeric version.
///
/// Trailing zero segments are dropped on parse, which keeps the derived
/// `Eq`/`Ord` consistent with zero-padded comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a dotted version.
    ///
    /// Each segment contributes its leading digits; a segment with no
    /// leading digits (`"rc1"`, `""`) counts as zero. Parsing never fails.
    pub fn parse(raw: &str) -> Self {
        let mut segments: Vec<u64> = raw.trim().split('.').map(parse_segment).collect();
        while segments.last() == Some(&0) {
            segments.pop();
        }
        Self { segments }
    }

    /// Normalised segments (no trailing zeros).
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

fn parse_segment(segment: &str) -> u64 {
    let digits: String = segment
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    // Overlong segments saturate rather than wrap.
    digits.parse().unwrap_or(if digits.is_empty() { 0 } else { u64::MAX })
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("0");
        }
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Compare two dotted version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_are_ignored() {
        assert_eq!(compare_versions("1.2.0", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.0.0"), Ordering::Equal);
        assert_eq!(Version::parse("1.2.0"), Version::parse("1.2"));
    }

    #[test]
    fn first_differing_segment_decides() {
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.4", "1.5"), Ordering::Less);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("0.9.1", "0.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.1", "1.1"), Ordering::Less);
    }

    #[test]
    fn ordering_is_transitive() {
        let mut versions: Vec<Version> = ["1.10", "1.2", "0.9.9", "1.2.0.1", "1.9"]
            .iter()
            .map(|v| Version::parse(v))
            .collect();
        versions.sort();
        let rendered: Vec<String> = versions.iter().map(Version::to_string).collect();
        assert_eq!(rendered, ["0.9.9", "1.2", "1.2.0.1", "1.9", "1.10"]);
    }

    #[test]
    fn non_numeric_segments_count_as_zero() {
        assert_eq!(compare_versions("1.2.rc1", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.3-beta", "1.2.3"), Ordering::Equal);
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
    }

    #[test]
    fn display_renders_normalised_form() {
        assert_eq!(Version::parse("0.6.0").to_string(), "0.6");
        assert_eq!(Version::parse("0").to_string(), "0");
        assert_eq!("2.1".parse::<Version>().unwrap().segments(), &[2, 1]);
    }
}
