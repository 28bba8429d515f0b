//! Version parsing and the playback compatibility gate.
//!
//! A log records the version string of the build that produced it.
//! Playback accepts the log when the string matches the running build
//! exactly, or when the variant, major, and minor components match and
//! the recorded patch number is no newer than the running one — older
//! same-minor builds never change replay semantics, newer ones might.

use std::fmt;

/// Placeholder token in a version pattern, standing for the patch digits.
const PATCH_PLACEHOLDER: &str = "%p";

/// A build version: variant identifier plus major.minor.patch triplet.
///
/// Rendered and parsed as `"<variant> <major>.<minor>.<patch>"`, with
/// the variant omitted when empty (`"1.9.3"`).
///
/// # Examples
///
/// ```
/// use reel_session::Version;
///
/// let v = Version::parse("CE 1.9.3").unwrap();
/// assert_eq!(v.variant, "CE");
/// assert_eq!((v.major, v.minor, v.patch), (1, 9, 3));
/// assert_eq!(v.to_string(), "CE 1.9.3");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    /// Variant identifier, possibly empty.
    pub variant: String,
    /// Major component.
    pub major: u16,
    /// Minor component.
    pub minor: u16,
    /// Patch component.
    pub patch: u16,
}

/// How a stored version relates to the running build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionCompat {
    /// The strings match exactly; playback runs under full semantics.
    Exact,
    /// Same variant, major, and minor; the recorded patch is older.
    /// Playback runs under compatible semantics.
    Patch {
        /// Patch number the log was recorded with.
        recorded: u16,
    },
}

impl Version {
    /// Parse a version string, `None` if it does not have the
    /// `[variant ]major.minor.patch` shape.
    pub fn parse(s: &str) -> Option<Self> {
        let (variant, triplet) = match s.rsplit_once(' ') {
            Some((variant, triplet)) => (variant, triplet),
            None => ("", s),
        };
        if variant.contains(' ') {
            return None;
        }

        let mut parts = triplet.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            variant: variant.to_string(),
            major,
            minor,
            patch,
        })
    }

    /// This version's pattern with the patch digits replaced by the
    /// placeholder: `"CE 1.9.%p"`.
    fn patch_pattern(&self) -> String {
        if self.variant.is_empty() {
            format!("{}.{}.{PATCH_PLACEHOLDER}", self.major, self.minor)
        } else {
            format!(
                "{} {}.{}.{PATCH_PLACEHOLDER}",
                self.variant, self.major, self.minor
            )
        }
    }

    /// Gate a stored version string against this running build.
    ///
    /// `None` means the log must be rejected before any event is read.
    pub fn compat_with(&self, stored: &str) -> Option<VersionCompat> {
        if stored == self.to_string() {
            return Some(VersionCompat::Exact);
        }
        let recorded = match_placeholder(stored, &self.patch_pattern())?;
        (recorded <= self.patch).then_some(VersionCompat::Patch { recorded })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.variant.is_empty() {
            write!(f, "{} ", self.variant)?;
        }
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Match `stored` against a pattern containing a single `%p`
/// placeholder, returning the digits the placeholder matched.
///
/// The literal text around the placeholder must match exactly and the
/// placeholder must cover one or more ASCII digits.
fn match_placeholder(stored: &str, pattern: &str) -> Option<u16> {
    let (prefix, suffix) = pattern.split_once(PATCH_PLACEHOLDER)?;
    let rest = stored.strip_prefix(prefix)?;
    let digits = rest.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Version {
        Version::parse("CE 1.9.3").unwrap()
    }

    #[test]
    fn parse_with_and_without_variant() {
        let v = Version::parse("CE 1.9.3").unwrap();
        assert_eq!(v.variant, "CE");
        let v = Version::parse("1.9.3").unwrap();
        assert_eq!(v.variant, "");
        assert_eq!(v.to_string(), "1.9.3");
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for s in ["", "1.9", "1.9.3.4", "CE one.9.3", "CE CE 1.9.3", "v 1..3"] {
            assert_eq!(Version::parse(s), None, "{s:?} should not parse");
        }
    }

    #[test]
    fn exact_match_is_full_semantics() {
        assert_eq!(current().compat_with("CE 1.9.3"), Some(VersionCompat::Exact));
    }

    #[test]
    fn older_patch_is_compatible() {
        assert_eq!(
            current().compat_with("CE 1.9.0"),
            Some(VersionCompat::Patch { recorded: 0 })
        );
        assert_eq!(
            current().compat_with("CE 1.9.2"),
            Some(VersionCompat::Patch { recorded: 2 })
        );
    }

    #[test]
    fn newer_patch_is_rejected() {
        assert_eq!(current().compat_with("CE 1.9.4"), None);
    }

    #[test]
    fn different_minor_or_major_is_rejected() {
        assert_eq!(current().compat_with("CE 1.8.3"), None);
        assert_eq!(current().compat_with("CE 2.9.3"), None);
    }

    #[test]
    fn different_variant_is_rejected() {
        assert_eq!(current().compat_with("1.9.3"), None);
        assert_eq!(current().compat_with("XX 1.9.3"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        for s in ["", "CE", "CE 1.9.x", "CE 1.9.-1", "CE 1.9.3 beta"] {
            assert_eq!(current().compat_with(s), None, "{s:?} should be rejected");
        }
    }

    #[test]
    fn placeholder_match_requires_digits() {
        assert_eq!(match_placeholder("CE 1.9.12", "CE 1.9.%p"), Some(12));
        assert_eq!(match_placeholder("CE 1.9.", "CE 1.9.%p"), None);
        assert_eq!(match_placeholder("CE 1.9.1a", "CE 1.9.%p"), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn patch_window_accepts_exactly_older_or_equal(
                current_patch in 0u16..1000,
                recorded_patch in 0u16..1000,
            ) {
                let current = Version {
                    variant: "CE".into(),
                    major: 1,
                    minor: 9,
                    patch: current_patch,
                };
                let stored = format!("CE 1.9.{recorded_patch}");
                let compat = current.compat_with(&stored);
                if recorded_patch == current_patch {
                    prop_assert_eq!(compat, Some(VersionCompat::Exact));
                } else if recorded_patch < current_patch {
                    prop_assert_eq!(
                        compat,
                        Some(VersionCompat::Patch { recorded: recorded_patch })
                    );
                } else {
                    prop_assert_eq!(compat, None);
                }
            }
        }
    }
}
