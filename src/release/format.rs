//! Version formatting: turns raw reference names into display versions.

use regex::Regex;

/// Default match pattern: a `v` followed by a dotted number.
pub const DEFAULT_MATCH: &str = "v([0-9.]+)";
/// Default replacement: the first capture group, i.e. the version without its `v`.
pub const DEFAULT_REPLACE: &str = "${1}";

/// Regex-based rewrite of a reference name.
///
/// Formatting is cosmetic only. A reference the pattern does not match is
/// returned unchanged; it is never rejected.
#[derive(Debug, Clone)]
pub struct Formatter {
    pattern: Regex,
    replace: String,
}

impl Formatter {
    /// Compiles a formatter from a match pattern and a replacement template.
    ///
    /// The replacement supports capture-group references (`$1`, `${1}`, `${name}`).
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(pattern: &str, replace: &str) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, replace: replace.to_string() })
    }

    /// Formats a raw reference name. Every match of the pattern is replaced.
    #[must_use]
    pub fn format(&self, reference: &str) -> String {
        self.pattern.replace_all(reference, self.replace.as_str()).into_owned()
    }

    /// Returns `true` if the pattern matches somewhere in `reference`.
    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.pattern.is_match(reference)
    }

    /// The match pattern as written in the configuration.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The replacement template.
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replace
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self { pattern: Regex::new(DEFAULT_MATCH).expect("default pattern compiles"), replace: DEFAULT_REPLACE.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strips_leading_v() {
        let formatter = Formatter::default();
        assert_eq!(formatter.format("v1.2.3"), "1.2.3");
    }

    #[test]
    fn unmatched_reference_is_unchanged() {
        let formatter = Formatter::default();
        assert!(!formatter.matches("nightly"));
        assert_eq!(formatter.format("nightly"), "nightly");
    }

    #[test]
    fn named_groups_are_substituted() {
        let formatter =
            Formatter::new(r"^release-(?P<major>\d+)\.(?P<minor>\d+)$", "${major}.${minor}.0")
                .unwrap();
        assert_eq!(formatter.format("release-4.11"), "4.11.0");
    }

    #[test]
    fn surrounding_text_is_kept() {
        let formatter = Formatter::default();
        assert_eq!(formatter.format("cf-v21.0"), "cf-21.0");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(Formatter::new("v([0-9", "$1").is_err());
    }
}
