use crate::domain::version::SemanticVersion;
use crate::error::{ReleaseError, Result};
use regex::Regex;

/// A tag recognised as a release version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    pub name: String,
    pub commit: String,
    pub version: SemanticVersion,
}

/// Tag naming pattern (e.g., "v{version}", "release-{version}")
#[derive(Debug, Clone)]
pub struct TagPattern {
    pub pattern: String,
    regex: Regex,
}

const VERSION_REGEX: &str = r"(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)";

impl TagPattern {
    /// Create a new tag pattern
    ///
    /// A pattern starting with a lowercase `v` also accepts `V` and the bare
    /// version, so "v{version}" matches "v1.2.3", "V1.2.3" and "1.2.3".
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{version}") {
            return Err(ReleaseError::config(
                "Tag pattern must contain {version} placeholder",
            ));
        }

        let escaped = regex::escape(&pattern).replace(r"\{version\}", VERSION_REGEX);
        let escaped = match escaped.strip_prefix('v') {
            Some(rest) => format!("[vV]?{}", rest),
            None => escaped,
        };

        let regex = Regex::new(&format!("^{}$", escaped))
            .map_err(|e| ReleaseError::config(format!("Invalid tag pattern '{}': {}", pattern, e)))?;

        Ok(TagPattern { pattern, regex })
    }

    /// The pattern as configured, e.g. "v{version}"
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Format a version according to pattern
    /// Example: pattern="v{version}", version="1.2.3" -> "v1.2.3"
    pub fn format(&self, version: &str) -> String {
        self.pattern.replace("{version}", version)
    }

    /// Extract the semantic version from a tag name, if the tag matches
    pub fn parse(&self, tag: &str) -> Option<SemanticVersion> {
        let captures = self.regex.captures(tag)?;
        SemanticVersion::parse(captures.get(1)?.as_str()).ok()
    }

    /// Validate if a tag matches this pattern
    pub fn matches(&self, tag: &str) -> bool {
        self.parse(tag).is_some()
    }

    /// Build a [VersionTag] when the tag name matches
    pub fn version_tag(&self, name: &str, commit: &str) -> Option<VersionTag> {
        self.parse(name).map(|version| VersionTag {
            name: name.to_string(),
            commit: commit.to_string(),
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_requires_placeholder() {
        assert!(TagPattern::new("release").is_err());
    }

    #[test]
    fn test_pattern_format() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert_eq!(pattern.format("1.2.3"), "v1.2.3");
    }

    #[test]
    fn test_pattern_format_with_suffix() {
        let pattern = TagPattern::new("release-{version}").unwrap();
        assert_eq!(pattern.format("1.2.3"), "release-1.2.3");
    }

    #[test]
    fn test_pattern_matches() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert!(pattern.matches("v1.2.3"));
        assert!(pattern.matches("V1.2.3"));
        assert!(pattern.matches("1.2.3"));
        assert!(!pattern.matches("release-1.2.3"));
        assert!(!pattern.matches("v1.2"));
        assert!(!pattern.matches("latest"));
    }

    #[test]
    fn test_pattern_prefix_is_literal() {
        let pattern = TagPattern::new("release-{version}").unwrap();
        assert!(pattern.matches("release-1.2.3"));
        assert!(!pattern.matches("1.2.3"));
        assert!(!pattern.matches("releaseX1.2.3"));
    }

    #[test]
    fn test_parse_prerelease_tag() {
        let pattern = TagPattern::new("v{version}").unwrap();
        let version = pattern.parse("v2.0.0-rc.1").unwrap();
        assert_eq!(version.pre.as_str(), "rc.1");
    }

    #[test]
    fn test_version_tag() {
        let pattern = TagPattern::new("v{version}").unwrap();
        let tag = pattern.version_tag("v1.4.0", "c1").unwrap();
        assert_eq!(tag.version, SemanticVersion::new(1, 4, 0));
        assert_eq!(tag.commit, "c1");
        assert!(pattern.version_tag("nightly", "c1").is_none());
    }
}
