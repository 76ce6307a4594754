//! Release notes extraction from a Markdown changelog
//!
//! A section starts at any ATX heading (`#` .. `######`) that contains a
//! semantic version and ends at the next heading of the same or a higher
//! level. Deeper headings (`### Added`) belong to the body. Lookups are
//! exact: `2.3.0` does not match `12.3.0`, `2.3.0-rc.1` or `2.3.0.dev1`.

use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// One version-headed section of a changelog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSection {
    /// The version string found in the heading
    pub version: String,
    /// Heading line without the leading hashes
    pub heading: String,
    pub level: usize,
    pub body: String,
}

fn version_token() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| {
            Regex::new(r"(?:^|[^0-9A-Za-z.+-])[vV]?(\d+\.\d+\.\d+[0-9A-Za-z.+-]*)").ok()
        })
        .as_ref()
}

/// Level and text of an ATX heading line
fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_end();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim()))
}

/// First version token in a heading, without its 'v' prefix
///
/// The whole token must be a semantic version: `2.3.0.dev1` or `2.3.0.1`
/// is not a heading for `2.3.0`.
fn heading_version(text: &str) -> Option<String> {
    let captures = version_token()?.captures(text)?;
    let token = captures.get(1)?.as_str().trim_end_matches(['.', '-']);
    SemanticVersion::parse(token).ok().map(|v| v.to_string())
}

struct OpenSection {
    version: String,
    heading: String,
    level: usize,
    lines: Vec<String>,
}

impl OpenSection {
    fn close(self) -> ChangelogSection {
        let start = self.lines.iter().position(|l| !l.trim().is_empty());
        let end = self.lines.iter().rposition(|l| !l.trim().is_empty());
        let body = match (start, end) {
            (Some(s), Some(e)) => self.lines[s..=e].join("\n"),
            _ => String::new(),
        };

        ChangelogSection {
            version: self.version,
            heading: self.heading,
            level: self.level,
            body,
        }
    }
}

/// Split a Markdown changelog into version sections, in document order
pub fn parse_changelog(text: &str) -> Vec<ChangelogSection> {
    let mut sections = Vec::new();
    let mut current: Option<OpenSection> = None;
    let mut in_fence = false;

    for line in text.lines() {
        let fence = line.trim_start().starts_with("```") || line.trim_start().starts_with("~~~");
        if fence {
            in_fence = !in_fence;
        }

        let parsed = if in_fence || fence { None } else { heading(line) };
        if let Some((level, title)) = parsed {
            let closes = current.as_ref().map_or(true, |open| level <= open.level);
            if closes {
                if let Some(open) = current.take() {
                    sections.push(open.close());
                }
                if let Some(version) = heading_version(title) {
                    current = Some(OpenSection {
                        version,
                        heading: title.to_string(),
                        level,
                        lines: Vec::new(),
                    });
                }
                continue;
            }
        }

        if let Some(open) = current.as_mut() {
            open.lines.push(line.to_string());
        }
    }

    if let Some(open) = current.take() {
        sections.push(open.close());
    }
    sections
}

/// Body of the section whose heading version equals `version`
///
/// # Returns
/// * `Ok(body)` - Verbatim section body (surrounding blank lines removed)
/// * `Err(SectionNotFound)` - No heading carries exactly this version
pub fn extract(changelog: &[ChangelogSection], version: &SemanticVersion) -> Result<String> {
    let wanted = version.to_string();
    changelog
        .iter()
        .find(|section| section.version == wanted)
        .map(|section| section.body.clone())
        .ok_or(ReleaseError::SectionNotFound { version: wanted })
}

/// Read a changelog file and extract the notes for `version`
pub fn extract_from_file(path: &Path, version: &SemanticVersion) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| {
        ReleaseError::config(format!("Cannot read changelog {}: {}", path.display(), e))
    })?;
    extract(&parse_changelog(&text), version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = "# Changelog

All notable changes to this project.

## [Unreleased]

- work in progress

## [12.3.0] - 2024-03-01

- unrelated major line

## [2.3.0] - 2024-02-01

### Added

- keyword completion for resource files
- `robotcode analyze` command

### Fixed

- crash on empty suite

```text
## 9.9.9 inside a code block
```

## v2.3.0-rc.1

- release candidate

## 2.2.0

Initial notes.
";

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_sections_in_order() {
        let sections = parse_changelog(CHANGELOG);
        let versions: Vec<&str> = sections.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["12.3.0", "2.3.0", "2.3.0-rc.1", "2.2.0"]);
        assert_eq!(sections[1].heading, "[2.3.0] - 2024-02-01");
        assert_eq!(sections[1].level, 2);
    }

    #[test]
    fn test_extract_exact_body() {
        let body = extract(&parse_changelog(CHANGELOG), &v("2.3.0")).unwrap();
        assert_eq!(
            body,
            "### Added

- keyword completion for resource files
- `robotcode analyze` command

### Fixed

- crash on empty suite

```text
## 9.9.9 inside a code block
```"
        );
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let sections = parse_changelog(CHANGELOG);
        assert_eq!(extract(&sections, &v("12.3.0")).unwrap(), "- unrelated major line");
        assert_eq!(
            extract(&sections, &v("2.3.0-rc.1")).unwrap(),
            "- release candidate"
        );
        assert!(matches!(
            extract(&sections, &v("2.3.1")),
            Err(ReleaseError::SectionNotFound { version }) if version == "2.3.1"
        ));
        assert!(extract(&sections, &v("9.9.9")).is_err());
    }

    #[test]
    fn test_longer_version_is_not_a_match() {
        let sections = parse_changelog("## 2.3.0.dev1\n- dev notes\n## 2.3.0\n- real notes\n");
        assert_eq!(extract(&sections, &v("2.3.0")).unwrap(), "- real notes");

        let sections = parse_changelog("## 1.4.0.1\n- hotfix\n## 1.4.0a1\n- alpha\n");
        assert!(sections.is_empty());
        assert!(matches!(
            extract(&sections, &v("1.4.0")),
            Err(ReleaseError::SectionNotFound { .. })
        ));
    }

    #[test]
    fn test_last_section_runs_to_end() {
        let body = extract(&parse_changelog(CHANGELOG), &v("2.2.0")).unwrap();
        assert_eq!(body, "Initial notes.");
    }

    #[test]
    fn test_empty_section_body() {
        let sections = parse_changelog("## 1.0.0\n\n## 0.9.0\n- first\n");
        assert_eq!(extract(&sections, &v("1.0.0")).unwrap(), "");
        assert_eq!(extract(&sections, &v("0.9.0")).unwrap(), "- first");
    }

    #[test]
    fn test_heading_requires_space() {
        assert_eq!(heading("## 1.0.0"), Some((2, "1.0.0")));
        assert_eq!(heading("#1.0.0"), None);
        assert_eq!(heading("####### 1.0.0"), None);
    }

    #[test]
    fn test_heading_version_boundaries() {
        assert_eq!(heading_version("[1.2.3] - 2024-01-01"), Some("1.2.3".to_string()));
        assert_eq!(heading_version("Release v1.2.3"), Some("1.2.3".to_string()));
        assert_eq!(heading_version("Version 10.0.0-beta.2"), Some("10.0.0-beta.2".to_string()));
        assert_eq!(heading_version("Unreleased"), None);
        assert_eq!(heading_version("build1.2.3"), None);
        assert_eq!(heading_version("2.3.0.dev1+gabc1234"), None);
        assert_eq!(heading_version("2.3.0.1 (hotfix)"), None);
        assert_eq!(heading_version("v1.0.0."), Some("1.0.0".to_string()));
    }

    #[test]
    fn test_extract_from_missing_file() {
        let err = extract_from_file(Path::new("/nonexistent/CHANGELOG.md"), &v("1.0.0")).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
