use crate::error::{ReleaseError, Result};
use semver::BuildMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic version representation (major.minor.patch with optional
/// prerelease and build metadata)
pub use semver::Version as SemanticVersion;

/// Parse a semantic version, tolerating a leading 'v' or 'V'
pub fn parse_semantic(input: &str) -> Result<SemanticVersion> {
    let clean = input.trim().trim_start_matches(['v', 'V']);
    SemanticVersion::parse(clean)
        .map_err(|e| ReleaseError::version(format!("Invalid version '{}': {}", input, e)))
}

/// How development versions are spelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevFormat {
    pub dev_marker: String,
    pub dirty_marker: String,
    pub fingerprint_length: usize,
}

impl Default for DevFormat {
    fn default() -> Self {
        DevFormat {
            dev_marker: "dev".to_string(),
            dirty_marker: "dirty".to_string(),
            fingerprint_length: 7,
        }
    }
}

/// A version computed from repository history
///
/// Renders as the base version exactly when HEAD is the tagged commit and
/// the working tree is clean. Anything else renders as a development build
/// (`1.0.0.dev2+gabc1234`, `1.0.0.dev0+gabc1234.dirty`) that can never
/// collide with a tagged release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVersion {
    pub base: SemanticVersion,
    pub distance: u32,
    pub dirty: bool,
    pub prerelease_label: Option<String>,
    /// Full id of the commit the version was derived at
    pub commit: String,
    pub format: DevFormat,
}

impl DerivedVersion {
    pub fn new(base: SemanticVersion, distance: u32, dirty: bool, commit: impl Into<String>) -> Self {
        let prerelease_label = if base.pre.is_empty() {
            None
        } else {
            Some(base.pre.to_string())
        };

        DerivedVersion {
            base,
            distance,
            dirty,
            prerelease_label,
            commit: commit.into(),
            format: DevFormat::default(),
        }
    }

    pub fn with_format(mut self, format: DevFormat) -> Self {
        self.format = format;
        self
    }

    /// True when this is exactly a tagged release build
    pub fn is_release(&self) -> bool {
        self.distance == 0 && !self.dirty
    }

    /// Short commit fingerprint, e.g. "gabc1234"
    pub fn fingerprint(&self) -> String {
        let short: String = self
            .commit
            .chars()
            .take(self.format.fingerprint_length)
            .collect();
        format!("g{}", short)
    }
}

impl fmt::Display for DerivedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_release() {
            return write!(f, "{}", self.base);
        }

        let mut public = self.base.clone();
        public.build = BuildMetadata::EMPTY;

        write!(
            f,
            "{}.{}{}+{}",
            public,
            self.format.dev_marker,
            self.distance,
            self.fingerprint()
        )?;
        if self.dirty {
            write!(f, ".{}", self.format.dirty_marker)?;
        }
        Ok(())
    }
}
