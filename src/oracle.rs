//! Version derivation from repository history
//!
//! The nearest reachable version tag is the base. HEAD on that tag with a
//! clean tree is the release itself; anything else becomes a development
//! build that embeds the distance and a commit fingerprint.

use crate::domain::{DerivedVersion, DevFormat, TagPattern, VersionTag};
use crate::error::{ReleaseError, Result};
use crate::git::{HistorySnapshot, Repository};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Derives versions from a repository
pub struct VersionOracle<R: Repository> {
    repo: R,
    pattern: TagPattern,
    format: DevFormat,
}

impl<R: Repository> VersionOracle<R> {
    pub fn new(repo: R, pattern: TagPattern, format: DevFormat) -> Self {
        VersionOracle {
            repo,
            pattern,
            format,
        }
    }

    /// Take a history snapshot and derive the version from it
    pub fn derive(&self) -> Result<DerivedVersion> {
        let snapshot = self.repo.snapshot()?;
        derive_from_snapshot(&snapshot, &self.pattern, &self.format)
    }

    pub fn snapshot(&self) -> Result<HistorySnapshot> {
        self.repo.snapshot()
    }

    pub fn pattern(&self) -> &TagPattern {
        &self.pattern
    }

    pub fn format(&self) -> &DevFormat {
        &self.format
    }
}

/// True when the version must not go to a stable channel
pub fn is_prerelease(version: &DerivedVersion) -> bool {
    version.distance > 0 || version.dirty || version.prerelease_label.is_some()
}

/// Reachable tags that do not match the tag pattern
pub fn ignored_tags(snapshot: &HistorySnapshot, pattern: &TagPattern) -> Vec<String> {
    snapshot
        .tags
        .iter()
        .filter(|t| !pattern.matches(&t.name))
        .map(|t| t.name.clone())
        .collect()
}

/// Derive a version from an already collected snapshot
///
/// The nearest version tag wins. When several commits sit at that same
/// distance (a merge of release lines) the highest version wins. Two tags
/// on one commit with different versions are rejected as ambiguous.
pub fn derive_from_snapshot(
    snapshot: &HistorySnapshot,
    pattern: &TagPattern,
    format: &DevFormat,
) -> Result<DerivedVersion> {
    let mut candidates: Vec<(u32, VersionTag)> = Vec::new();
    for tag in &snapshot.tags {
        match pattern.version_tag(&tag.name, &tag.commit) {
            Some(version_tag) => candidates.push((tag.distance, version_tag)),
            None => debug!(tag = %tag.name, "ignoring tag that is not a version"),
        }
    }

    let nearest = candidates
        .iter()
        .map(|(distance, _)| *distance)
        .min()
        .ok_or_else(|| ReleaseError::NoBaseTag {
            head: snapshot.head.clone(),
        })?;

    let mut by_commit: BTreeMap<&str, Vec<&VersionTag>> = BTreeMap::new();
    for (_, tag) in candidates.iter().filter(|(d, _)| *d == nearest) {
        by_commit.entry(tag.commit.as_str()).or_default().push(tag);
    }

    for (commit, tags) in &by_commit {
        let first = &tags[0].version;
        if tags.iter().any(|t| &t.version != first) {
            let mut names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
            names.sort();
            return Err(ReleaseError::AmbiguousTag {
                commit: commit.to_string(),
                tags: names,
            });
        }
    }

    let base = by_commit
        .values()
        .map(|tags| tags[0])
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| ReleaseError::NoBaseTag {
            head: snapshot.head.clone(),
        })?;

    info!(
        tag = %base.name,
        distance = nearest,
        dirty = snapshot.dirty,
        "selected base tag"
    );

    Ok(
        DerivedVersion::new(base.version.clone(), nearest, snapshot.dirty, snapshot.head.clone())
            .with_format(format.clone()),
    )
}
