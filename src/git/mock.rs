use crate::error::{ReleaseError, Result};
use crate::git::{ReachableTag, Repository};

/// Mock repository for testing without actual git operations
pub struct MockRepository {
    head: Option<String>,
    tags: Vec<ReachableTag>,
    dirty: bool,
}

impl MockRepository {
    /// Create a new mock repository with no commits
    pub fn new() -> Self {
        MockRepository {
            head: None,
            tags: Vec::new(),
            dirty: false,
        }
    }

    /// Set the commit at HEAD
    pub fn set_head(&mut self, commit: impl Into<String>) {
        self.head = Some(commit.into());
    }

    /// Add a tag `distance` commits behind HEAD
    pub fn add_tag(&mut self, name: impl Into<String>, commit: impl Into<String>, distance: u32) {
        self.tags.push(ReachableTag {
            name: name.into(),
            commit: commit.into(),
            distance,
        });
    }

    /// Mark the working tree as modified
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn head_commit(&self) -> Result<String> {
        self.head.clone().ok_or_else(|| ReleaseError::NoBaseTag {
            head: "HEAD (no commits)".to_string(),
        })
    }

    fn reachable_tags(&self) -> Result<Vec<ReachableTag>> {
        let mut tags = self.tags.clone();
        tags.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));
        Ok(tags)
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(self.dirty)
    }
}
