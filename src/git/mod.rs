//! Version-control query abstraction
//!
//! Version derivation needs three facts from history: the commit at HEAD,
//! the tags reachable from it with their commit distance, and whether the
//! working tree has uncommitted changes. The [Repository] trait exposes
//! exactly those, so the oracle can run against:
//!
//! - [repository::Git2Repository]: a real repository opened with `git2`
//! - [mock::MockRepository]: a scripted history for tests
//!
//! Callers take one [HistorySnapshot] and pass it to pure functions
//! instead of querying git repeatedly.

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// A tag reachable from HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableTag {
    /// Tag name as stored under refs/tags
    pub name: String,
    /// Full id of the commit the tag points at
    pub commit: String,
    /// Commits reachable from HEAD but not from the tagged commit
    pub distance: u32,
}

/// Immutable view of the history facts used for version derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub head: String,
    pub tags: Vec<ReachableTag>,
    pub dirty: bool,
}

/// Version-control query interface
pub trait Repository {
    /// Full id of the commit at HEAD
    ///
    /// # Returns
    /// * `Ok(String)` - Hex commit id
    /// * `Err(NoBaseTag)` - If HEAD has no commits yet
    fn head_commit(&self) -> Result<String>;

    /// All tags whose commit is HEAD or an ancestor of HEAD
    ///
    /// Ordered by distance, then by name. Tags that are not reachable
    /// (other branches, future commits) are omitted.
    fn reachable_tags(&self) -> Result<Vec<ReachableTag>>;

    /// Whether tracked files differ from HEAD (untracked files are ignored)
    fn is_dirty(&self) -> Result<bool>;

    /// Collect head, tags and cleanliness in one go
    fn snapshot(&self) -> Result<HistorySnapshot> {
        Ok(HistorySnapshot {
            head: self.head_commit()?,
            tags: self.reachable_tags()?,
            dirty: self.is_dirty()?,
        })
    }
}
