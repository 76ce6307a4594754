use crate::error::{ReleaseError, Result};
use crate::git::ReachableTag;
use git2::{ErrorCode, Oid, Repository as Git2Repo, StatusOptions};
use std::path::Path;
use tracing::debug;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    ///
    /// # Returns
    /// * `Ok(Git2Repository)` - Repository found at or above `path`
    /// * `Err(VcsUnavailable)` - If `path` is not inside a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repo::discover(path).map_err(|e| ReleaseError::VcsUnavailable {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn head_oid(&self) -> Result<Oid> {
        match self.repo.head() {
            Ok(head) => Ok(head.peel_to_commit()?.id()),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Err(ReleaseError::NoBaseTag {
                    head: "HEAD (no commits)".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a tag reference to the commit it ultimately points at.
    /// Tags on trees or blobs yield None.
    fn tag_commit(&self, tag_name: &str) -> Option<Oid> {
        let reference = self
            .repo
            .find_reference(&format!("refs/tags/{}", tag_name))
            .ok()?;
        reference.peel_to_commit().ok().map(|c| c.id())
    }
}

impl super::Repository for Git2Repository {
    fn head_commit(&self) -> Result<String> {
        Ok(self.head_oid()?.to_string())
    }

    fn reachable_tags(&self) -> Result<Vec<ReachableTag>> {
        let head = self.head_oid()?;
        let names = self.repo.tag_names(None)?;

        let mut tags = Vec::new();
        for name in names.iter().flatten() {
            let Some(tag_oid) = self.tag_commit(name) else {
                debug!(tag = name, "skipping tag that does not point at a commit");
                continue;
            };

            let distance = if tag_oid == head {
                0
            } else if self.repo.graph_descendant_of(head, tag_oid)? {
                let (ahead, _behind) = self.repo.graph_ahead_behind(head, tag_oid)?;
                commit_distance(name, ahead)?
            } else {
                continue;
            };

            tags.push(ReachableTag {
                name: name.to_string(),
                commit: tag_oid.to_string(),
                distance,
            });
        }

        tags.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));
        Ok(tags)
    }

    fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| !entry.status().is_empty() && !entry.status().is_ignored()))
    }
}

/// Commits from a tag to HEAD as a tag distance
fn commit_distance(tag: &str, ahead: usize) -> Result<u32> {
    u32::try_from(ahead)
        .map_err(|_| ReleaseError::version(format!("{} is {} commits behind HEAD", tag, ahead)))
}
