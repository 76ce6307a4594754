use std::fmt;

/// Non-fatal conditions noticed while running the pipeline.
/// These never change a result; they are reported to the user on stderr.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// The working tree has uncommitted changes, so the version is a dirty dev build
    DirtyWorkingTree { version: String },
    /// Reachable tags that do not match the configured tag pattern
    IgnoredTags { tags: Vec<String>, pattern: String },
    /// Every expected artifact of a cell already existed; the tool was not run
    ArtifactCacheHit { cell: String, count: usize },
    /// The matrix resolved to no cells, so nothing will be built
    EmptyMatrix,
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::DirtyWorkingTree { version } => {
                write!(
                    f,
                    "Working tree has uncommitted changes; version is {}",
                    version
                )
            }
            BoundaryWarning::IgnoredTags { tags, pattern } => {
                const SHOWN: usize = 5;
                let listed = tags.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
                if tags.len() > SHOWN {
                    write!(
                        f,
                        "Ignoring {} tag(s) not matching '{}': {} and {} more",
                        tags.len(),
                        pattern,
                        listed,
                        tags.len() - SHOWN
                    )
                } else {
                    write!(
                        f,
                        "Ignoring {} tag(s) not matching '{}': {}",
                        tags.len(),
                        pattern,
                        listed
                    )
                }
            }
            BoundaryWarning::ArtifactCacheHit { cell, count } => {
                write!(
                    f,
                    "Cell '{}': {} artifact(s) already built, skipping (use --force to rebuild)",
                    cell, count
                )
            }
            BoundaryWarning::EmptyMatrix => {
                write!(f, "Matrix resolved to no cells; nothing to build")
            }
        }
    }
}
