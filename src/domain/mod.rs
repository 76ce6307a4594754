//! Domain logic - pure release rules independent of git and the filesystem

pub mod artifact;
pub mod tag;
pub mod version;

pub use artifact::{Artifact, ArtifactKind};
pub use tag::{TagPattern, VersionTag};
pub use version::{parse_semantic, DerivedVersion, DevFormat, SemanticVersion};
