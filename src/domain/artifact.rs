use crate::domain::version::DerivedVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of distributable produced by a packaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Source,
    Binary,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Source => "source",
            ArtifactKind::Binary => "binary",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A built file on disk. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub version: DerivedVersion,
    pub target_path: PathBuf,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, version: DerivedVersion, target_path: impl Into<PathBuf>) -> Self {
        Artifact {
            kind,
            version,
            target_path: target_path.into(),
        }
    }

    /// File name of the artifact, used as the upload key
    pub fn file_name(&self) -> String {
        self.target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.target_path.display().to_string())
    }
}
