use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for release-pipeline operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Version control unavailable at '{}': {reason}", path.display())]
    VcsUnavailable { path: PathBuf, reason: String },

    #[error("No version tag reachable from commit {head}")]
    NoBaseTag { head: String },

    #[error("Commit {commit} carries conflicting version tags: {}", tags.join(", "))]
    AmbiguousTag { commit: String, tags: Vec<String> },

    #[error("Axis '{axis}' has no constraint entry for label '{label}'")]
    UnknownAxisLabel { axis: String, label: String },

    #[error("Build tool '{command}' failed ({status}): {diagnostic}")]
    BuildToolFailure {
        command: String,
        status: String,
        diagnostic: String,
    },

    #[error("Refusing to publish prerelease version {version} to the stable channel")]
    RefusedPrerelease { version: String },

    #[error("Version {version} is a prerelease and no prerelease channel is configured")]
    NoPrereleaseChannel { version: String },

    #[error("Upload of '{artifact}' failed: {reason} ({} artifact(s) not uploaded)", remaining.len())]
    UploadFailure {
        artifact: String,
        reason: String,
        remaining: Vec<PathBuf>,
    },

    #[error("No changelog section for version {version}")]
    SectionNotFound { version: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-pipeline
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create an artifact mismatch error with context
    pub fn artifact_mismatch(msg: impl Into<String>) -> Self {
        ReleaseError::ArtifactMismatch(msg.into())
    }

    /// Stable name of the error kind, printed on stderr by the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseError::VcsUnavailable { .. } => "VcsUnavailable",
            ReleaseError::NoBaseTag { .. } => "NoBaseTag",
            ReleaseError::AmbiguousTag { .. } => "AmbiguousTag",
            ReleaseError::UnknownAxisLabel { .. } => "UnknownAxisLabel",
            ReleaseError::BuildToolFailure { .. } => "BuildToolFailure",
            ReleaseError::RefusedPrerelease { .. } => "RefusedPrerelease",
            ReleaseError::NoPrereleaseChannel { .. } => "NoPrereleaseChannel",
            ReleaseError::UploadFailure { .. } => "UploadFailure",
            ReleaseError::SectionNotFound { .. } => "SectionNotFound",
            ReleaseError::Config(_) => "Config",
            ReleaseError::Version(_) => "Version",
            ReleaseError::ArtifactMismatch(_) => "ArtifactMismatch",
            ReleaseError::Serialization(_) => "Serialization",
            ReleaseError::Git(_) => "Git",
            ReleaseError::Io(_) => "Io",
        }
    }
}
