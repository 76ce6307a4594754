//! Publishing artifacts to a distribution index
//!
//! Channel policy:
//! - release versions go to the stable channel
//! - prerelease versions go to the prerelease channel, if one is configured
//! - an explicit request for the stable channel refuses prerelease versions
//!
//! A publish call uploads its artifacts in order under a per-version lock.
//! Nothing is rolled back on failure; the error names the artifacts still
//! to upload. A resuming publisher treats artifacts the index already holds
//! as uploaded, so the same call can be repeated until it succeeds.

pub mod index;
pub mod lock;

pub use index::{CommandIndex, DirectoryIndex, DistributionIndex, UploadRejection, UploadRequest};
pub use lock::PublishLock;

use crate::domain::{Artifact, DerivedVersion};
use crate::error::{ReleaseError, Result};
use crate::oracle::is_prerelease;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Channel names available to the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPolicy {
    pub stable: String,
    pub prerelease: Option<String>,
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        ChannelPolicy {
            stable: "stable".to_string(),
            prerelease: None,
        }
    }
}

/// Which channel the caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelRequest {
    /// Pick by version stability
    #[default]
    Auto,
    /// Stable channel only; prerelease versions are refused
    Stable,
}

/// Outcome of a successful publish call
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub channel: String,
    pub version: String,
    pub uploaded: Vec<Artifact>,
    /// Artifacts a resumed call found already in the index
    pub already_present: Vec<Artifact>,
}

/// Uploads artifacts for one version
pub struct ReleasePublisher<I: DistributionIndex> {
    index: I,
    package: String,
    policy: ChannelPolicy,
    lock_dir: Option<PathBuf>,
    resume: bool,
}

impl<I: DistributionIndex> ReleasePublisher<I> {
    pub fn new(index: I, package: impl Into<String>, policy: ChannelPolicy) -> Self {
        ReleasePublisher {
            index,
            package: package.into(),
            policy,
            lock_dir: None,
            resume: false,
        }
    }

    /// Serialize publishes of one version across processes through lock
    /// files in `dir`
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Accept duplicates of this version's artifacts as earlier uploads
    /// instead of failing on them
    pub fn resuming(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Choose the channel for `version`
    ///
    /// # Returns
    /// * `Ok(channel)` - Channel name to upload to
    /// * `Err(RefusedPrerelease)` - Stable was requested for a prerelease version
    /// * `Err(NoPrereleaseChannel)` - Prerelease version with no prerelease channel
    pub fn select_channel(&self, version: &DerivedVersion, request: ChannelRequest) -> Result<String> {
        if !is_prerelease(version) {
            return Ok(self.policy.stable.clone());
        }

        match request {
            ChannelRequest::Stable => Err(ReleaseError::RefusedPrerelease {
                version: version.to_string(),
            }),
            ChannelRequest::Auto => {
                self.policy
                    .prerelease
                    .clone()
                    .ok_or_else(|| ReleaseError::NoPrereleaseChannel {
                        version: version.to_string(),
                    })
            }
        }
    }

    /// Publish with automatic channel selection
    pub fn publish(&self, artifacts: &[Artifact], version: &DerivedVersion) -> Result<PublishResult> {
        self.publish_to(artifacts, version, ChannelRequest::Auto)
    }

    /// Publish to the channel picked by `request`
    ///
    /// Artifacts sharing a file name are uploaded once. On the first
    /// rejected upload the call stops with `UploadFailure`, whose
    /// `remaining` lists that artifact and all later ones. When resuming,
    /// a duplicate rejection is not a failure.
    pub fn publish_to(
        &self,
        artifacts: &[Artifact],
        version: &DerivedVersion,
        request: ChannelRequest,
    ) -> Result<PublishResult> {
        if let Some(stray) = artifacts.iter().find(|a| &a.version != version) {
            return Err(ReleaseError::artifact_mismatch(format!(
                "{} was built for {} but publishing {}",
                stray.file_name(),
                stray.version,
                version
            )));
        }

        let channel = self.select_channel(version, request)?;
        let rendered = version.to_string();

        let _lock = match &self.lock_dir {
            Some(dir) => Some(PublishLock::acquire(dir, &self.package, &rendered)?),
            None => None,
        };

        let mut seen = HashSet::new();
        let queue: Vec<&Artifact> = artifacts
            .iter()
            .filter(|a| seen.insert(a.file_name()))
            .collect();

        let mut uploaded = Vec::with_capacity(queue.len());
        let mut already_present = Vec::new();
        for (position, artifact) in queue.iter().enumerate() {
            let upload = UploadRequest {
                channel: channel.clone(),
                package: self.package.clone(),
                version: rendered.clone(),
                kind: artifact.kind,
                path: artifact.target_path.clone(),
            };

            match self.index.upload(&upload) {
                Ok(()) => {}
                Err(UploadRejection::Duplicate) if self.resume => {
                    info!(artifact = %artifact.file_name(), channel = %channel, "already in index");
                    already_present.push((*artifact).clone());
                    continue;
                }
                Err(rejection) => {
                    warn!(
                        artifact = %artifact.file_name(),
                        channel = %channel,
                        reason = %rejection,
                        "upload rejected"
                    );
                    return Err(ReleaseError::UploadFailure {
                        artifact: artifact.file_name(),
                        reason: rejection.to_string(),
                        remaining: queue[position..]
                            .iter()
                            .map(|a| a.target_path.clone())
                            .collect(),
                    });
                }
            }

            info!(artifact = %artifact.file_name(), channel = %channel, "uploaded");
            uploaded.push((*artifact).clone());
        }

        Ok(PublishResult {
            channel,
            version: rendered,
            uploaded,
            already_present,
        })
    }
}
