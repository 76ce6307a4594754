//! Command workflows behind the CLI
//!
//! Each workflow composes the library stages and returns a typed result, so
//! the argument parser in main.rs only maps results to output and exit codes.
//! The argument structs here mirror the CLI flags without depending on clap.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::boundary::BoundaryWarning;
use crate::builder::{BuildOutcome, CommandTool, PackageBuilder};
use crate::config::{load_config, Config, IndexKind, PROJECT_CONFIG};
use crate::domain::{parse_semantic, Artifact, DerivedVersion};
use crate::error::{ReleaseError, Result};
use crate::git::{Git2Repository, Repository};
use crate::matrix::{resolve_excluding, ResolvedCell};
use crate::notes;
use crate::oracle::{derive_from_snapshot, ignored_tags, is_prerelease, VersionOracle};
use crate::publish::{
    ChannelRequest, CommandIndex, DirectoryIndex, DistributionIndex, PublishResult,
    ReleasePublisher, UploadRejection, UploadRequest,
};
use crate::ui;

/// Arguments shared by every command
#[derive(Debug, Clone, PartialEq)]
pub struct SessionArgs {
    /// Path to custom config file
    pub config_path: Option<PathBuf>,

    /// Directory inside the repository to work on
    pub repo: PathBuf,
}

impl Default for SessionArgs {
    fn default() -> Self {
        SessionArgs {
            config_path: None,
            repo: PathBuf::from("."),
        }
    }
}

/// Arguments for the package workflow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageArgs {
    /// Rebuild cells whose artifacts already exist
    pub force: bool,

    /// Build only the cell with this slug
    pub cell: Option<String>,
}

/// Arguments for the publish workflow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishArgs {
    pub channel: ChannelRequest,

    /// Skip the confirmation prompt
    pub yes: bool,

    /// Count artifacts already in the index as uploaded
    pub resume: bool,
}

/// Loaded configuration bound to a repository directory
///
/// Relative paths from the configuration are taken relative to the
/// repository directory given on the command line.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub root: PathBuf,
}

impl Session {
    /// Load the configuration for `args`
    ///
    /// Besides the usual lookup, a `release.toml` inside the repository
    /// directory is picked up when no explicit path is given.
    pub fn open(args: &SessionArgs) -> Result<Self> {
        let in_repo = args.repo.join(PROJECT_CONFIG);
        let config_path = match &args.config_path {
            Some(path) => Some(path.clone()),
            None if in_repo.is_file() => Some(in_repo),
            None => None,
        };

        let config = load_config(config_path.as_deref())?;
        debug!(package = %config.package.name, root = %args.repo.display(), "session opened");

        Ok(Session {
            config,
            root: args.repo.clone(),
        })
    }

    /// Session over an already loaded configuration
    pub fn with_config(config: Config, root: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        Ok(Session {
            config,
            root: root.into(),
        })
    }

    fn path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path(&self.config.build.output_dir)
    }

    pub fn oracle(&self) -> Result<VersionOracle<Git2Repository>> {
        let repo = Git2Repository::open(&self.root)?;
        Ok(VersionOracle::new(
            repo,
            self.config.version.tag_pattern()?,
            self.config.version.dev_format(),
        ))
    }

    pub fn builder(&self, force: bool) -> Result<PackageBuilder<CommandTool>> {
        let tool = CommandTool::new(self.config.build.command.clone())?.in_dir(&self.root);
        Ok(
            PackageBuilder::new(tool, self.config.package.name.clone(), self.output_dir())
                .with_templates(self.config.build.templates())
                .force(force),
        )
    }

    pub fn publisher(&self) -> Result<ReleasePublisher<ConfiguredIndex>> {
        let publish = &self.config.publish;
        let index = match publish.index {
            IndexKind::Directory => ConfiguredIndex::Directory(DirectoryIndex::new(
                self.path(&publish.index_root),
            )),
            IndexKind::Command => {
                if publish.upload_command.is_empty() {
                    return Err(ReleaseError::config(
                        "publish.upload_command is required when index = \"command\"",
                    ));
                }
                ConfiguredIndex::Command(CommandIndex::new(publish.upload_command.clone()))
            }
        };

        let lock_dir = match &publish.lock_dir {
            Some(dir) => self.path(dir),
            None => self.output_dir(),
        };

        Ok(ReleasePublisher::new(
            index,
            self.config.package.name.clone(),
            publish.channel_policy(),
        )
        .with_lock_dir(lock_dir))
    }
}

/// Index selected by the `[publish]` section
#[derive(Debug, Clone)]
pub enum ConfiguredIndex {
    Directory(DirectoryIndex),
    Command(CommandIndex),
}

impl DistributionIndex for ConfiguredIndex {
    fn upload(&self, request: &UploadRequest) -> std::result::Result<(), UploadRejection> {
        match self {
            ConfiguredIndex::Directory(index) => index.upload(request),
            ConfiguredIndex::Command(index) => index.upload(request),
        }
    }
}

/// Derive the version of the repository's HEAD
///
/// Reports a dirty working tree as a warning; ignored tags are only logged.
pub fn derive_version(session: &Session) -> Result<DerivedVersion> {
    let oracle = session.oracle()?;
    derive_with(&oracle)
}

fn derive_with<R: Repository>(oracle: &VersionOracle<R>) -> Result<DerivedVersion> {
    let snapshot = oracle.snapshot()?;

    let ignored = ignored_tags(&snapshot, oracle.pattern());
    if !ignored.is_empty() {
        let warning = BoundaryWarning::IgnoredTags {
            tags: ignored,
            pattern: oracle.pattern().pattern().to_string(),
        };
        debug!("{}", warning);
    }

    let version = derive_from_snapshot(&snapshot, oracle.pattern(), oracle.format())?;
    if version.dirty {
        ui::display_boundary_warning(&BoundaryWarning::DirtyWorkingTree {
            version: version.to_string(),
        });
    }
    Ok(version)
}

/// Whether HEAD derives to a prerelease version
pub fn check_prerelease(session: &Session) -> Result<bool> {
    Ok(is_prerelease(&derive_version(session)?))
}

/// Expand the configured matrix
pub fn resolve_matrix(session: &Session) -> Result<Vec<ResolvedCell>> {
    let matrix = &session.config.matrix;
    let cells = resolve_excluding(&matrix.axes, &matrix.exclude)?;
    if cells.is_empty() {
        ui::display_boundary_warning(&BoundaryWarning::EmptyMatrix);
    }
    Ok(cells)
}

fn select_cells(session: &Session, only: Option<&str>) -> Result<Vec<ResolvedCell>> {
    let cells = resolve_matrix(session)?;
    let Some(slug) = only else {
        return Ok(cells);
    };

    let selected: Vec<ResolvedCell> = cells.into_iter().filter(|c| c.slug() == slug).collect();
    if selected.is_empty() {
        return Err(ReleaseError::config(format!("No matrix cell named '{}'", slug)));
    }
    Ok(selected)
}

/// Build every selected cell for the derived version
pub fn package(
    session: &Session,
    args: &PackageArgs,
) -> Result<(DerivedVersion, Vec<BuildOutcome>)> {
    let version = derive_version(session)?;
    let cells = select_cells(session, args.cell.as_deref())?;
    let outcomes = build_cells(session, &version, &cells, args.force)?;
    Ok((version, outcomes))
}

fn build_cells(
    session: &Session,
    version: &DerivedVersion,
    cells: &[ResolvedCell],
    force: bool,
) -> Result<Vec<BuildOutcome>> {
    let builder = session.builder(force)?;
    let mut outcomes = Vec::with_capacity(cells.len());

    for cell in cells {
        ui::display_status(&format!("Building {} for {}", version, cell.slug()));
        let outcome = builder.build_outcome(version, cell)?;
        if outcome.cache_hit {
            ui::display_boundary_warning(&BoundaryWarning::ArtifactCacheHit {
                cell: cell.slug(),
                count: outcome.artifacts.len(),
            });
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Artifacts the configured templates name for every cell, which must all exist
fn built_artifacts(
    session: &Session,
    version: &DerivedVersion,
    cells: &[ResolvedCell],
) -> Result<Vec<Artifact>> {
    let templates = session.config.build.templates();
    let output_dir = session.output_dir();

    let mut artifacts = Vec::new();
    for cell in cells {
        let expected = templates.expected(&session.config.package.name, &output_dir, version, cell);
        for artifact in expected {
            if !artifact.target_path.is_file() {
                return Err(ReleaseError::artifact_mismatch(format!(
                    "{} has not been built for version {}",
                    artifact.target_path.display(),
                    version
                )));
            }
            artifacts.push(artifact);
        }
    }
    Ok(artifacts)
}

/// Publish previously built artifacts of the derived version
///
/// # Returns
/// * `Ok(Some(result))` - Every artifact was uploaded
/// * `Ok(None)` - The user declined the confirmation prompt
pub fn publish(session: &Session, args: &PublishArgs) -> Result<Option<PublishResult>> {
    let version = derive_version(session)?;
    let publisher = session.publisher()?.resuming(args.resume);
    let channel = publisher.select_channel(&version, args.channel)?;

    let cells = resolve_matrix(session)?;
    let artifacts = built_artifacts(session, &version, &cells)?;
    upload(&publisher, &channel, &version, &artifacts, args)
}

fn upload(
    publisher: &ReleasePublisher<ConfiguredIndex>,
    channel: &str,
    version: &DerivedVersion,
    artifacts: &[Artifact],
    args: &PublishArgs,
) -> Result<Option<PublishResult>> {
    if !args.yes && ui::is_interactive() {
        ui::display_publish_plan(&version.to_string(), channel, artifacts);
        if !ui::confirm_action("Proceed with upload?")? {
            info!("publish cancelled by user");
            return Ok(None);
        }
    }

    let result = publisher.publish_to(artifacts, version, args.channel)?;
    Ok(Some(result))
}

/// Release notes for `version`, or for the derived base version when none is given
pub fn release_notes(session: &Session, version: Option<&str>) -> Result<String> {
    let wanted = match version {
        Some(text) => parse_semantic(text)?,
        None => derive_version(session)?.base,
    };
    let changelog = session.path(&session.config.notes.changelog);
    notes::extract_from_file(&changelog, &wanted)
}

/// Derive, resolve, package every cell and publish, stopping at the first error
pub fn release(
    session: &Session,
    package_args: &PackageArgs,
    publish_args: &PublishArgs,
) -> Result<Option<PublishResult>> {
    let version = derive_version(session)?;
    info!(version = %version, "releasing");

    // Channel errors surface before any cell is built.
    let publisher = session.publisher()?.resuming(publish_args.resume);
    let channel = publisher.select_channel(&version, publish_args.channel)?;

    let cells = select_cells(session, package_args.cell.as_deref())?;
    let outcomes = build_cells(session, &version, &cells, package_args.force)?;
    let artifacts: Vec<Artifact> = outcomes.into_iter().flat_map(|o| o.artifacts).collect();

    upload(&publisher, &channel, &version, &artifacts, publish_args)
}
