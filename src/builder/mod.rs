//! Packaging of matrix cells into distributable artifacts
//!
//! Each cell builds into its own directory under the output root
//! (`<output_dir>/<cell slug>/`) so cells can be built concurrently
//! without write collisions.

pub mod context;
pub mod tool;

pub use context::BuildContext;
pub use tool::{CommandTool, PackagingTool};

use crate::domain::{Artifact, ArtifactKind, DerivedVersion};
use crate::error::{ReleaseError, Result};
use crate::matrix::ResolvedCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Expected artifact file names, with {name}, {version} and {cell} placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactTemplates {
    pub source: Option<String>,
    pub binary: Option<String>,
}

impl Default for ArtifactTemplates {
    fn default() -> Self {
        ArtifactTemplates {
            source: Some("{name}-{version}.tar.gz".to_string()),
            binary: Some("{name}-{version}-py3-none-any.whl".to_string()),
        }
    }
}

impl ArtifactTemplates {
    /// Artifacts for `(version, cell)` under `<output_dir>/<cell slug>/`
    pub fn expected(
        &self,
        package: &str,
        output_dir: &Path,
        version: &DerivedVersion,
        cell: &ResolvedCell,
    ) -> Vec<Artifact> {
        let ctx = BuildContext::new(package, version, cell, output_dir.join(cell.slug()));
        let kinds = [
            (ArtifactKind::Source, &self.source),
            (ArtifactKind::Binary, &self.binary),
        ];

        kinds
            .iter()
            .filter_map(|(kind, template)| {
                template
                    .as_deref()
                    .map(|t| Artifact::new(*kind, version.clone(), ctx.out_dir.join(ctx.render(t))))
            })
            .collect()
    }
}

/// Result of building one cell
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub artifacts: Vec<Artifact>,
    /// True when every expected artifact already existed and the tool was not run
    pub cache_hit: bool,
}

/// Builds artifacts for a version and matrix cell
pub struct PackageBuilder<T: PackagingTool> {
    tool: T,
    package: String,
    output_dir: PathBuf,
    templates: ArtifactTemplates,
    force: bool,
}

impl<T: PackagingTool> PackageBuilder<T> {
    pub fn new(tool: T, package: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        PackageBuilder {
            tool,
            package: package.into(),
            output_dir: output_dir.into(),
            templates: ArtifactTemplates::default(),
            force: false,
        }
    }

    pub fn with_templates(mut self, templates: ArtifactTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Rebuild even when the expected artifacts already exist
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Directory a cell's artifacts are written to
    pub fn cell_dir(&self, cell: &ResolvedCell) -> PathBuf {
        self.output_dir.join(cell.slug())
    }

    /// Artifacts a build of `(version, cell)` is expected to produce
    pub fn expected_artifacts(&self, version: &DerivedVersion, cell: &ResolvedCell) -> Vec<Artifact> {
        self.templates
            .expected(&self.package, &self.output_dir, version, cell)
    }

    /// Build the artifacts for `(version, cell)`
    ///
    /// # Returns
    /// * `Ok(artifacts)` - Every expected artifact, present on disk
    /// * `Err(BuildToolFailure)` - The tool failed or did not produce an expected file
    pub fn build(&self, version: &DerivedVersion, cell: &ResolvedCell) -> Result<Vec<Artifact>> {
        Ok(self.build_outcome(version, cell)?.artifacts)
    }

    /// Like [PackageBuilder::build], also reporting whether the build was skipped
    pub fn build_outcome(&self, version: &DerivedVersion, cell: &ResolvedCell) -> Result<BuildOutcome> {
        let expected = self.expected_artifacts(version, cell);
        if expected.is_empty() {
            return Err(ReleaseError::config(
                "No artifact templates configured; nothing to build",
            ));
        }

        if !self.force && all_present(&expected) {
            info!(cell = %cell.slug(), version = %version, "artifacts already built, skipping");
            return Ok(BuildOutcome {
                artifacts: expected,
                cache_hit: true,
            });
        }

        let out_dir = self.cell_dir(cell);
        fs::create_dir_all(&out_dir)?;

        let ctx = BuildContext::new(&self.package, version, cell, out_dir);
        debug!(tool = %self.tool.describe(), cell = %cell.slug(), "building");
        self.tool.run(&ctx)?;

        if let Some(missing) = expected.iter().find(|a| !a.target_path.is_file()) {
            return Err(ReleaseError::BuildToolFailure {
                command: self.tool.describe(),
                status: "exit code 0".to_string(),
                diagnostic: format!(
                    "expected artifact {} was not produced",
                    missing.target_path.display()
                ),
            });
        }

        info!(cell = %cell.slug(), count = expected.len(), "built artifacts");
        Ok(BuildOutcome {
            artifacts: expected,
            cache_hit: false,
        })
    }
}

fn all_present(artifacts: &[Artifact]) -> bool {
    artifacts.iter().all(|a| a.target_path.is_file())
}
