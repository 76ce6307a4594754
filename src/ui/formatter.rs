//! Pure formatting functions for UI output.
//!
//! Results (versions, cells, notes, artifact paths) go to stdout so they can
//! be captured by scripts. Everything addressed to a person goes to stderr.

use crate::boundary::BoundaryWarning;
use crate::domain::Artifact;
use crate::error::{ReleaseError, Result};
use crate::matrix::ResolvedCell;
use crate::publish::PublishResult;
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

/// Format and print an error with its kind in red.
pub fn display_error(error: &ReleaseError) {
    eprintln!("{} {}: {}", style("ERROR:").red(), error.kind(), error);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One cell as emitted by `resolve-matrix --format json`
#[derive(Debug, Serialize)]
struct CellView<'a> {
    axes: BTreeMap<&'a str, &'a str>,
    constraints: &'a [String],
    slug: String,
}

/// One line per cell: slug, then its constraints separated by spaces
pub fn format_cells_text(cells: &[ResolvedCell]) -> String {
    cells
        .iter()
        .map(|cell| {
            if cell.dependency_constraints.is_empty() {
                cell.slug()
            } else {
                format!("{}\t{}", cell.slug(), cell.dependency_constraints.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON array suitable for CI job fan-out
pub fn format_cells_json(cells: &[ResolvedCell]) -> Result<String> {
    let views: Vec<CellView> = cells
        .iter()
        .map(|cell| CellView {
            axes: cell
                .axis_values
                .iter()
                .map(|v| (v.axis.as_str(), v.label.as_str()))
                .collect(),
            constraints: &cell.dependency_constraints,
            slug: cell.slug(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

/// Artifact paths, one per line
pub fn format_artifacts(artifacts: &[Artifact]) -> String {
    artifacts
        .iter()
        .map(|a| a.target_path.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Display the outcome of a publish call.
pub fn display_publish_result(result: &PublishResult) {
    eprintln!(
        "\n{} {} to channel {}",
        style("Published").bold(),
        style(&result.version).green(),
        style(&result.channel).cyan()
    );
    for artifact in &result.uploaded {
        eprintln!("  - {} ({})", artifact.file_name(), artifact.kind);
    }
    for artifact in &result.already_present {
        eprintln!(
            "  - {} ({}) {}",
            artifact.file_name(),
            artifact.kind,
            style("already in index").dim()
        );
    }
}

/// Display what a publish call is about to upload.
pub fn display_publish_plan(version: &str, channel: &str, artifacts: &[Artifact]) {
    eprintln!(
        "\n{} {} -> {}",
        style("About to publish").bold(),
        style(version).green(),
        style(channel).cyan()
    );
    for artifact in artifacts {
        eprintln!("  - {}", artifact.target_path.display());
    }
}
