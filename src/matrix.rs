//! Build/test matrix expansion
//!
//! Resolution is a pure function of the declared axes: the same input always
//! yields the same cells in the same order, so matrices are reproducible
//! across machines and can be fanned out to independent workers.

use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// One dimension of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAxis {
    pub name: String,
    pub values: Vec<String>,
    /// Dependency constraints per label. When present, every label must
    /// have an entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<BTreeMap<String, Vec<String>>>,
}

impl MatrixAxis {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        MatrixAxis {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            constraints: None,
        }
    }

    /// Attach a constraint list to a label
    pub fn with_constraint(mut self, label: &str, constraints: &[&str]) -> Self {
        self.constraints
            .get_or_insert_with(BTreeMap::new)
            .insert(
                label.to_string(),
                constraints.iter().map(|c| c.to_string()).collect(),
            );
        self
    }

    fn constraints_for(&self, label: &str) -> Result<&[String]> {
        match &self.constraints {
            None => Ok(&[] as &[String]),
            Some(table) => table.get(label).map(|c| c.as_slice()).ok_or_else(|| {
                ReleaseError::UnknownAxisLabel {
                    axis: self.name.clone(),
                    label: label.to_string(),
                }
            }),
        }
    }
}

/// The label chosen for one axis in a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisValue {
    pub axis: String,
    pub label: String,
}

/// One concrete environment of the matrix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCell {
    /// Axis values in axis-declaration order
    pub axis_values: Vec<AxisValue>,
    pub dependency_constraints: Vec<String>,
}

impl ResolvedCell {
    /// Label chosen for `axis`, if the axis is part of this cell
    pub fn label(&self, axis: &str) -> Option<&str> {
        self.axis_values
            .iter()
            .find(|v| v.axis == axis)
            .map(|v| v.label.as_str())
    }

    /// Path-safe identifier used to partition per-cell output,
    /// e.g. "python-3.9_rf-rf41". A cell without axes is "default".
    ///
    /// Names or labels with characters outside `[A-Za-z0-9.-]` get those
    /// characters replaced and a digest of the original appended, so
    /// "3.10/x" and "3.10 x" land in different directories.
    pub fn slug(&self) -> String {
        if self.axis_values.is_empty() {
            return "default".to_string();
        }

        self.axis_values
            .iter()
            .map(|v| format!("{}-{}", sanitize(&v.axis), sanitize(&v.label)))
            .collect::<Vec<_>>()
            .join("_")
    }
}

fn sanitize(part: &str) -> String {
    let safe: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if safe == part {
        return safe;
    }

    let digest = Sha256::digest(part.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", safe, suffix)
}

/// Partial assignment of labels; a cell matching all pairs is excluded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixExclusion(pub BTreeMap<String, String>);

impl MatrixExclusion {
    pub fn matches(&self, cell: &ResolvedCell) -> bool {
        !self.0.is_empty()
            && self
                .0
                .iter()
                .all(|(axis, label)| cell.label(axis) == Some(label.as_str()))
    }
}

/// Expand axes into their cross product
///
/// Cells are ordered lexicographically in axis-declaration order (the
/// first axis varies slowest). An axis with no values yields no cells;
/// no axes at all yields the single empty cell.
///
/// # Returns
/// * `Ok(cells)` - One cell per combination
/// * `Err(UnknownAxisLabel)` - A label has no entry in its axis' constraint table
/// * `Err(Config)` - Two cells would share an output directory
pub fn resolve(axes: &[MatrixAxis]) -> Result<Vec<ResolvedCell>> {
    for axis in axes {
        for label in &axis.values {
            axis.constraints_for(label)?;
        }
    }

    let mut cells = vec![ResolvedCell::default()];
    for axis in axes {
        let mut next = Vec::with_capacity(cells.len() * axis.values.len());
        for cell in &cells {
            for label in &axis.values {
                let mut expanded = cell.clone();
                expanded.axis_values.push(AxisValue {
                    axis: axis.name.clone(),
                    label: label.clone(),
                });
                expanded
                    .dependency_constraints
                    .extend(axis.constraints_for(label)?.iter().cloned());
                next.push(expanded);
            }
        }
        cells = next;
    }

    let mut slugs = HashSet::with_capacity(cells.len());
    if let Some(clash) = cells.iter().find(|cell| !slugs.insert(cell.slug())) {
        return Err(ReleaseError::config(format!(
            "Matrix cells share the output directory '{}'; axis labels must be distinct",
            clash.slug()
        )));
    }

    Ok(cells)
}

/// Expand axes, then drop every cell for which `exclude` returns true
pub fn resolve_with<F>(axes: &[MatrixAxis], exclude: F) -> Result<Vec<ResolvedCell>>
where
    F: Fn(&ResolvedCell) -> bool,
{
    let mut cells = resolve(axes)?;
    cells.retain(|cell| !exclude(cell));
    Ok(cells)
}

/// Expand axes and apply configured exclusions
pub fn resolve_excluding(
    axes: &[MatrixAxis],
    exclusions: &[MatrixExclusion],
) -> Result<Vec<ResolvedCell>> {
    resolve_with(axes, |cell| exclusions.iter().any(|e| e.matches(cell)))
}
