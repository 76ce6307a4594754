use crate::domain::DerivedVersion;
use crate::matrix::ResolvedCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// Context information passed to the packaging tool
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Package name
    pub package: String,
    /// Rendered version to stamp into the artifacts
    pub version: String,
    /// Cell being built
    pub cell: ResolvedCell,
    /// Directory the tool must write its artifacts into
    pub out_dir: PathBuf,
}

impl BuildContext {
    pub fn new(package: &str, version: &DerivedVersion, cell: &ResolvedCell, out_dir: PathBuf) -> Self {
        BuildContext {
            package: package.to_string(),
            version: version.to_string(),
            cell: cell.clone(),
            out_dir,
        }
    }

    /// Convert context to environment variables for the packaging command
    ///
    /// Maps context fields to RELEASE_* environment variables, one
    /// RELEASE_AXIS_<NAME> per axis with the name upper-cased.
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("RELEASE_PACKAGE".to_string(), self.package.clone());
        env.insert("RELEASE_VERSION".to_string(), self.version.clone());
        env.insert(
            "RELEASE_OUT_DIR".to_string(),
            self.out_dir.display().to_string(),
        );
        env.insert("RELEASE_CELL".to_string(), self.cell.slug());
        env.insert(
            "RELEASE_CONSTRAINTS".to_string(),
            self.cell.dependency_constraints.join("\n"),
        );

        for value in &self.cell.axis_values {
            let key = value
                .axis
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>();
            env.insert(format!("RELEASE_AXIS_{}", key), value.label.clone());
        }

        env
    }

    /// Substitute {name}, {version}, {cell} and {out_dir} in a template
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{name}", &self.package)
            .replace("{version}", &self.version)
            .replace("{cell}", &self.cell.slug())
            .replace("{out_dir}", &self.out_dir.display().to_string())
    }
}
