use crate::builder::ArtifactTemplates;
use crate::domain::{DevFormat, TagPattern};
use crate::error::{ReleaseError, Result};
use crate::matrix::{MatrixAxis, MatrixExclusion};
use crate::publish::ChannelPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Project file looked up in the working directory
pub const PROJECT_CONFIG: &str = "release.toml";

/// User-level file looked up in the platform config directory
pub const USER_CONFIG: &str = "release-pipeline.toml";

/// Represents the complete configuration for release-pipeline.
///
/// Contains package identity, version spelling, the build matrix, packaging
/// and publishing settings, and the changelog location.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default)]
    pub matrix: MatrixConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub notes: NotesConfig,
}

fn default_package_name() -> String {
    "package".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PackageConfig {
    #[serde(default = "default_package_name")]
    pub name: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        PackageConfig {
            name: default_package_name(),
        }
    }
}

fn default_tag_pattern() -> String {
    "v{version}".to_string()
}

fn default_dev_marker() -> String {
    "dev".to_string()
}

fn default_dirty_marker() -> String {
    "dirty".to_string()
}

fn default_fingerprint_length() -> usize {
    7
}

/// How tags are recognized and development versions are spelled
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersionConfig {
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    #[serde(default = "default_dev_marker")]
    pub dev_marker: String,

    #[serde(default = "default_dirty_marker")]
    pub dirty_marker: String,

    #[serde(default = "default_fingerprint_length")]
    pub fingerprint_length: usize,
}

impl Default for VersionConfig {
    fn default() -> Self {
        VersionConfig {
            tag_pattern: default_tag_pattern(),
            dev_marker: default_dev_marker(),
            dirty_marker: default_dirty_marker(),
            fingerprint_length: default_fingerprint_length(),
        }
    }
}

impl VersionConfig {
    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.clone())
    }

    pub fn dev_format(&self) -> DevFormat {
        DevFormat {
            dev_marker: self.dev_marker.clone(),
            dirty_marker: self.dirty_marker.clone(),
            fingerprint_length: self.fingerprint_length,
        }
    }
}

/// Matrix axes and exclusions
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MatrixConfig {
    #[serde(default)]
    pub axes: Vec<MatrixAxis>,

    #[serde(default)]
    pub exclude: Vec<MatrixExclusion>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_source_artifact() -> Option<String> {
    ArtifactTemplates::default().source
}

fn default_binary_artifact() -> Option<String> {
    ArtifactTemplates::default().binary
}

/// Packaging command and expected outputs
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuildConfig {
    /// Packaging command as an argv list
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_source_artifact")]
    pub source_artifact: Option<String>,

    #[serde(default = "default_binary_artifact")]
    pub binary_artifact: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            command: Vec::new(),
            output_dir: default_output_dir(),
            source_artifact: default_source_artifact(),
            binary_artifact: default_binary_artifact(),
        }
    }
}

impl BuildConfig {
    pub fn templates(&self) -> ArtifactTemplates {
        ArtifactTemplates {
            source: self.source_artifact.clone(),
            binary: self.binary_artifact.clone(),
        }
    }
}

/// Index backend selection
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Directory,
    Command,
}

fn default_index_root() -> PathBuf {
    PathBuf::from("index")
}

fn default_stable_channel() -> String {
    "stable".to_string()
}

/// Distribution index and channel settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    #[serde(default)]
    pub index: IndexKind,

    #[serde(default = "default_index_root")]
    pub index_root: PathBuf,

    /// Upload command argv, used when `index = "command"`
    #[serde(default)]
    pub upload_command: Vec<String>,

    #[serde(default = "default_stable_channel")]
    pub stable_channel: String,

    #[serde(default)]
    pub prerelease_channel: Option<String>,

    /// Directory for per-version lock files; the output directory when unset
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            index: IndexKind::default(),
            index_root: default_index_root(),
            upload_command: Vec::new(),
            stable_channel: default_stable_channel(),
            prerelease_channel: None,
            lock_dir: None,
        }
    }
}

impl PublishConfig {
    pub fn channel_policy(&self) -> ChannelPolicy {
        ChannelPolicy {
            stable: self.stable_channel.clone(),
            prerelease: self.prerelease_channel.clone(),
        }
    }
}

fn default_changelog() -> PathBuf {
    PathBuf::from("CHANGELOG.md")
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotesConfig {
    #[serde(default = "default_changelog")]
    pub changelog: PathBuf,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            changelog: default_changelog(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)
            .map_err(|e| ReleaseError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.version.tag_pattern()?;

        if !(4..=40).contains(&self.version.fingerprint_length) {
            return Err(ReleaseError::config(format!(
                "fingerprint_length must be between 4 and 40, got {}",
                self.version.fingerprint_length
            )));
        }

        let mut names = HashSet::new();
        for axis in &self.matrix.axes {
            if axis.name.trim().is_empty() {
                return Err(ReleaseError::config("Matrix axis name cannot be empty"));
            }
            if !names.insert(axis.name.as_str()) {
                return Err(ReleaseError::config(format!(
                    "Matrix axis '{}' is declared more than once",
                    axis.name
                )));
            }
        }

        for exclusion in &self.matrix.exclude {
            if let Some(axis) = exclusion.0.keys().find(|k| !names.contains(k.as_str())) {
                return Err(ReleaseError::config(format!(
                    "Matrix exclusion refers to unknown axis '{}'",
                    axis
                )));
            }
        }

        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in current directory
/// 3. `release-pipeline.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err(Config)` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let Some(path) = path else {
        return Ok(Config::default());
    };

    let text = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Config::from_toml(&text)
}

fn find_config() -> Option<PathBuf> {
    let local = Path::new(".").join(PROJECT_CONFIG);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(USER_CONFIG))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.package.name, "package");
        assert_eq!(config.version.tag_pattern, "v{version}");
        assert_eq!(config.version.dev_format(), DevFormat::default());
        assert_eq!(config.build.output_dir, PathBuf::from("dist"));
        assert_eq!(config.build.templates(), ArtifactTemplates::default());
        assert_eq!(config.publish.channel_policy(), ChannelPolicy::default());
        assert_eq!(config.notes.changelog, PathBuf::from("CHANGELOG.md"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = Config::from_toml(
            r#"
[version]
dev_marker = "post"

[publish]
prerelease_channel = "testing"
"#,
        )
        .unwrap();

        assert_eq!(config.version.dev_marker, "post");
        assert_eq!(config.version.dirty_marker, "dirty");
        assert_eq!(config.publish.stable_channel, "stable");
        assert_eq!(config.publish.prerelease_channel.as_deref(), Some("testing"));
        assert_eq!(config.publish.index, IndexKind::Directory);
    }

    #[test]
    fn test_matrix_axes_and_exclusions() {
        let config = Config::from_toml(
            r#"
[[matrix.axes]]
name = "python"
values = ["3.8", "3.9"]

[[matrix.axes]]
name = "rf"
values = ["rf41", "rf50"]
constraints = { rf41 = ["robotframework>=4.1,<5"], rf50 = ["robotframework>=5,<6"] }

[[matrix.exclude]]
python = "3.8"
rf = "rf50"
"#,
        )
        .unwrap();

        assert_eq!(config.matrix.axes.len(), 2);
        assert!(config.matrix.axes[0].constraints.is_none());
        assert_eq!(
            config.matrix.axes[1].constraints.as_ref().unwrap()["rf50"],
            vec!["robotframework>=5,<6".to_string()]
        );
        assert_eq!(config.matrix.exclude[0].0["python"], "3.8");
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let err = Config::from_toml(
            r#"
[[matrix.axes]]
name = "python"
values = ["3.8"]

[[matrix.axes]]
name = "python"
values = ["3.9"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_exclusion_on_unknown_axis_rejected() {
        let err = Config::from_toml(
            r#"
[[matrix.exclude]]
os = "windows"
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_tag_pattern_requires_placeholder() {
        let err = Config::from_toml("[version]\ntag_pattern = \"release\"\n").unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_fingerprint_length_bounds() {
        assert!(Config::from_toml("[version]\nfingerprint_length = 3\n").is_err());
        assert!(Config::from_toml("[version]\nfingerprint_length = 41\n").is_err());
        assert!(Config::from_toml("[version]\nfingerprint_length = 12\n").is_ok());
    }

    #[test]
    fn test_command_index() {
        let config = Config::from_toml(
            r#"
[publish]
index = "command"
upload_command = ["twine", "upload", "{path}"]
"#,
        )
        .unwrap();
        assert_eq!(config.publish.index, IndexKind::Command);
        assert_eq!(config.publish.upload_command[2], "{path}");
    }

    #[test]
    fn test_malformed_toml() {
        assert_eq!(Config::from_toml("[package\n").unwrap_err().kind(), "Config");
    }
}
