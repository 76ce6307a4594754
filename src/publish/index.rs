use crate::domain::ArtifactKind;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One artifact upload keyed by (name, version, kind)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub channel: String,
    pub package: String,
    pub version: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl UploadRequest {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Why an index did not accept an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    /// The index already holds this artifact
    Duplicate,
    /// Transport or server failure
    Failed(String),
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadRejection::Duplicate => write!(f, "artifact already exists in the index"),
            UploadRejection::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Distribution index interface
///
/// Indexes are append-only: an upload either adds a new artifact or is
/// rejected, never overwrites.
pub trait DistributionIndex {
    fn upload(&self, request: &UploadRequest) -> std::result::Result<(), UploadRejection>;
}

/// Append-only index stored as `<root>/<channel>/<package>/<version>/<file>`
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    root: PathBuf,
}

impl DirectoryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryIndex { root: root.into() }
    }

    /// Where an upload lands
    pub fn destination(&self, request: &UploadRequest) -> PathBuf {
        self.root
            .join(&request.channel)
            .join(&request.package)
            .join(&request.version)
            .join(request.file_name())
    }

    fn store(&self, request: &UploadRequest, destination: &Path) -> io::Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut source = File::open(&request.path)?;
        let mut target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)?;

        if let Err(e) = io::copy(&mut source, &mut target) {
            drop(target);
            // A torn copy would otherwise block every retry as a duplicate.
            let _ = fs::remove_file(destination);
            return Err(e);
        }
        target.sync_all()
    }
}

impl DistributionIndex for DirectoryIndex {
    fn upload(&self, request: &UploadRequest) -> std::result::Result<(), UploadRejection> {
        let destination = self.destination(request);
        match self.store(request, &destination) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(UploadRejection::Duplicate),
            Err(e) => Err(UploadRejection::Failed(format!(
                "cannot write {}: {}",
                destination.display(),
                e
            ))),
        }
    }
}

/// Uploads by running an external command per artifact
///
/// Arguments may use {channel}, {name}, {version}, {kind} and {path}. A
/// non-zero exit is a failed upload; output mentioning that the file
/// already exists is reported as a duplicate.
#[derive(Debug, Clone)]
pub struct CommandIndex {
    argv: Vec<String>,
}

impl CommandIndex {
    pub fn new(argv: Vec<String>) -> Self {
        CommandIndex { argv }
    }

    fn render(&self, request: &UploadRequest) -> Vec<String> {
        let kind = request.kind.to_string();
        let path = request.path.display().to_string();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{channel}", &request.channel)
                    .replace("{name}", &request.package)
                    .replace("{version}", &request.version)
                    .replace("{kind}", &kind)
                    .replace("{path}", &path)
            })
            .collect()
    }
}

impl DistributionIndex for CommandIndex {
    fn upload(&self, request: &UploadRequest) -> std::result::Result<(), UploadRejection> {
        let args = self.render(request);
        let Some((program, rest)) = args.split_first() else {
            return Err(UploadRejection::Failed(
                "upload command is empty".to_string(),
            ));
        };

        let output = Command::new(program)
            .args(rest)
            .output()
            .map_err(|e| UploadRejection::Failed(format!("cannot run {}: {}", program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let combined = format!("{}\n{}", stdout.trim(), stderr.trim());
        if combined.to_lowercase().contains("already exists") {
            Err(UploadRejection::Duplicate)
        } else {
            Err(UploadRejection::Failed(format!(
                "{} exited with {}: {}",
                program,
                output.status.code().unwrap_or(-1),
                combined.trim()
            )))
        }
    }
}
