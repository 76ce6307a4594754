use crate::builder::BuildContext;
use crate::error::{ReleaseError, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Packaging tool interface: writes artifacts for one context into
/// `context.out_dir`
pub trait PackagingTool {
    /// Human-readable name used in diagnostics
    fn describe(&self) -> String;

    /// Run the tool
    ///
    /// # Returns
    /// * `Ok(())` if the tool succeeds (exit code 0)
    /// * `Err(BuildToolFailure)` carrying the tool's diagnostics otherwise
    fn run(&self, context: &BuildContext) -> Result<()>;
}

/// Runs an external command, passing the build context as environment
/// variables and placeholders in the arguments
#[derive(Debug, Clone)]
pub struct CommandTool {
    argv: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(ReleaseError::config("Build command must not be empty"));
        }
        Ok(CommandTool {
            argv,
            working_dir: None,
        })
    }

    /// Run the command from `dir` instead of the current directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl PackagingTool for CommandTool {
    fn describe(&self) -> String {
        self.argv.join(" ")
    }

    fn run(&self, context: &BuildContext) -> Result<()> {
        let args: Vec<String> = self.argv.iter().map(|a| context.render(a)).collect();
        debug!(command = %args.join(" "), cell = %context.cell.slug(), "running packaging tool");

        let mut cmd = Command::new(&args[0]);
        cmd.args(&args[1..]);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in context.to_env_vars() {
            cmd.env(key, value);
        }

        let output = cmd.output().map_err(|e| ReleaseError::BuildToolFailure {
            command: self.describe(),
            status: "not started".to_string(),
            diagnostic: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::BuildToolFailure {
                command: self.describe(),
                status: match output.status.code() {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                },
                diagnostic: format!("Stdout: {}\nStderr: {}", stdout.trim(), stderr.trim()),
            });
        }

        Ok(())
    }
}
