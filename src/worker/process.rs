//! Subprocess execution
//!
//! Runs a tool to completion and captures everything it printed.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of a finished tool run
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Best message to report on failure: stderr, else stdout, else the exit status
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exited with {}", self.status)
    }
}

/// Run `program` with `args`, blocking until it exits.
///
/// Only spawn failures are errors here; a non-zero exit is reported through
/// `ProcessOutput::status`.
pub fn run_tool<I, S>(program: &Path, args: I) -> std::io::Result<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    let result = ProcessOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    tracing::debug!(
        "{} finished with {} ({} bytes stdout, {} bytes stderr)",
        program.display(),
        result.status,
        result.stdout.len(),
        result.stderr.len()
    );

    Ok(result)
}

/// Split a client-supplied command line into arguments
pub fn split_args(command_line: &str) -> Vec<String> {
    command_line.split_whitespace().map(str::to_string).collect()
}
