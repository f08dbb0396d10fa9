pub mod iostat;
pub mod multipath;

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Failure to obtain text from one of the external sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no {0} command configured")]
    EmptyCommand(&'static str),

    #[error("error opening `{command}`")]
    Spawn {
        command: String,
        #[source]
        source:  std::io::Error,
    },

    #[error("`{command}` failed ({status}){detail}", detail = fmt_stderr(.stderr))]
    Failed {
        command: String,
        status:  ExitStatus,
        stderr:  String,
    },

    #[error("error reading {}", .path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_stderr(stderr: &str) -> String {
    match stderr.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => format!(": {}", line.trim()),
        None       => String::new(),
    }
}

/// Run `argv` to completion and return its stdout as text.
/// `role` names the source in the error when `argv` is empty.
pub fn run_command(role: &'static str, argv: &[String]) -> Result<String, SourceError> {
    let (program, args) = argv.split_first().ok_or(SourceError::EmptyCommand(role))?;
    let command = argv.join(" ");
    debug!(%command, "running {} source", role);

    let out = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| SourceError::Spawn { command: command.clone(), source })?;

    if !out.status.success() {
        return Err(SourceError::Failed {
            command,
            status: out.status,
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Read previously captured source output from `path`.
pub fn read_capture(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Read { path: path.to_path_buf(), source })
}
