//! Executor error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::patch::PatchError;

/// Errors that can occur while running planned stages.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("command failed: {cmd} (exit status: {})", display_code(.code))]
    CommandFailed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read archive {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    #[error("no {marker} found below {}", .dir.display())]
    MissingSources { dir: PathBuf, marker: String },

    #[error("no conda command available to install {0}")]
    NoPackageHelper(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("stage '{unit}' failed: {source}")]
    Stage {
        unit: String,
        #[source]
        source: Box<ExecuteError>,
    },

    #[error(transparent)]
    Record(#[from] anyhow::Error),
}

impl ExecuteError {
    /// Exit status of the external tool behind this error, if one ran.
    pub fn tool_status(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            Self::Stage { source, .. } => source.tool_status(),
            _ => None,
        }
    }

    /// Captured stderr of the failing tool, if any.
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            Self::Stage { source, .. } => source.tool_stderr(),
            _ => None,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "killed by signal".to_string(),
    }
}
