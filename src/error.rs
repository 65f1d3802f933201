//! Top-level error and its process exit codes.

use thiserror::Error;

use crate::core::check::CheckError;
use crate::core::plan::PlanError;
use crate::core::uninstall::UninstallError;
use crate::executor::ExecuteError;

/// A required command or capability is missing
pub const EXIT_MISSING_CAPABILITY: u8 = 1;
/// Invalid or incompatible flags
pub const EXIT_INVALID_FLAGS: u8 = 2;
pub const EXIT_BUILD_FAILED: u8 = 3;
pub const EXIT_DECLINED: u8 = 4;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error("uninstall failed: {0}")]
    Uninstall(#[from] UninstallError),

    #[error("invalid options: {0}")]
    InvalidFlags(String),

    #[error("declined: {0}")]
    Declined(String),

    #[error("cannot prepare working directory: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Plan(PlanError::Graph(_)) => EXIT_BUILD_FAILED,
            Self::Plan(_) | Self::InvalidFlags(_) => EXIT_INVALID_FLAGS,
            Self::Check(CheckError::Missing(_)) => EXIT_MISSING_CAPABILITY,
            Self::Check(CheckError::Scratch(_)) => EXIT_BUILD_FAILED,
            Self::Execute(_) | Self::Uninstall(_) | Self::Io(_) => EXIT_BUILD_FAILED,
            Self::Declined(_) => EXIT_DECLINED,
        }
    }

    /// Raw output of the failing external tool, shown apart from the error itself.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::Execute(e) => e.tool_stderr(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deps::GraphError;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::from(PlanError::HslArchiveRequired).exit_code(), 2);
        assert_eq!(
            Error::from(PlanError::HslArchiveNotFound(PathBuf::from("/x.tgz"))).exit_code(),
            2
        );
        assert_eq!(
            Error::from(PlanError::Graph(GraphError::NotFound("x".into()))).exit_code(),
            3
        );
        assert_eq!(
            Error::from(CheckError::Missing(vec!["swig".into()])).exit_code(),
            1
        );
        let failed = ExecuteError::CommandFailed {
            cmd: "make".into(),
            code: Some(2),
            stderr: "error: no rule".into(),
        };
        let err = Error::from(failed);
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.tool_output(), Some("error: no rule"));
        assert_eq!(Error::Declined("read-only interpreter".into()).exit_code(), 4);
    }
}
