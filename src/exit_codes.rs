//! Exit codes for the CLI.
//!
//! Scripts driving batch runs rely on these to tell a missing decoder apart
//! from a bad input or an inconclusive verdict.

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// The audio decoding collaborator (ffmpeg) is not installed
    DecoderUnavailable = 2,
    /// Invalid command-line arguments or configuration
    InvalidArguments = 3,
    /// No reference produced a finite distance
    ClassificationImpossible = 4,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::DecoderUnavailable => write!(f, "decoder unavailable"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::ClassificationImpossible => write!(f, "classification impossible"),
        }
    }
}
