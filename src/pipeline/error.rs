use std::fmt;

/// Conditions that stop the pipeline without a phase verdict.
#[derive(Debug)]
pub enum PipelineError {
    /// Interrupted by the user. Any in-progress merge has been aborted and
    /// any running child killed.
    Cancelled,
    /// Writing progress output failed.
    Output(std::io::Error),
}

impl PipelineError {
    /// Exit code for this condition (always infrastructure).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        3
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Output(e) => write!(f, "failed to write output: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled => None,
            Self::Output(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Output(e)
    }
}
