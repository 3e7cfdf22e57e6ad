//! The overall verdict: a pure function of the phase results.

use std::fmt;

use super::phase::{Failure, PhaseResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Blocked(Failure),
    /// Completed, but regressions were found.
    Regressed,
}

impl Verdict {
    /// The first hard failure decides; otherwise any regression; otherwise
    /// approval. Skipped phases never matter.
    #[must_use]
    pub fn from_results(results: &[PhaseResult]) -> Self {
        if let Some(f) = results
            .iter()
            .filter_map(PhaseResult::failure)
            .find(|f| f.is_hard())
        {
            return Self::Blocked(f);
        }
        if results
            .iter()
            .any(|r| r.failure() == Some(Failure::Regression))
        {
            return Self::Regressed;
        }
        Self::Approved
    }

    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Approved => 0,
            Self::Regressed => Failure::Regression.exit_code(),
            Self::Blocked(f) => f.exit_code(),
        }
    }
}

/// Process exit code for an ordered sequence of results.
#[must_use]
pub fn exit_code(results: &[PhaseResult]) -> i32 {
    Verdict::from_results(results).exit_code()
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "PR APPROVED: all checks passed"),
            Self::Regressed => write!(f, "WARNING: Regressions detected. Review before merging."),
            Self::Blocked(Failure::Conflicts) => {
                write!(f, "BLOCKED: Unresolvable merge conflicts. See report above.")
            }
            Self::Blocked(Failure::Infrastructure) => write!(f, "BLOCKED: Infrastructure error."),
            Self::Blocked(Failure::Test) => write!(f, "BLOCKED: Tests failed. Fix before merging."),
            Self::Blocked(Failure::Regression) => write!(f, "BLOCKED: Regressions detected."),
        }
    }
}
