//! Value types shared between the [`GitRepo`](crate::GitRepo) trait and its
//! callers. They contain no process or backend details.

use std::fmt;

/// How a `git merge --no-commit --no-ff` attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStatus {
    /// Nothing to merge: the target is already contained in `HEAD`.
    UpToDate,
    /// The merge applied without conflicts and is staged, awaiting commit.
    Clean,
    /// The merge stopped with content conflicts in the working tree.
    Conflicted,
    /// The merge failed for a reason other than content conflicts
    /// (unknown revision, dirty tree, repository in a bad state, ...).
    Failed {
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
    },
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up-to-date"),
            Self::Clean => write!(f, "clean"),
            Self::Conflicted => write!(f, "conflicted"),
            Self::Failed { exit_code: Some(c) } => write!(f, "failed (exit {c})"),
            Self::Failed { exit_code: None } => write!(f, "failed (signal)"),
        }
    }
}

/// The captured result of one merge attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeAttempt {
    /// Classified outcome.
    pub status: MergeStatus,
    /// Captured stdout from git.
    pub stdout: String,
    /// Captured stderr from git.
    pub stderr: String,
}

impl MergeAttempt {
    /// Classify raw git merge output.
    ///
    /// Git reports content conflicts with lines starting `CONFLICT (...)` on
    /// stdout and exits 1; any other non-zero exit is an infrastructure-level
    /// failure.
    #[must_use]
    pub fn classify(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let status = if exit_code == Some(0) {
            if stdout.contains("Already up to date") || stdout.contains("Already up-to-date") {
                MergeStatus::UpToDate
            } else {
                MergeStatus::Clean
            }
        } else if stdout.contains("CONFLICT") || stderr.contains("CONFLICT") {
            MergeStatus::Conflicted
        } else {
            MergeStatus::Failed { exit_code }
        };
        Self {
            status,
            stdout,
            stderr,
        }
    }

    /// stdout followed by stderr, trimmed.
    #[must_use]
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.trim_end().to_owned();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}
