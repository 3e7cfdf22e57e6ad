//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo)
//! methods. A merge that stops on content conflicts is *not* an error; it is
//! reported through [`MergeStatus::Conflicted`](crate::MergeStatus::Conflicted).
//! Errors here mean git itself could not do what was asked.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A git command ran but exited unsuccessfully.
    #[error("`git {command}` failed{}: {stderr}", exit_suffix(*exit_code))]
    CommandFailed {
        /// The git subcommand and arguments (e.g. `"commit -m ..."`).
        command: String,
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Trimmed stderr from git.
        stderr: String,
    },

    /// The directory is not inside a git work tree.
    #[error("not a git repository: {}", path.display())]
    NotARepository {
        /// The directory that was checked.
        path: PathBuf,
    },

    /// An I/O error occurred (most often: the `git` executable is missing).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GitError {
    /// Build a [`GitError::CommandFailed`] from a finished git process.
    pub(crate) fn from_output(args: &[&str], output: &std::process::Output) -> Self {
        Self::CommandFailed {
            command: args.join(" "),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }
    }
}

fn exit_suffix(code: Option<i32>) -> String {
    code.map(|c| format!(" (exit {c})")).unwrap_or_default()
}
