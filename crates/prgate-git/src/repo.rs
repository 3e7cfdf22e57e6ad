//! The [`GitRepo`] trait: the abstraction boundary between pr-gate and git.
//!
//! | Group    | Methods                                  | Replaces                          |
//! |----------|------------------------------------------|-----------------------------------|
//! | Identity | `root`, `current_branch`                 | `git branch --show-current`       |
//! | Remote   | `fetch`                                  | `git fetch <remote> <branch>`     |
//! | Merge    | `merge_no_commit`, `merge_abort`         | `git merge --no-commit --no-ff`   |
//! | Index    | `conflicted_paths`, `stage`              | `git diff --name-only --diff-filter=U`, `git add` |
//! | Commit   | `commit`                                 | `git commit -m`                   |

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::types::MergeAttempt;

/// Source-control operations used by the merge orchestrator.
///
/// Every method mutating the working tree or index assumes the caller owns
/// the checkout exclusively for the duration of the call.
///
/// # Object safety
///
/// The trait is object-safe; callers hold `&dyn GitRepo`.
pub trait GitRepo {
    /// Absolute path of the working tree root.
    fn root(&self) -> &Path;

    /// Name of the checked-out branch, `None` on a detached `HEAD`.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Fetch `branch` from `remote`.
    fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Merge `rev` into `HEAD` without committing and without fast-forward.
    ///
    /// A non-zero exit from git is *not* an `Err`: it is classified in the
    /// returned [`MergeAttempt`]. `Err` means git could not be run at all.
    fn merge_no_commit(&self, rev: &str) -> Result<MergeAttempt, GitError>;

    /// Paths (relative to [`root`](Self::root)) with unmerged index entries.
    fn conflicted_paths(&self) -> Result<Vec<PathBuf>, GitError>;

    /// Stage one path.
    fn stage(&self, path: &Path) -> Result<(), GitError>;

    /// Commit the index (concluding an in-progress merge if there is one).
    fn commit(&self, message: &str) -> Result<(), GitError>;

    /// Abort the in-progress merge, restoring the pre-merge tree.
    fn merge_abort(&self) -> Result<(), GitError>;
}
