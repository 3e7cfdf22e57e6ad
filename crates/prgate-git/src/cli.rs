//! [`CliRepo`]: a [`GitRepo`] backed by the `git` executable.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, instrument};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::MergeAttempt;

/// A git working tree driven through the `git` command line.
#[derive(Clone, Debug)]
pub struct CliRepo {
    root: PathBuf,
}

impl CliRepo {
    /// Open the work tree containing `dir`.
    ///
    /// # Errors
    /// [`GitError::NotARepository`] if `dir` is not inside a git work tree,
    /// [`GitError::IoError`] if `git` cannot be spawned.
    pub fn open(dir: &Path) -> Result<Self, GitError> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(GitError::NotARepository {
                path: dir.to_owned(),
            });
        }
        let top = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        Ok(Self {
            root: PathBuf::from(top),
        })
    }

    /// Output is forced to the C locale; merge classification matches
    /// git's English messages.
    fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(args = ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        Ok(output)
    }

    fn run_ok(&self, args: &[&str]) -> Result<Output, GitError> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(GitError::from_output(args, &output))
        }
    }
}

impl GitRepo for CliRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        let output = self.run_ok(&["branch", "--show-current"])?;
        let name = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        Ok((!name.is_empty()).then_some(name))
    }

    #[instrument(skip(self))]
    fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_ok(&["fetch", remote, branch]).map(|_| ())
    }

    #[instrument(skip(self))]
    fn merge_no_commit(&self, rev: &str) -> Result<MergeAttempt, GitError> {
        let output = self.run(&["merge", rev, "--no-commit", "--no-ff"])?;
        Ok(MergeAttempt::classify(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }

    fn conflicted_paths(&self) -> Result<Vec<PathBuf>, GitError> {
        let output = self.run_ok(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn stage(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run_ok(&["add", "--", &path]).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run_ok(&["commit", "--no-verify", "-m", message])
            .map(|_| ())
    }

    fn merge_abort(&self) -> Result<(), GitError> {
        self.run_ok(&["merge", "--abort"]).map(|_| ())
    }
}
