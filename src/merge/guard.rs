//! Scoped ownership of an in-progress merge.

use prgate_git::{GitError, GitRepo};
use tracing::warn;

/// Aborts the in-progress merge when dropped while armed.
///
/// Armed when `Merging` begins. A commit or an explicit [`abort`] disarms it;
/// every other exit path (early return, `?`, unwinding) aborts.
///
/// [`abort`]: MergeGuard::abort
pub struct MergeGuard<'a> {
    repo: &'a dyn GitRepo,
    armed: bool,
}

impl<'a> MergeGuard<'a> {
    pub fn arm(repo: &'a dyn GitRepo) -> Self {
        Self { repo, armed: true }
    }

    /// The merge has been concluded; leave the tree alone.
    pub const fn disarm(&mut self) {
        self.armed = false;
    }

    /// Abort now and disarm.
    ///
    /// # Errors
    /// Whatever `git merge --abort` reports.
    pub fn abort(mut self) -> Result<(), GitError> {
        self.armed = false;
        self.repo.merge_abort()
    }
}

impl Drop for MergeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("merge left unfinished; aborting");
            if let Err(e) = self.repo.merge_abort() {
                warn!(error = %e, "merge --abort failed");
            }
        }
    }
}
