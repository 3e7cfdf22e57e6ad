//! End-to-end merge attempt: fetch, merge, resolve, then commit or roll back.
//!
//! The orchestrator never leaves the checkout half-merged. Every path out of
//! `Merging` either commits or runs `git merge --abort`, the latter through
//! a [`MergeGuard`] so that early returns and unwinding are covered too.
//! Running it twice on a branch that merges cleanly makes two commits.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use prgate_git::{GitRepo, MergeAttempt, MergeStatus};
use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::config::MergeConfig;
use crate::conflict::{Classifier, ConflictBlock, MergeReport, resolve_text};

use super::guard::MergeGuard;
use super::state::{MergeState, StateTrail};

pub const DETACHED_HEAD: &str = "not on any branch (detached HEAD?)";
pub const FILE_NOT_FOUND: &str = "file not found after merge attempt";
pub const NO_MARKERS: &str = "no conflict markers found (binary or delete conflict?)";

/// What one run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    pub report: MergeReport,
    pub trail: StateTrail,
    /// The branch merged into, when it could be determined.
    pub branch: Option<String>,
}

impl MergeOutcome {
    #[must_use]
    pub fn final_state(&self) -> MergeState {
        self.trail.current()
    }
}

enum FileOutcome {
    Resolved,
    Manual(Vec<ConflictBlock>),
}

/// Merges the target branch into the checked-out branch.
pub struct Orchestrator<'a> {
    repo: &'a dyn GitRepo,
    target: String,
    remote: String,
    context_lines: usize,
    classifier: Classifier,
    cancel: CancelToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(repo: &'a dyn GitRepo, config: &MergeConfig, cancel: CancelToken) -> Self {
        Self {
            repo,
            target: config.target.clone(),
            remote: config.remote.clone(),
            context_lines: config.context_lines,
            classifier: Classifier::new(config.declaration_policy()),
            cancel,
        }
    }

    /// Override the configured target branch.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run one merge attempt.
    #[instrument(skip(self), fields(target = %self.target))]
    pub fn run(&self) -> MergeOutcome {
        let mut trail = StateTrail::new();
        let branch = match self.repo.current_branch() {
            Ok(Some(b)) => b,
            Ok(None) => return finish_failed(trail, None, DETACHED_HEAD.to_owned()),
            Err(e) => {
                return finish_failed(trail, None, format!("cannot determine current branch: {e}"));
            }
        };
        info!(branch = %branch, "merging {} into {branch}", self.target);

        trail.advance(MergeState::Fetching);
        if let Err(e) = self.repo.fetch(&self.remote, &self.target) {
            warn!(error = %e, "fetch failed; using local {}", self.target);
        }

        trail.advance(MergeState::Merging);
        let guard = MergeGuard::arm(self.repo);
        let attempt = match self.merge_target() {
            Ok(a) => a,
            Err(message) => return abort(trail, guard, branch, message),
        };

        match attempt.status {
            MergeStatus::UpToDate => {
                let mut guard = guard;
                guard.disarm();
                trail.advance(MergeState::UpToDate);
                info!("already up to date");
                done(trail, branch, MergeReport::clean())
            }
            MergeStatus::Clean => {
                trail.advance(MergeState::Clean);
                let message = format!("Merge {} into {branch} (auto, clean)", self.target);
                self.commit(trail, guard, branch, &message, MergeReport::clean())
            }
            MergeStatus::Conflicted => {
                trail.advance(MergeState::Conflicted);
                self.resolve_conflicts(trail, guard, branch)
            }
            MergeStatus::Failed { .. } => {
                let message = format!(
                    "merge failed (not a conflict): {}",
                    attempt.combined_output()
                );
                abort(trail, guard, branch, message)
            }
        }
    }

    /// `<remote>/<target>` first, then the local `<target>` when the remote
    /// ref cannot be merged for a non-conflict reason.
    fn merge_target(&self) -> Result<MergeAttempt, String> {
        let remote_rev = format!("{}/{}", self.remote, self.target);
        let attempt = self
            .repo
            .merge_no_commit(&remote_rev)
            .map_err(|e| format!("cannot run merge: {e}"))?;
        if !matches!(attempt.status, MergeStatus::Failed { .. }) {
            return Ok(attempt);
        }
        info!(
            rev = %remote_rev,
            status = %attempt.status,
            "retrying merge with local {}",
            self.target
        );
        self.repo
            .merge_no_commit(&self.target)
            .map_err(|e| format!("cannot run merge: {e}"))
    }

    fn resolve_conflicts(
        &self,
        trail: StateTrail,
        guard: MergeGuard<'_>,
        branch: String,
    ) -> MergeOutcome {
        let paths = match self.repo.conflicted_paths() {
            Ok(p) => p,
            Err(e) => {
                return abort(trail, guard, branch, format!("cannot list conflicted files: {e}"));
            }
        };
        info!(files = paths.len(), "merge conflicts detected");

        let mut report = MergeReport::default();
        for path in &paths {
            if self.cancel.is_cancelled() {
                return abort(trail, guard, branch, "cancelled".to_owned());
            }
            match self.resolve_file(path) {
                Ok(FileOutcome::Resolved) => {
                    if let Err(e) = self.repo.stage(path) {
                        let message = format!("cannot stage {}: {e}", path.display());
                        return abort(trail, guard, branch, message);
                    }
                    info!(file = %path.display(), "auto-resolved");
                    report.auto_resolved_files.insert(path.clone());
                }
                Ok(FileOutcome::Manual(blocks)) => {
                    info!(
                        file = %path.display(),
                        unresolved = blocks.len(),
                        "manual resolution needed"
                    );
                    report.manual_conflicts.extend(blocks);
                }
                Err(message) => return abort(trail, guard, branch, message),
            }
        }

        if report.manual_conflicts.is_empty() {
            report.clean = true;
            let files: Vec<String> = report
                .auto_resolved_files
                .iter()
                .map(|p| format!("  - {}", p.display()))
                .collect();
            let message = format!(
                "Merge {} into {branch} (auto-resolved conflicts)\n\nAuto-resolved files:\n{}",
                self.target,
                files.join("\n")
            );
            return self.commit(trail, guard, branch, &message, report);
        }

        let mut trail = trail;
        if let Err(e) = guard.abort() {
            report.error = Some(format!("merge --abort failed: {e}"));
        }
        trail.advance(MergeState::ManualRequired);
        info!(
            conflicts = report.manual_conflicts.len(),
            "conflicts require manual resolution"
        );
        done(trail, branch, report)
    }

    /// Parse, classify and rewrite one conflicted file in place.
    ///
    /// `Err` is an infrastructure failure (unreadable or unwritable file).
    fn resolve_file(&self, path: &Path) -> Result<FileOutcome, String> {
        let abs = self.repo.root().join(path);
        let bytes = match fs::read(&abs) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileOutcome::Manual(vec![ConflictBlock::unparseable(
                    path,
                    FILE_NOT_FOUND,
                )]));
            }
            Err(e) => return Err(format!("cannot read {}: {e}", path.display())),
        };
        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(FileOutcome::Manual(vec![ConflictBlock::unparseable(path, NO_MARKERS)]));
        };

        let resolution = resolve_text(path, &text, &self.classifier, self.context_lines)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        if !resolution.has_blocks() {
            return Ok(FileOutcome::Manual(vec![ConflictBlock::unparseable(path, NO_MARKERS)]));
        }
        if resolution.rewrite.text != text {
            fs::write(&abs, &resolution.rewrite.text)
                .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        }
        if resolution.rewrite.fully_resolved {
            Ok(FileOutcome::Resolved)
        } else {
            Ok(FileOutcome::Manual(resolution.unresolved().cloned().collect()))
        }
    }

    fn commit(
        &self,
        mut trail: StateTrail,
        mut guard: MergeGuard<'_>,
        branch: String,
        message: &str,
        report: MergeReport,
    ) -> MergeOutcome {
        match self.repo.commit(message) {
            Ok(()) => {
                guard.disarm();
                trail.advance(MergeState::Committed);
                info!("merge committed");
                done(trail, branch, report)
            }
            Err(e) => abort(trail, guard, branch, format!("commit failed: {e}")),
        }
    }
}

fn abort(
    mut trail: StateTrail,
    guard: MergeGuard<'_>,
    branch: String,
    message: String,
) -> MergeOutcome {
    warn!(error = %message, "aborting merge");
    if let Err(e) = guard.abort() {
        // Nothing to abort when git refused to start the merge.
        warn!(error = %e, "merge --abort failed");
    }
    trail.advance(MergeState::Aborted);
    finish_failed(trail, Some(branch), message)
}

fn finish_failed(mut trail: StateTrail, branch: Option<String>, message: String) -> MergeOutcome {
    if !trail.current().is_terminal() {
        trail.advance(MergeState::Aborted);
    }
    MergeOutcome {
        report: MergeReport::failed(message),
        trail,
        branch,
    }
}

fn done(trail: StateTrail, branch: String, report: MergeReport) -> MergeOutcome {
    MergeOutcome {
        report,
        trail,
        branch: Some(branch),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
