//! Merge orchestrator states and their legal transitions.
//!
//! ```text
//! Idle → Fetching → Merging ─┬→ UpToDate
//!                            ├→ Clean ──────┬→ Committed
//!                            ├→ Conflicted ─┼→ ManualRequired
//!                            │              │
//!                            └──────────────┴→ Aborted
//! ```
//!
//! `Aborted` means an infrastructure failure; `ManualRequired` means the
//! merge was rolled back because some block needs a human. Both leave the
//! working tree as it was before `Merging`.

use std::fmt;

use tracing::debug;

/// One state of a merge attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeState {
    Idle,
    Fetching,
    Merging,
    /// Nothing to merge; no commit is made.
    UpToDate,
    Clean,
    Conflicted,
    Committed,
    ManualRequired,
    Aborted,
}

impl MergeState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::UpToDate | Self::Committed | Self::ManualRequired | Self::Aborted
        )
    }

    /// States reachable in one step.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::Fetching, Self::Aborted],
            Self::Fetching => &[Self::Merging, Self::Aborted],
            Self::Merging => &[Self::UpToDate, Self::Clean, Self::Conflicted, Self::Aborted],
            Self::Clean => &[Self::Committed, Self::Aborted],
            Self::Conflicted => &[Self::Committed, Self::ManualRequired, Self::Aborted],
            Self::UpToDate | Self::Committed | Self::ManualRequired | Self::Aborted => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::UpToDate => "up-to-date",
            Self::Clean => "clean",
            Self::Conflicted => "conflicted",
            Self::Committed => "committed",
            Self::ManualRequired => "manual-required",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// The sequence of states one attempt went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTrail(Vec<MergeState>);

impl StateTrail {
    #[must_use]
    pub fn new() -> Self {
        Self(vec![MergeState::Idle])
    }

    #[must_use]
    pub fn current(&self) -> MergeState {
        self.0.last().copied().unwrap_or(MergeState::Idle)
    }

    /// Move to `next`.
    ///
    /// An illegal transition is a bug in the orchestrator.
    pub fn advance(&mut self, next: MergeState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal merge state transition {from} → {next}"
        );
        debug!(%from, to = %next, "merge state");
        self.0.push(next);
    }

    #[must_use]
    pub fn states(&self) -> &[MergeState] {
        &self.0
    }
}

impl Default for StateTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StateTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}
