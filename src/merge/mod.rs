//! Merge the target branch into the PR branch, auto-resolving what is safe.
//!
//! - **state**: [`MergeState`] and the recorded [`StateTrail`].
//! - **guard**: [`MergeGuard`], which aborts an unfinished merge on drop.
//! - **orchestrator**: [`Orchestrator`], driving fetch → merge → resolve →
//!   commit or abort against any [`GitRepo`](prgate_git::GitRepo).

pub mod guard;
pub mod orchestrator;
pub mod state;

pub use guard::MergeGuard;
pub use orchestrator::{MergeOutcome, Orchestrator};
pub use state::{MergeState, StateTrail};
