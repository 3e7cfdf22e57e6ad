//! The gated validation pipeline.
//!
//! ```text
//! merge → unit → gameplay → training → regression
//! ```
//!
//! Each phase yields a [`PhaseResult`]. The process exit code is a pure
//! function of the ordered results ([`exit_code`]): 0 approved, 1 test
//! failure, 2 regression, 3 infrastructure, 4 merge conflicts.

pub mod error;
pub mod phase;
pub mod runner;
pub mod verdict;

pub use error::PipelineError;
pub use phase::{Failure, Phase, PhaseOutcome, PhaseResult, highlights};
pub use runner::{Options, RunReport, Runner};
pub use verdict::{Verdict, exit_code};
