//! Git plumbing for pr-gate.
//!
//! This crate defines the [`GitRepo`] trait: the narrow set of source-control
//! operations the merge orchestrator needs (fetch, no-commit merge, conflict
//! enumeration, stage, commit, abort). Callers program against the trait so
//! the orchestrator's state machine can be driven by a test double.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`MergeAttempt`],
//!   [`MergeStatus`]).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//! - [`cli`]: [`CliRepo`], the implementation that shells out to `git`.

pub mod cli;
pub mod error;
pub mod repo;
pub mod types;

pub use cli::CliRepo;
pub use error::GitError;
pub use repo::GitRepo;
pub use types::{MergeAttempt, MergeStatus};
