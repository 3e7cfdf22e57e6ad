//! pr-gate library crate.
//!
//! The primary interface is the `prgate` binary. The library exposes the
//! pipeline pieces so integration tests and benchmarks can drive them
//! directly:
//!
//! - [`conflict`]: parse conflict markers, classify blocks, rewrite files.
//! - [`merge`]: the merge orchestrator state machine.
//! - [`regression`]: report model, comparator, report history.
//! - [`pipeline`]: phases, runner, and the exit-code verdict.

pub mod cancel;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod exec;
pub mod merge;
pub mod paths;
pub mod pipeline;
pub mod regression;
pub mod telemetry;
