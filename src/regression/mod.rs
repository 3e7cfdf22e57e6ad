//! Regression detection against a stored baseline report.

pub mod compare;
pub mod report;
pub mod store;

pub use compare::{Comparator, Comparison, MetricChange, MetricKind, Regression, percent_change};
pub use report::{GameplayReport, ReportError, ScenarioRecord, Summary};
pub use store::{archive_name, archive_report, seed_baseline};
