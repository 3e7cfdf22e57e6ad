//! Baseline-vs-current comparison with asymmetric thresholds.
//!
//! Gameplay metrics regress when they drop by more than their (negative)
//! threshold and count as improvements only when they rise by more than
//! twice its magnitude. Performance metrics regress when they rise by more
//! than their (positive) threshold. A metric whose baseline is not positive
//! is never compared.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::config::RegressionConfig;

use super::report::{GameplayReport, ScenarioRecord, Summary};

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// Which metric table a change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Gameplay,
    Performance,
}

/// A thresholded change in one metric of one scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricChange {
    pub scenario: String,
    pub metric: String,
    pub kind: MetricKind,
    pub baseline: f64,
    pub current: f64,
    pub percent_change: f64,
    pub threshold: f64,
}

impl MetricChange {
    fn new(
        scenario: &str,
        metric: &str,
        kind: MetricKind,
        baseline: f64,
        current: f64,
        threshold: f64,
    ) -> Self {
        Self {
            scenario: scenario.to_owned(),
            metric: metric.to_owned(),
            kind,
            baseline,
            current,
            percent_change: percent_change(baseline, current),
            threshold,
        }
    }
}

/// `(current - baseline) / baseline * 100`. Caller guarantees `baseline > 0`.
#[must_use]
pub fn percent_change(baseline: f64, current: f64) -> f64 {
    (current - baseline) / baseline * 100.0
}

/// Something that got worse.
#[derive(Clone, Debug, PartialEq)]
pub enum Regression {
    /// The summary reports more failed scenarios than the baseline.
    MoreFailures { baseline: u64, current: u64 },
    /// A baseline scenario is absent from the current report.
    Missing { scenario: String },
    /// A scenario that passed now fails; metrics were not compared.
    PassToFail { scenario: String, errors: Vec<String> },
    /// A metric crossed its threshold.
    Metric(MetricChange),
}

impl fmt::Display for Regression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoreFailures { baseline, current } => {
                write!(f, "More failures: {baseline} → {current}")
            }
            Self::Missing { scenario } => write!(f, "{scenario}: MISSING from current report"),
            Self::PassToFail { scenario, errors } => {
                write!(f, "{scenario}: PASS → FAIL")?;
                for e in errors {
                    write!(f, "\n  → {e}")?;
                }
                Ok(())
            }
            Self::Metric(m) => match m.kind {
                MetricKind::Gameplay => write!(
                    f,
                    "{}/{}: {:.0} → {:.0} ({:+.1}%, threshold: {:.1}%)",
                    m.scenario, m.metric, m.baseline, m.current, m.percent_change, m.threshold
                ),
                MetricKind::Performance => write!(
                    f,
                    "{}/{}: {:.1} → {:.1} ({:+.1}%, threshold: +{:.1}%)",
                    m.scenario, m.metric, m.baseline, m.current, m.percent_change, m.threshold
                ),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Everything found by one comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comparison {
    pub baseline_summary: Summary,
    pub current_summary: Summary,
    pub regressions: Vec<Regression>,
    pub improvements: Vec<MetricChange>,
    /// Scenarios present only in the current report.
    pub new_scenarios: Vec<String>,
    /// Whether new scenarios count as regressions.
    pub strict: bool,
}

impl Comparison {
    /// The binary outcome.
    #[must_use]
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty() || (self.strict && !self.new_scenarios.is_empty())
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "  REGRESSION COMPARISON REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Baseline: {} passed", self.baseline_summary.ratio())?;
        writeln!(f, "Current:  {} passed", self.current_summary.ratio())?;
        writeln!(f)?;

        if !self.regressions.is_empty() {
            writeln!(f, "REGRESSIONS DETECTED:")?;
            for r in &self.regressions {
                for line in r.to_string().lines() {
                    writeln!(f, "  {line}")?;
                }
            }
            writeln!(f)?;
        }
        if !self.new_scenarios.is_empty() {
            writeln!(f, "Warnings:")?;
            for name in &self.new_scenarios {
                writeln!(f, "  {name}: NEW scenario (no baseline)")?;
            }
            writeln!(f)?;
        }
        if !self.improvements.is_empty() {
            writeln!(f, "Improvements:")?;
            for m in &self.improvements {
                writeln!(
                    f,
                    "  {}/{}: {:.0} → {:.0} ({:+.1}%)",
                    m.scenario, m.metric, m.baseline, m.current, m.percent_change
                )?;
            }
            writeln!(f)?;
        }
        if self.regressions.is_empty() {
            writeln!(f, "No regressions detected")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// Threshold tables plus strictness.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparator {
    gameplay: BTreeMap<String, f64>,
    performance: BTreeMap<String, f64>,
    strict: bool,
}

impl Comparator {
    #[must_use]
    pub const fn new(
        gameplay: BTreeMap<String, f64>,
        performance: BTreeMap<String, f64>,
        strict: bool,
    ) -> Self {
        Self {
            gameplay,
            performance,
            strict,
        }
    }

    #[must_use]
    pub fn from_config(config: &RegressionConfig) -> Self {
        Self::new(
            config.gameplay_thresholds.clone(),
            config.performance_thresholds.clone(),
            config.strict,
        )
    }

    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Compare `current` against `baseline`.
    #[must_use]
    pub fn compare(&self, baseline: &GameplayReport, current: &GameplayReport) -> Comparison {
        let mut out = Comparison {
            baseline_summary: baseline.summary.clone(),
            current_summary: current.summary.clone(),
            strict: self.strict,
            ..Comparison::default()
        };

        let (bf, cf) = (
            baseline.summary.failed_count(),
            current.summary.failed_count(),
        );
        if cf > bf {
            out.regressions.push(Regression::MoreFailures {
                baseline: bf,
                current: cf,
            });
        }

        for name in baseline.scenarios.keys() {
            if !current.scenarios.contains_key(name) {
                out.regressions.push(Regression::Missing {
                    scenario: name.clone(),
                });
            }
        }

        for (name, curr) in &current.scenarios {
            let Some(base) = baseline.scenarios.get(name) else {
                out.new_scenarios.push(name.clone());
                continue;
            };
            if base.passed && !curr.passed {
                out.regressions.push(Regression::PassToFail {
                    scenario: name.clone(),
                    errors: curr.errors.clone(),
                });
                continue;
            }
            self.compare_metrics(base, curr, &mut out);
        }

        info!(
            regressions = out.regressions.len(),
            improvements = out.improvements.len(),
            new_scenarios = out.new_scenarios.len(),
            "compared reports"
        );
        out
    }

    fn compare_metrics(&self, base: &ScenarioRecord, curr: &ScenarioRecord, out: &mut Comparison) {
        for (metric, &threshold) in &self.gameplay {
            let (bv, cv) = (base.gameplay_metric(metric), curr.gameplay_metric(metric));
            if bv <= 0.0 {
                continue;
            }
            let change =
                MetricChange::new(&base.name, metric, MetricKind::Gameplay, bv, cv, threshold);
            if change.percent_change < threshold {
                debug!(
                    scenario = %base.name,
                    metric,
                    pct = change.percent_change,
                    "gameplay regression"
                );
                out.regressions.push(Regression::Metric(change));
            } else if change.percent_change > threshold.abs() * 2.0 {
                out.improvements.push(change);
            }
        }

        for (metric, &threshold) in &self.performance {
            let (bv, cv) = (
                base.performance_metric(metric),
                curr.performance_metric(metric),
            );
            if bv <= 0.0 {
                continue;
            }
            let change =
                MetricChange::new(&base.name, metric, MetricKind::Performance, bv, cv, threshold);
            if change.percent_change > threshold {
                debug!(
                    scenario = %base.name,
                    metric,
                    pct = change.percent_change,
                    "performance regression"
                );
                out.regressions.push(Regression::Metric(change));
            }
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::from_config(&RegressionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(
        name: &str,
        passed: bool,
        gameplay: &[(&str, f64)],
        perf: &[(&str, f64)],
    ) -> ScenarioRecord {
        ScenarioRecord {
            name: name.to_owned(),
            passed,
            errors: Vec::new(),
            gameplay: gameplay.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
            performance: perf.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
        }
    }

    fn report(scenarios: Vec<ScenarioRecord>) -> GameplayReport {
        GameplayReport {
            summary: Summary::default(),
            scenarios: scenarios.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    fn score_only() -> Comparator {
        Comparator::new(
            [("score".to_owned(), -10.0)].into_iter().collect(),
            BTreeMap::new(),
            false,
        )
    }

    #[test]
    fn score_drop_past_threshold_regresses() {
        let base = report(vec![scenario("s", true, &[("score", 100.0)], &[])]);
        let curr = report(vec![scenario("s", true, &[("score", 85.0)], &[])]);
        let c = score_only().compare(&base, &curr);
        assert!(c.has_regressions());
        let Regression::Metric(m) = &c.regressions[0] else {
            panic!("expected metric regression, got {:?}", c.regressions[0]);
        };
        assert_eq!(m.metric, "score");
        assert!((m.percent_change + 15.0).abs() < 1e-9);
        assert_eq!(
            c.regressions[0].to_string(),
            "s/score: 100 → 85 (-15.0%, threshold: -10.0%)"
        );
    }

    #[test]
    fn score_drop_within_threshold_is_fine() {
        let base = report(vec![scenario("s", true, &[("score", 100.0)], &[])]);
        let curr = report(vec![scenario("s", true, &[("score", 95.0)], &[])]);
        let c = score_only().compare(&base, &curr);
        assert!(!c.has_regressions());
        assert!(c.improvements.is_empty());
    }

    #[test]
    fn improvement_needs_double_magnitude() {
        let base = report(vec![scenario("s", true, &[("score", 100.0)], &[])]);
        let modest = report(vec![scenario("s", true, &[("score", 115.0)], &[])]);
        assert!(score_only().compare(&base, &modest).improvements.is_empty());

        let big = report(vec![scenario("s", true, &[("score", 125.0)], &[])]);
        let c = score_only().compare(&base, &big);
        assert_eq!(c.improvements.len(), 1);
        assert!(!c.has_regressions());
    }

    #[test]
    fn pass_to_fail_skips_metrics() {
        let base = report(vec![scenario("s", true, &[("score", 100.0)], &[])]);
        let mut failing = scenario("s", false, &[("score", 10.0)], &[]);
        failing.errors = vec!["player died".to_owned()];
        let curr = report(vec![failing]);
        let c = score_only().compare(&base, &curr);
        assert_eq!(
            c.regressions,
            vec![Regression::PassToFail {
                scenario: "s".to_owned(),
                errors: vec!["player died".to_owned()],
            }]
        );
        assert_eq!(c.regressions[0].to_string(), "s: PASS → FAIL\n  → player died");
    }

    #[test]
    fn fail_to_fail_still_compares_metrics() {
        let base = report(vec![scenario("s", false, &[("score", 100.0)], &[])]);
        let curr = report(vec![scenario("s", false, &[("score", 50.0)], &[])]);
        let c = score_only().compare(&base, &curr);
        assert!(matches!(c.regressions[0], Regression::Metric(_)));
    }

    #[test]
    fn missing_scenario_regresses() {
        let base = report(vec![scenario("a", true, &[], &[]), scenario("b", true, &[], &[])]);
        let curr = report(vec![scenario("a", true, &[], &[])]);
        let c = score_only().compare(&base, &curr);
        assert_eq!(
            c.regressions,
            vec![Regression::Missing {
                scenario: "b".to_owned()
            }]
        );
        assert!(c.regressions[0].to_string().contains("MISSING"));
    }

    #[test]
    fn new_scenario_is_a_warning_unless_strict() {
        let base = report(vec![]);
        let curr = report(vec![scenario("fresh", true, &[], &[])]);
        let c = score_only().compare(&base, &curr);
        assert_eq!(c.new_scenarios, vec!["fresh"]);
        assert!(!c.has_regressions());

        let strict = score_only().with_strict(true).compare(&base, &curr);
        assert!(strict.has_regressions());
        assert!(strict.regressions.is_empty());
    }

    #[test]
    fn zero_baseline_is_skipped() {
        let base = report(vec![scenario("s", true, &[("score", 0.0)], &[("avg_frame_ms", 0.0)])]);
        let curr = report(vec![scenario("s", true, &[("score", 50.0)], &[("avg_frame_ms", 99.0)])]);
        let c = Comparator::default().compare(&base, &curr);
        assert!(c.regressions.is_empty());
        assert!(c.improvements.is_empty());
    }

    #[test]
    fn metric_missing_from_current_counts_as_zero() {
        let base = report(vec![scenario("s", true, &[("kills", 10.0)], &[])]);
        let curr = report(vec![scenario("s", true, &[], &[])]);
        let c = Comparator::default().compare(&base, &curr);
        let Regression::Metric(m) = &c.regressions[0] else {
            panic!("expected metric regression");
        };
        assert_eq!(m.metric, "kills");
        assert_eq!(m.current, 0.0);
        assert!((m.percent_change + 100.0).abs() < 1e-9);
    }

    #[test]
    fn performance_increase_past_threshold_regresses() {
        let base = report(vec![scenario(
            "s",
            true,
            &[],
            &[("avg_frame_ms", 10.0), ("peak_memory_mb", 100.0)],
        )]);
        let curr = report(vec![scenario(
            "s",
            true,
            &[],
            &[("avg_frame_ms", 14.0), ("peak_memory_mb", 120.0)],
        )]);
        let c = Comparator::default().compare(&base, &curr);
        assert_eq!(c.regressions.len(), 1);
        assert_eq!(
            c.regressions[0].to_string(),
            "s/avg_frame_ms: 10.0 → 14.0 (+40.0%, threshold: +30.0%)"
        );
    }

    #[test]
    fn performance_decrease_is_not_reported() {
        let base = report(vec![scenario("s", true, &[], &[("avg_frame_ms", 10.0)])]);
        let curr = report(vec![scenario("s", true, &[], &[("avg_frame_ms", 2.0)])]);
        let c = Comparator::default().compare(&base, &curr);
        assert!(c.regressions.is_empty());
        assert!(c.improvements.is_empty());
    }

    #[test]
    fn more_failures_in_summary_regresses() {
        let mut base = report(vec![]);
        base.summary.failed = Some(1);
        let mut curr = report(vec![]);
        curr.summary.failed = Some(2);
        let c = score_only().compare(&base, &curr);
        assert_eq!(
            c.regressions,
            vec![Regression::MoreFailures {
                baseline: 1,
                current: 2
            }]
        );
    }

    #[test]
    fn display_lists_sections() {
        let base = report(vec![
            scenario("a", true, &[("score", 100.0)], &[]),
            scenario("gone", true, &[], &[]),
        ]);
        let curr = report(vec![
            scenario("a", true, &[("score", 300.0)], &[]),
            scenario("new", true, &[], &[]),
        ]);
        let text = score_only().compare(&base, &curr).to_string();
        assert!(text.contains("REGRESSION COMPARISON REPORT"));
        assert!(text.contains("Baseline: ?/? passed"));
        assert!(text.contains("REGRESSIONS DETECTED:\n  gone: MISSING from current report"));
        assert!(text.contains("Warnings:\n  new: NEW scenario (no baseline)"));
        assert!(text.contains("Improvements:\n  a/score: 100 → 300 (+200.0%)"));
        assert!(!text.contains("No regressions detected"));
    }

    #[test]
    fn identical_reports_have_no_findings() {
        let r = report(vec![scenario("s", true, &[("score", 100.0)], &[("avg_frame_ms", 8.0)])]);
        let c = Comparator::default().compare(&r, &r);
        assert!(!c.has_regressions());
        assert!(c.to_string().ends_with("No regressions detected\n"));
    }
}
