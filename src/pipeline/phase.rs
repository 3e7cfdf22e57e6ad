//! Phases, their outcomes, and per-phase results.

use std::fmt;
use std::time::Duration;

/// The validation phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Merge,
    Unit,
    Gameplay,
    Training,
    Regression,
}

impl Phase {
    pub const ALL: [Self; 5] = [
        Self::Merge,
        Self::Unit,
        Self::Gameplay,
        Self::Training,
        Self::Regression,
    ];

    /// Stable identifier used in the summary and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Merge => "merge_conflicts",
            Self::Unit => "unit_tests",
            Self::Gameplay => "gameplay_tests",
            Self::Training => "training_smoke",
            Self::Regression => "regression_check",
        }
    }

    /// Section header shown when the phase starts.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Merge => "Phase 0: Merge Conflict Check",
            Self::Unit => "Phase 1: Unit Tests",
            Self::Gameplay => "Phase 2: Gameplay Integration Tests",
            Self::Training => "Phase 3: Training Mode Smoke Test",
            Self::Regression => "Phase 4: Regression Check",
        }
    }

    /// Human name used in pass/fail lines.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Merge => "Merge",
            Self::Unit => "Unit tests",
            Self::Gameplay => "Gameplay tests",
            Self::Training => "Training smoke test",
            Self::Regression => "Regression check",
        }
    }

    /// Output lines containing any of these are echoed while reporting.
    #[must_use]
    pub const fn highlight_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Gameplay => &["PASS", "FAIL", "Result", "GAMEPLAY TEST"],
            Self::Training => &["PASS", "FAIL", "Gen", "ERROR", "Training"],
            Self::Merge | Self::Unit | Self::Regression => &[],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a phase failed. Each kind maps to one process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// A test phase exited non-zero.
    Test,
    /// Threshold violations against the baseline. The only soft failure.
    Regression,
    /// Missing binary, timeout, or a merge that failed for a non-content
    /// reason.
    Infrastructure,
    /// Merge conflicts that need a human.
    Conflicts,
}

impl Failure {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Test => 1,
            Self::Regression => 2,
            Self::Infrastructure => 3,
            Self::Conflicts => 4,
        }
    }

    /// Hard failures stop the pipeline.
    #[must_use]
    pub const fn is_hard(self) -> bool {
        !matches!(self, Self::Regression)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    Passed,
    Skipped,
    Failed(Failure),
}

/// The record of one phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseResult {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
    /// Captured output (or a diagnostic) for the phase.
    pub output: String,
    pub elapsed: Duration,
}

impl PhaseResult {
    #[must_use]
    pub const fn new(
        phase: Phase,
        outcome: PhaseOutcome,
        output: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            phase,
            outcome,
            output,
            elapsed,
        }
    }

    #[must_use]
    pub const fn skipped(phase: Phase) -> Self {
        Self::new(phase, PhaseOutcome::Skipped, String::new(), Duration::ZERO)
    }

    /// `Some(true)` passed, `Some(false)` failed, `None` skipped.
    #[must_use]
    pub const fn passed(&self) -> Option<bool> {
        match self.outcome {
            PhaseOutcome::Passed => Some(true),
            PhaseOutcome::Skipped => None,
            PhaseOutcome::Failed(_) => Some(false),
        }
    }

    #[must_use]
    pub const fn failure(&self) -> Option<Failure> {
        match self.outcome {
            PhaseOutcome::Failed(f) => Some(f),
            PhaseOutcome::Passed | PhaseOutcome::Skipped => None,
        }
    }

    /// A failure that halts the pipeline.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.failure().is_some_and(Failure::is_hard)
    }
}

/// Lines of `output` containing any of `keywords`, trimmed.
pub fn highlights<'a>(
    output: &'a str,
    keywords: &'a [&'a str],
) -> impl Iterator<Item = &'a str> + 'a {
    output
        .lines()
        .filter(move |line| keywords.iter().any(|k| line.contains(k)))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_fixed() {
        assert_eq!(Failure::Test.exit_code(), 1);
        assert_eq!(Failure::Regression.exit_code(), 2);
        assert_eq!(Failure::Infrastructure.exit_code(), 3);
        assert_eq!(Failure::Conflicts.exit_code(), 4);
    }

    #[test]
    fn only_regression_is_soft() {
        assert!(!Failure::Regression.is_hard());
        assert!(Failure::Test.is_hard());
        assert!(Failure::Infrastructure.is_hard());
        assert!(Failure::Conflicts.is_hard());
    }

    #[test]
    fn passed_is_tristate() {
        let d = Duration::from_secs(1);
        assert_eq!(
            PhaseResult::new(Phase::Unit, PhaseOutcome::Passed, String::new(), d).passed(),
            Some(true)
        );
        assert_eq!(PhaseResult::skipped(Phase::Training).passed(), None);
        let failed = PhaseResult::new(
            Phase::Regression,
            PhaseOutcome::Failed(Failure::Regression),
            String::new(),
            d,
        );
        assert_eq!(failed.passed(), Some(false));
        assert!(!failed.is_blocking());
    }

    #[test]
    fn phases_are_ordered() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
        assert_eq!(Phase::Merge.to_string(), "merge_conflicts");
    }

    #[test]
    fn highlights_filter_and_trim() {
        let out = "  boot ok\n  [PASS] boot_and_run\nnoise\n  Result: 3/3\n";
        let got: Vec<&str> = highlights(out, Phase::Gameplay.highlight_keywords()).collect();
        assert_eq!(got, vec!["[PASS] boot_and_run", "Result: 3/3"]);
        assert_eq!(highlights(out, Phase::Unit.highlight_keywords()).count(), 0);
    }

    #[test]
    fn training_keywords_match_generations() {
        let out = "Gen 1 best=3.2\nloading\nERROR: nan\n";
        let got: Vec<&str> = highlights(out, Phase::Training.highlight_keywords()).collect();
        assert_eq!(got, vec!["Gen 1 best=3.2", "ERROR: nan"]);
    }
}
