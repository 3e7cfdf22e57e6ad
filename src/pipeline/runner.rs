//! Runs the phases in order and reports progress.
//!
//! Progress goes to the supplied writer (stdout in the binary). Phases run
//! one at a time; the first hard failure ends the run. Infrastructure
//! problems inside a phase become [`Failure::Infrastructure`] results rather
//! than errors, so the verdict stays a function of the result list.

use std::fs;
use std::io::Write;
use std::time::{Duration, Instant};

use chrono::Local;
use prgate_git::GitRepo;
use tracing::{info, info_span, warn};

use crate::cancel::CancelToken;
use crate::config::{GateConfig, PhaseConfig};
use crate::conflict::render_conflict_report;
use crate::engine::Engine;
use crate::exec::{self, CommandResult, tail_lines};
use crate::merge::Orchestrator;
use crate::paths::Paths;
use crate::regression::{Comparator, GameplayReport, archive_report, seed_baseline};

use super::error::PipelineError;
use super::phase::{Failure, Phase, PhaseOutcome, PhaseResult, highlights};
use super::verdict::Verdict;

const RULE_WIDTH: usize = 50;

/// Command-line switches for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Reduced gameplay scenario; no training or regression phase.
    pub quick: bool,
    pub skip_training: bool,
    pub no_merge: bool,
    /// Overrides `merge.target`.
    pub merge_target: Option<String>,
}

/// The ordered results of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<PhaseResult>,
    pub elapsed: Duration,
}

impl RunReport {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::from_results(&self.results)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.verdict().exit_code()
    }
}

/// Drives one validation run.
pub struct Runner<'a> {
    config: &'a GateConfig,
    paths: &'a Paths,
    engine: Engine,
    repo: Option<&'a dyn GitRepo>,
    options: Options,
    cancel: CancelToken,
}

impl<'a> Runner<'a> {
    /// `repo` is required unless `options.no_merge` is set; it is also used
    /// to name archived reports after the current branch.
    pub const fn new(
        config: &'a GateConfig,
        paths: &'a Paths,
        engine: Engine,
        repo: Option<&'a dyn GitRepo>,
        options: Options,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            paths,
            engine,
            repo,
            options,
            cancel,
        }
    }

    /// Run every phase, print a summary, and return the results.
    ///
    /// # Errors
    /// [`PipelineError::Cancelled`] when interrupted, and
    /// [`PipelineError::Output`] when `out` cannot be written.
    pub fn run(&self, out: &mut dyn Write) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(Phase::ALL.len());
        let mut branch = None;

        for phase in Phase::ALL {
            self.check_cancelled()?;
            let _span = info_span!("phase", %phase).entered();
            let result = match phase {
                Phase::Merge => self.merge_phase(out, &mut branch)?,
                Phase::Unit => {
                    self.engine_phase(out, phase, &self.config.phases.unit.phase(), None)?
                }
                Phase::Gameplay => {
                    let gameplay = &self.config.phases.gameplay;
                    let scenario = gameplay.scenario_for(self.options.quick);
                    self.engine_phase(out, phase, &gameplay.phase(), Some(scenario))?
                }
                Phase::Training => self.training_phase(out)?,
                Phase::Regression => self.regression_phase(out, branch.as_deref())?,
            };
            info!(
                outcome = ?result.outcome,
                elapsed_ms = result.elapsed.as_millis(),
                "phase finished"
            );
            let blocking = result.is_blocking();
            results.push(result);
            if blocking {
                break;
            }
        }

        let report = RunReport {
            results,
            elapsed: start.elapsed(),
        };
        print_summary(out, &report)?;
        Ok(report)
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Phase 0: merge
    // -----------------------------------------------------------------------

    fn merge_phase(
        &self,
        out: &mut dyn Write,
        branch: &mut Option<String>,
    ) -> Result<PhaseResult, PipelineError> {
        let phase = Phase::Merge;
        if self.options.no_merge {
            writeln!(out, "\n  ⏭ Merge conflict check skipped")?;
            return Ok(PhaseResult::skipped(phase));
        }
        header(out, phase.title())?;
        let start = Instant::now();
        let Some(repo) = self.repo else {
            let msg = format!("{} is not a git repository", self.paths.project.display());
            writeln!(out, "  ✗ {msg}")?;
            return Ok(failed(phase, Failure::Infrastructure, msg, start));
        };

        let mut orchestrator = Orchestrator::new(repo, &self.config.merge, self.cancel.clone());
        if let Some(t) = &self.options.merge_target {
            orchestrator = orchestrator.with_target(t.clone());
        }
        if let Ok(Some(b)) = repo.current_branch() {
            writeln!(out, "  PR branch:     {b}")?;
        }
        writeln!(out, "  Target branch: {}", orchestrator.target())?;

        let outcome = orchestrator.run();
        branch.clone_from(&outcome.branch);
        let report = &outcome.report;
        info!(trail = %outcome.trail, "merge finished");
        self.check_cancelled()?;

        for f in &report.auto_resolved_files {
            writeln!(out, "    ✓ Auto-resolved: {}", f.display())?;
        }

        if report.needs_manual() {
            let text = render_conflict_report(report);
            match fs::write(&self.paths.conflict_report, &text) {
                Ok(()) => writeln!(
                    out,
                    "\n  Conflict report saved to: {}",
                    self.paths.conflict_report.display()
                )?,
                Err(e) => warn!(
                    error = %e,
                    path = %self.paths.conflict_report.display(),
                    "could not save conflict report"
                ),
            }
            writeln!(out, "{text}")?;
            writeln!(
                out,
                "  ✗ {} conflict(s) require manual resolution",
                report.manual_conflicts.len()
            )?;
            return Ok(failed(phase, Failure::Conflicts, text, start));
        }
        if let Some(e) = &report.error {
            writeln!(out, "  ✗ Merge error: {e}")?;
            return Ok(failed(phase, Failure::Infrastructure, e.clone(), start));
        }

        let summary = if report.auto_resolved_files.is_empty() {
            "Clean merge, no conflicts".to_owned()
        } else {
            format!(
                "All conflicts auto-resolved and committed ({} files)",
                report.auto_resolved_files.len()
            )
        };
        writeln!(out, "  ✓ {summary}")?;
        Ok(PhaseResult::new(phase, PhaseOutcome::Passed, summary, start.elapsed()))
    }

    // -----------------------------------------------------------------------
    // Phases 1-3: engine invocations
    // -----------------------------------------------------------------------

    fn training_phase(&self, out: &mut dyn Write) -> Result<PhaseResult, PipelineError> {
        if self.options.quick || self.options.skip_training {
            writeln!(out, "\n  ⏭ Training smoke test skipped")?;
            return Ok(PhaseResult::skipped(Phase::Training));
        }
        self.engine_phase(out, Phase::Training, &self.config.phases.training.phase(), None)
    }

    fn engine_phase(
        &self,
        out: &mut dyn Write,
        phase: Phase,
        cfg: &PhaseConfig,
        scenario: Option<&str>,
    ) -> Result<PhaseResult, PipelineError> {
        if !cfg.enabled {
            writeln!(out, "\n  ⏭ {} disabled", phase.noun())?;
            return Ok(PhaseResult::skipped(phase));
        }
        header(out, phase.title())?;
        let start = Instant::now();
        let inv = self.engine.invocation(
            &cfg.script,
            scenario,
            Duration::from_secs(cfg.timeout_seconds.into()),
        );
        writeln!(out, "  Running: {}", inv.display())?;

        let result = match exec::run_with_retries(
            &inv,
            cfg.retries_on_crash,
            Duration::from_secs(cfg.cooldown_seconds.into()),
            &self.cancel,
        ) {
            Ok(r) => r,
            Err(e) => {
                writeln!(out, "  [{}] {e}", phase.label())?;
                writeln!(out, "  ✗ {} could not run", phase.noun())?;
                return Ok(failed(phase, Failure::Infrastructure, e.to_string(), start));
            }
        };
        if result.cancelled || self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let output = result.combined_output();
        for line in highlights(&output, phase.highlight_keywords()) {
            writeln!(out, "    {line}")?;
        }

        if result.passed() {
            writeln!(out, "  ✓ {} passed", phase.noun())?;
            return Ok(PhaseResult::new(phase, PhaseOutcome::Passed, output, start.elapsed()));
        }

        let failure = describe_failure(out, phase, &result, cfg.timeout_seconds)?;
        for line in tail_lines(&output, self.config.output.tail_lines) {
            writeln!(out, "    {line}")?;
        }
        writeln!(out, "  ✗ {} FAILED", phase.noun())?;
        Ok(failed(phase, failure, output, start))
    }

    // -----------------------------------------------------------------------
    // Phase 4: regression
    // -----------------------------------------------------------------------

    fn regression_phase(
        &self,
        out: &mut dyn Write,
        branch: Option<&str>,
    ) -> Result<PhaseResult, PipelineError> {
        let phase = Phase::Regression;
        if self.options.quick {
            return Ok(PhaseResult::skipped(phase));
        }
        header(out, phase.title())?;
        let start = Instant::now();
        let paths = self.paths;

        if !paths.current_report.exists() {
            writeln!(out, "  ⚠ No gameplay report found, skipping regression check")?;
            return Ok(PhaseResult::skipped(phase));
        }

        let branch = branch.map_or_else(|| self.current_branch(), str::to_owned);
        let archived = archive_report(
            &paths.current_report,
            &paths.reports_dir,
            &branch,
            Local::now(),
        );
        let saved = match archived {
            Ok(p) => p,
            Err(e) => return infra(out, phase, &e.to_string(), start),
        };
        writeln!(
            out,
            "  Report saved: {}",
            saved.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
        )?;

        match seed_baseline(&saved, &paths.baseline) {
            Ok(true) => {
                writeln!(out, "  ⚠ No baseline found, saving current as baseline")?;
                return Ok(PhaseResult::new(
                    phase,
                    PhaseOutcome::Passed,
                    "baseline created".to_owned(),
                    start.elapsed(),
                ));
            }
            Ok(false) => {}
            Err(e) => return infra(out, phase, &e.to_string(), start),
        }

        let loaded = (
            GameplayReport::load(&paths.baseline),
            GameplayReport::load(&saved),
        );
        let (baseline, current) = match loaded {
            (Ok(b), Ok(c)) => (b, c),
            (Err(e), _) | (_, Err(e)) => return infra(out, phase, &e.to_string(), start),
        };
        let comparison =
            Comparator::from_config(&self.config.regression).compare(&baseline, &current);
        let text = comparison.to_string();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            writeln!(out, "    {line}")?;
        }

        if comparison.has_regressions() {
            writeln!(out, "  ⚠ REGRESSIONS DETECTED")?;
            Ok(failed(phase, Failure::Regression, text, start))
        } else {
            writeln!(out, "  ✓ No regressions detected")?;
            Ok(PhaseResult::new(phase, PhaseOutcome::Passed, text, start.elapsed()))
        }
    }

    fn current_branch(&self) -> String {
        self.repo
            .and_then(|r| r.current_branch().ok().flatten())
            .unwrap_or_else(|| "unknown".to_owned())
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn header(out: &mut dyn Write, text: &str) -> std::io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}\n  {text}\n{rule}")
}

fn failed(phase: Phase, failure: Failure, output: String, start: Instant) -> PhaseResult {
    PhaseResult::new(phase, PhaseOutcome::Failed(failure), output, start.elapsed())
}

fn infra(
    out: &mut dyn Write,
    phase: Phase,
    message: &str,
    start: Instant,
) -> Result<PhaseResult, PipelineError> {
    writeln!(out, "  ✗ {message}")?;
    Ok(failed(phase, Failure::Infrastructure, message.to_owned(), start))
}

/// Print why the command failed and classify it.
///
/// Timeouts are infrastructure failures; a non-zero exit or a crash that
/// survived its retries is a test failure.
fn describe_failure(
    out: &mut dyn Write,
    phase: Phase,
    result: &CommandResult,
    timeout_seconds: u32,
) -> Result<Failure, PipelineError> {
    let label = phase.label();
    if result.timed_out {
        writeln!(out, "  [{label}] TIMEOUT after {timeout_seconds}s")?;
        return Ok(Failure::Infrastructure);
    }
    match result.exit_code {
        Some(code) => writeln!(out, "  [{label}] Exit code: {code}")?,
        None => writeln!(out, "  [{label}] Terminated by signal")?,
    }
    Ok(Failure::Test)
}

fn print_summary(out: &mut dyn Write, report: &RunReport) -> std::io::Result<()> {
    header(out, "SUMMARY")?;
    for r in &report.results {
        let icon = match r.passed() {
            None => "⏭",
            Some(true) => "✓",
            Some(false) => "✗",
        };
        writeln!(
            out,
            "  {icon} {:<18} {:>7.1}s",
            r.phase.label(),
            r.elapsed.as_secs_f64()
        )?;
    }
    writeln!(out, "\n  Completed in {:.1}s", report.elapsed.as_secs_f64())?;
    writeln!(out, "\n{}", report.verdict())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
