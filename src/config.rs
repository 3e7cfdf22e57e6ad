//! pr-gate configuration (`.prgate/config.toml`).
//!
//! Defines the typed configuration for merge resolution policy, the external
//! engine binary, per-phase invocation settings, and regression thresholds.
//! Every field has a default, so a missing file is equivalent to an empty one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::conflict::{DEFAULT_CONTEXT_LINES, DeclarationPolicy};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level pr-gate configuration.
///
/// Parsed from `.prgate/config.toml`. Missing fields use defaults.
/// Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Merge and conflict-resolution settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// External engine binary settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-phase invocation settings.
    #[serde(default)]
    pub phases: PhasesConfig,

    /// Regression comparison settings.
    #[serde(default)]
    pub regression: RegressionConfig,

    /// Console output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// Merge behaviour settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Branch merged into the PR branch (default: `"main"`).
    #[serde(default = "default_target")]
    pub target: String,

    /// Remote fetched before merging (default: `"origin"`).
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Conflict report path, relative to the project (default:
    /// `"conflict_report.md"`).
    #[serde(default = "default_conflict_report")]
    pub conflict_report: PathBuf,

    /// Line prefixes treated as order-insensitive declarations by the
    /// declaration-merge rule.
    #[serde(default = "DeclarationPolicy::default_prefixes")]
    pub declaration_prefixes: Vec<String>,

    /// Unconflicted lines kept as context before each block.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            remote: default_remote(),
            conflict_report: default_conflict_report(),
            declaration_prefixes: DeclarationPolicy::default_prefixes(),
            context_lines: default_context_lines(),
        }
    }
}

impl MergeConfig {
    /// The declaration policy described by `declaration_prefixes`.
    #[must_use]
    pub fn declaration_policy(&self) -> DeclarationPolicy {
        DeclarationPolicy::new(self.declaration_prefixes.iter().cloned())
    }
}

fn default_target() -> String {
    "main".to_owned()
}

fn default_remote() -> String {
    "origin".to_owned()
}

fn default_conflict_report() -> PathBuf {
    PathBuf::from("conflict_report.md")
}

const fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Where to find the engine binary and the report it writes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Explicit binary path. Overrides `candidates`.
    pub binary: Option<PathBuf>,

    /// Executable names searched on `PATH`, in order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Application name under the engine's user-data directory.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Explicit user-data directory. Overrides the OS-dependent default.
    pub user_data_dir: Option<PathBuf>,

    /// File name of the gameplay report inside the user-data directory.
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: None,
            candidates: default_candidates(),
            app_name: default_app_name(),
            user_data_dir: None,
            report_file: default_report_file(),
        }
    }
}

fn default_candidates() -> Vec<String> {
    vec!["godot".to_owned(), "godot4".to_owned()]
}

fn default_app_name() -> String {
    "Evolve".to_owned()
}

fn default_report_file() -> String {
    "gameplay_test_report.json".to_owned()
}

// ---------------------------------------------------------------------------
// PhasesConfig
// ---------------------------------------------------------------------------

/// Settings for the three engine-invoking phases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhasesConfig {
    /// Unit test phase.
    #[serde(default)]
    pub unit: UnitConfig,

    /// Gameplay scenario phase.
    #[serde(default)]
    pub gameplay: GameplayConfig,

    /// Training smoke phase.
    #[serde(default)]
    pub training: TrainingConfig,
}

/// One external-invocation phase, as the runner sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseConfig {
    /// Script passed to the engine (`--script`), relative to the project.
    pub script: String,

    /// Wall-clock limit in seconds; exceeding it is an infrastructure failure.
    pub timeout_seconds: u32,

    /// `false` skips the phase.
    pub enabled: bool,

    /// Extra attempts when the engine crashes (killed by a signal). Timeouts
    /// and non-zero exits are never retried.
    pub retries_on_crash: u32,

    /// Pause before a crash retry, in seconds.
    pub cooldown_seconds: u32,
}

/// The unit test phase.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    #[serde(default = "default_unit_script")]
    pub script: String,

    #[serde(default = "default_unit_timeout")]
    pub timeout_seconds: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub retries_on_crash: u32,

    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u32,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            script: default_unit_script(),
            timeout_seconds: default_unit_timeout(),
            enabled: true,
            retries_on_crash: 0,
            cooldown_seconds: default_cooldown(),
        }
    }
}

impl UnitConfig {
    #[must_use]
    pub fn phase(&self) -> PhaseConfig {
        PhaseConfig {
            script: self.script.clone(),
            timeout_seconds: self.timeout_seconds,
            enabled: self.enabled,
            retries_on_crash: self.retries_on_crash,
            cooldown_seconds: self.cooldown_seconds,
        }
    }
}

/// The training smoke phase.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    #[serde(default = "default_training_script")]
    pub script: String,

    #[serde(default = "default_training_timeout")]
    pub timeout_seconds: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub retries_on_crash: u32,

    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            script: default_training_script(),
            timeout_seconds: default_training_timeout(),
            enabled: true,
            retries_on_crash: 0,
            cooldown_seconds: default_cooldown(),
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn phase(&self) -> PhaseConfig {
        PhaseConfig {
            script: self.script.clone(),
            timeout_seconds: self.timeout_seconds,
            enabled: self.enabled,
            retries_on_crash: self.retries_on_crash,
            cooldown_seconds: self.cooldown_seconds,
        }
    }
}

/// The gameplay phase: phase settings plus scenario selection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameplayConfig {
    /// Script passed to the engine.
    #[serde(default = "default_gameplay_script")]
    pub script: String,

    /// Wall-clock limit in seconds.
    #[serde(default = "default_gameplay_timeout")]
    pub timeout_seconds: u32,

    /// Set to `false` to skip the phase.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Extra attempts on crash.
    #[serde(default)]
    pub retries_on_crash: u32,

    /// Pause before a crash retry, in seconds.
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u32,

    /// Scenario selector for a full run.
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Scenario selector in quick mode.
    #[serde(default = "default_quick_scenario")]
    pub quick_scenario: String,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            script: default_gameplay_script(),
            timeout_seconds: default_gameplay_timeout(),
            enabled: true,
            retries_on_crash: 0,
            cooldown_seconds: default_cooldown(),
            scenario: default_scenario(),
            quick_scenario: default_quick_scenario(),
        }
    }
}

impl GameplayConfig {
    /// The plain phase settings.
    #[must_use]
    pub fn phase(&self) -> PhaseConfig {
        PhaseConfig {
            script: self.script.clone(),
            timeout_seconds: self.timeout_seconds,
            enabled: self.enabled,
            retries_on_crash: self.retries_on_crash,
            cooldown_seconds: self.cooldown_seconds,
        }
    }

    /// Scenario selector for the given mode.
    #[must_use]
    pub fn scenario_for(&self, quick: bool) -> &str {
        if quick {
            &self.quick_scenario
        } else {
            &self.scenario
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_cooldown() -> u32 {
    5
}

fn default_unit_script() -> String {
    "test/test_runner.gd".to_owned()
}

const fn default_unit_timeout() -> u32 {
    60
}

fn default_training_script() -> String {
    "test/integration/training_smoke_test.gd".to_owned()
}

const fn default_training_timeout() -> u32 {
    120
}

fn default_gameplay_script() -> String {
    "test/integration/gameplay_test_runner.gd".to_owned()
}

const fn default_gameplay_timeout() -> u32 {
    180
}

fn default_scenario() -> String {
    "all".to_owned()
}

fn default_quick_scenario() -> String {
    "boot_and_run".to_owned()
}

// ---------------------------------------------------------------------------
// RegressionConfig
// ---------------------------------------------------------------------------

/// Regression comparison settings.
///
/// Gameplay thresholds are negative percentages (a drop below them is a
/// regression); performance thresholds are positive percentages (a rise
/// above them is a regression).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegressionConfig {
    /// Directory for timestamped report copies, relative to the project.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Baseline report. Default: `<reports_dir>/baseline.json`.
    pub baseline: Option<PathBuf>,

    /// Count new-scenario warnings as regressions.
    #[serde(default)]
    pub strict: bool,

    /// Gameplay metric → threshold percent (negative).
    #[serde(default = "default_gameplay_thresholds")]
    pub gameplay_thresholds: BTreeMap<String, f64>,

    /// Performance metric → threshold percent (positive).
    #[serde(default = "default_performance_thresholds")]
    pub performance_thresholds: BTreeMap<String, f64>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            baseline: None,
            strict: false,
            gameplay_thresholds: default_gameplay_thresholds(),
            performance_thresholds: default_performance_thresholds(),
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("test/integration/reports")
}

fn default_gameplay_thresholds() -> BTreeMap<String, f64> {
    [
        ("score", -10.0),
        ("kills", -10.0),
        ("survival_time", -10.0),
        ("powerups_collected", -20.0),
        ("score_from_kills", -10.0),
        ("score_from_powerups", -10.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

fn default_performance_thresholds() -> BTreeMap<String, f64> {
    [
        ("avg_frame_ms", 30.0),
        ("max_frame_ms", 50.0),
        ("peak_memory_mb", 30.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Console output settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Lines of captured output shown when a phase fails.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
        }
    }
}

const fn default_tail_lines() -> usize {
    40
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl GateConfig {
    /// Default location relative to the project root.
    pub const DEFAULT_PATH: &'static str = ".prgate/config.toml";

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or thresholds
    /// with the wrong sign.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError {
            path: None,
            message,
        };
        for (metric, t) in &self.regression.gameplay_thresholds {
            if !(*t < 0.0) {
                return Err(invalid(format!(
                    "regression.gameplay_thresholds.{metric} must be negative (got {t})"
                )));
            }
        }
        for (metric, t) in &self.regression.performance_thresholds {
            if !(*t > 0.0) {
                return Err(invalid(format!(
                    "regression.performance_thresholds.{metric} must be positive (got {t})"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
