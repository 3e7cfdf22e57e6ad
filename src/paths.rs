//! Filesystem locations resolved once at startup.

use std::path::{Path, PathBuf};

use crate::config::GateConfig;

/// Every path the pipeline touches, resolved against the project directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    /// Project (repository) root; working directory of every invocation.
    pub project: PathBuf,
    /// Engine user-data directory holding the gameplay report.
    pub user_data: PathBuf,
    /// Gameplay report written by the engine.
    pub current_report: PathBuf,
    /// Directory for timestamped report copies.
    pub reports_dir: PathBuf,
    /// Baseline report for regression comparison.
    pub baseline: PathBuf,
    /// Conflict report written when a merge needs a human.
    pub conflict_report: PathBuf,
}

impl Paths {
    /// Resolve all paths for `project` from `config`.
    ///
    /// `baseline_override` (from the command line) wins over the configured
    /// baseline. Relative paths are taken relative to `project`.
    #[must_use]
    pub fn resolve(project: &Path, config: &GateConfig, baseline_override: Option<&Path>) -> Self {
        let user_data = config
            .engine
            .user_data_dir
            .as_deref()
            .map_or_else(|| default_user_data_dir(&config.engine.app_name), |p| project.join(p));
        let reports_dir = project.join(&config.regression.reports_dir);
        let baseline = baseline_override
            .or(config.regression.baseline.as_deref())
            .map_or_else(|| reports_dir.join("baseline.json"), |p| project.join(p));

        Self {
            project: project.to_owned(),
            current_report: user_data.join(&config.engine.report_file),
            user_data,
            reports_dir,
            baseline,
            conflict_report: project.join(&config.merge.conflict_report),
        }
    }
}

/// The engine's per-application user-data directory for this OS.
///
/// Linux: `~/.local/share/godot/app_userdata/<app>`; macOS:
/// `~/Library/Application Support/Godot/app_userdata/<app>`; Windows:
/// `%APPDATA%/Godot/app_userdata/<app>`.
#[must_use]
pub fn default_user_data_dir(app_name: &str) -> PathBuf {
    let engine_dir = if cfg!(target_os = "linux") {
        "godot"
    } else {
        "Godot"
    };
    // `dirs::data_dir` is ~/.local/share, ~/Library/Application Support and
    // %APPDATA% respectively.
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(engine_dir)
        .join("app_userdata")
        .join(app_name)
}
