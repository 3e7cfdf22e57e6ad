//! The gameplay report emitted by the engine.
//!
//! ```json
//! {
//!   "summary": {"total": 3, "passed": 3, "failed": 0},
//!   "scenarios": [
//!     {"name": "boot_and_run", "passed": true, "errors": [],
//!      "gameplay": {"score": 120, "kills": 4},
//!      "performance": {"avg_frame_ms": 8.1}}
//!   ]
//! }
//! ```
//!
//! Every field defaults when absent. Unknown fields are ignored: the engine
//! owns this format and may add to it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Overall scenario counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: Option<u64>,
    pub passed: Option<u64>,
    pub failed: Option<u64>,
}

impl Summary {
    /// Failed count, `0` when absent.
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed.unwrap_or(0)
    }

    /// `"passed/total"` with `?` for missing counts.
    #[must_use]
    pub fn ratio(&self) -> String {
        let show = |v: Option<u64>| v.map_or_else(|| "?".to_owned(), |n| n.to_string());
        format!("{}/{}", show(self.passed), show(self.total))
    }
}

/// One scenario's outcome and metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub gameplay: BTreeMap<String, f64>,
    #[serde(default)]
    pub performance: BTreeMap<String, f64>,
}

impl ScenarioRecord {
    /// Gameplay metric, `0` when absent.
    #[must_use]
    pub fn gameplay_metric(&self, name: &str) -> f64 {
        self.gameplay.get(name).copied().unwrap_or(0.0)
    }

    /// Performance metric, `0` when absent.
    #[must_use]
    pub fn performance_metric(&self, name: &str) -> f64 {
        self.performance.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
struct RawReport {
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    scenarios: Vec<ScenarioRecord>,
}

/// A parsed report with scenarios keyed by name.
///
/// When a name repeats, the last record wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameplayReport {
    pub summary: Summary,
    pub scenarios: BTreeMap<String, ScenarioRecord>,
}

impl From<RawReport> for GameplayReport {
    fn from(raw: RawReport) -> Self {
        Self {
            summary: raw.summary,
            scenarios: raw
                .scenarios
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportError
// ---------------------------------------------------------------------------

/// Reading, parsing, or storing a report failed.
#[derive(Debug)]
pub enum ReportError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "{}: invalid report JSON: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "invalid report JSON: {source}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl GameplayReport {
    /// Parse a report from JSON text.
    ///
    /// # Errors
    /// [`ReportError::Parse`] on malformed JSON or mistyped fields.
    pub fn from_json(text: &str) -> Result<Self, ReportError> {
        serde_json::from_str::<RawReport>(text)
            .map(Self::from)
            .map_err(|source| ReportError::Parse { path: None, source })
    }

    /// Read and parse a report file.
    ///
    /// # Errors
    /// [`ReportError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_json`] with the path attached.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text).map_err(|e| match e {
            ReportError::Parse { source, .. } => ReportError::Parse {
                path: Some(path.to_owned()),
                source,
            },
            other @ ReportError::Io { .. } => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_report() {
        let json = r#"{
            "summary": {"total": 2, "passed": 1, "failed": 1},
            "scenarios": [
                {"name": "a", "passed": true, "errors": [],
                 "gameplay": {"score": 120, "kills": 4.5},
                 "performance": {"avg_frame_ms": 8.1}},
                {"name": "b", "passed": false, "errors": ["timeout"]}
            ],
            "generated_by": "engine 4.2"
        }"#;
        let r = GameplayReport::from_json(json).unwrap();
        assert_eq!(r.summary.failed_count(), 1);
        assert_eq!(r.summary.ratio(), "1/2");
        assert_eq!(r.scenarios.len(), 2);
        let a = &r.scenarios["a"];
        assert!(a.passed);
        assert_eq!(a.gameplay_metric("score"), 120.0);
        assert_eq!(a.gameplay_metric("kills"), 4.5);
        assert_eq!(a.gameplay_metric("survival_time"), 0.0);
        assert_eq!(a.performance_metric("avg_frame_ms"), 8.1);
        assert_eq!(r.scenarios["b"].errors, vec!["timeout"]);
    }

    #[test]
    fn empty_object_is_empty_report() {
        let r = GameplayReport::from_json("{}").unwrap();
        assert_eq!(r.summary.failed_count(), 0);
        assert_eq!(r.summary.ratio(), "?/?");
        assert!(r.scenarios.is_empty());
    }

    #[test]
    fn duplicate_names_keep_last() {
        let json = r#"{"scenarios": [
            {"name": "a", "passed": true},
            {"name": "a", "passed": false}
        ]}"#;
        let r = GameplayReport::from_json(json).unwrap();
        assert!(!r.scenarios["a"].passed);
    }

    #[test]
    fn scenario_without_name_is_rejected() {
        let err = GameplayReport::from_json(r#"{"scenarios": [{"passed": true}]}"#).unwrap_err();
        assert!(err.to_string().contains("name"), "{err}");
    }

    #[test]
    fn load_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "not json").unwrap();
        let err = GameplayReport::load(&path).unwrap_err();
        assert!(matches!(err, ReportError::Parse { path: Some(_), .. }));
        assert!(err.to_string().contains("report.json"));

        let missing = GameplayReport::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ReportError::Io { .. }));
    }
}
