//! Conflict block and merge report data types.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// LineEnding
// ---------------------------------------------------------------------------

/// Line terminator style of a conflict region, taken from its opening marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator bytes as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictBlock
// ---------------------------------------------------------------------------

/// One conflicted region within one file.
///
/// `ours` and `theirs` hold the lines strictly between the markers, without
/// their terminators. Once a block is appended to a file's block list only
/// the resolution fields change, through [`ConflictBlock::resolve`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictBlock {
    /// File identifier, relative to the repository root.
    pub file_path: PathBuf,
    /// Lines from the current (PR) branch.
    pub ours: Vec<String>,
    /// Lines from the target branch.
    pub theirs: Vec<String>,
    /// Up to a few unconflicted lines preceding the block, for diagnostics.
    pub context_before: String,
    /// Terminator style used when re-emitting a resolution.
    #[serde(skip)]
    pub line_ending: LineEnding,
    resolved: bool,
    resolution: Vec<String>,
}

impl ConflictBlock {
    /// A fresh, unresolved block.
    #[must_use]
    pub fn new(
        file_path: impl Into<PathBuf>,
        ours: Vec<String>,
        theirs: Vec<String>,
        context_before: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            ours,
            theirs,
            context_before: context_before.into(),
            line_ending: LineEnding::Lf,
            resolved: false,
            resolution: Vec::new(),
        }
    }

    /// A placeholder block for a file git reported as conflicted but whose
    /// content could not be split into regions (binary, delete/modify, or
    /// missing file). Always unresolved.
    #[must_use]
    pub fn unparseable(file_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(file_path, Vec::new(), Vec::new(), reason)
    }

    /// Record the chosen final content.
    pub fn resolve(&mut self, lines: Vec<String>) {
        self.resolution = lines;
        self.resolved = true;
    }

    /// Whether a resolution has been recorded.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The resolution, only when [`is_resolved`](Self::is_resolved).
    #[must_use]
    pub fn resolution(&self) -> Option<&[String]> {
        self.resolved.then_some(self.resolution.as_slice())
    }
}

impl fmt::Display for ConflictBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} line(s) ours vs {} line(s) theirs",
            self.file_path.display(),
            self.ours.len(),
            self.theirs.len()
        )
    }
}

// ---------------------------------------------------------------------------
// MergeReport
// ---------------------------------------------------------------------------

/// Outcome of one merge attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// `true` when no file needs manual intervention and no error occurred.
    pub clean: bool,
    /// Files whose every block was resolved automatically.
    pub auto_resolved_files: BTreeSet<PathBuf>,
    /// Unresolved blocks across all files, in processing order.
    pub manual_conflicts: Vec<ConflictBlock>,
    /// Infrastructure-level merge failure (not a content conflict).
    pub error: Option<String>,
}

impl MergeReport {
    /// A report for a merge that needed no resolution.
    #[must_use]
    pub fn clean() -> Self {
        Self {
            clean: true,
            ..Self::default()
        }
    }

    /// A report for an infrastructure failure.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            clean: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// `true` when the merge must block on human resolution.
    #[must_use]
    pub fn needs_manual(&self) -> bool {
        !self.manual_conflicts.is_empty()
    }
}
