//! Conflict-marker scanning and block extraction.
//!
//! The scanner is a three-state machine (`Normal`, `InOurs`, `InTheirs`)
//! over the file's lines:
//!
//! ```text
//!   Normal --"<<<<<<< "--> InOurs --"======="--> InTheirs --">>>>>>> "--> Normal (emit region)
//!                           |  ^                   |
//!                           +--+ "<<<<<<< "        +--"<<<<<<< "--> InOurs (restart)
//! ```
//!
//! Regions that never reach a closing marker produce nothing. The same scan
//! drives both [`parse_conflicts`] and the rewriter, so block indices always
//! line up with marker triples in the text.

use std::path::Path;

use super::model::{ConflictBlock, LineEnding};

/// Opening marker prefix (`<<<<<<< ours-label`).
pub const OPEN_MARKER: &str = "<<<<<<< ";
/// Separator marker.
pub const SEPARATOR_MARKER: &str = "=======";
/// Closing marker prefix (`>>>>>>> theirs-label`).
pub const CLOSE_MARKER: &str = ">>>>>>> ";

/// Number of preceding lines kept as `context_before` by default.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

// ---------------------------------------------------------------------------
// Raw lines
// ---------------------------------------------------------------------------

/// One physical line: its content and its exact terminator (`""` for a final
/// line with no newline).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawLine<'a> {
    pub body: &'a str,
    pub eol: &'a str,
}

impl RawLine<'_> {
    pub(crate) fn ending(&self) -> LineEnding {
        if self.eol == "\r\n" {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

/// Split text into lines, keeping terminators aside so they can be
/// re-emitted byte-for-byte.
pub(crate) fn split_raw_lines(text: &str) -> Vec<RawLine<'_>> {
    text.split_inclusive('\n')
        .map(|chunk| {
            let without_lf = chunk.strip_suffix('\n').unwrap_or(chunk);
            let body = without_lf.strip_suffix('\r').unwrap_or(without_lf);
            RawLine {
                body,
                eol: &chunk[body.len()..],
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Line indices of one complete marker triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RegionSpan {
    pub open: usize,
    pub separator: usize,
    pub close: usize,
}

#[derive(Clone, Copy, Debug)]
enum ScanState {
    Normal,
    InOurs { open: usize },
    InTheirs { open: usize, separator: usize },
}

/// Find every complete conflict region, in file order.
pub(crate) fn scan_regions(lines: &[RawLine<'_>]) -> Vec<RegionSpan> {
    let mut spans = Vec::new();
    let mut state = ScanState::Normal;

    for (idx, line) in lines.iter().enumerate() {
        let body = line.body;
        state = match state {
            _ if body.starts_with(OPEN_MARKER) => ScanState::InOurs { open: idx },
            ScanState::InOurs { open } if body.starts_with(SEPARATOR_MARKER) => {
                ScanState::InTheirs {
                    open,
                    separator: idx,
                }
            }
            ScanState::InTheirs { open, separator } if body.starts_with(CLOSE_MARKER) => {
                spans.push(RegionSpan {
                    open,
                    separator,
                    close: idx,
                });
                ScanState::Normal
            }
            other => other,
        };
    }

    spans
}

// ---------------------------------------------------------------------------
// parse_conflicts
// ---------------------------------------------------------------------------

/// Extract one [`ConflictBlock`] per complete conflict region in `text`.
///
/// `context_lines` bounds how many preceding lines land in
/// `context_before`. Malformed input never errors: incomplete regions are
/// simply absent from the result.
#[must_use]
pub fn parse_conflicts(file_path: &Path, text: &str, context_lines: usize) -> Vec<ConflictBlock> {
    let lines = split_raw_lines(text);
    scan_regions(&lines)
        .into_iter()
        .map(|span| {
            let collect = |range: std::ops::Range<usize>| -> Vec<String> {
                lines[range].iter().map(|l| l.body.to_owned()).collect()
            };
            let context_start = span.open.saturating_sub(context_lines);
            let context_before = lines[context_start..span.open]
                .iter()
                .map(|l| l.body)
                .collect::<Vec<_>>()
                .join("\n");

            let mut block = ConflictBlock::new(
                file_path,
                collect(span.open + 1..span.separator),
                collect(span.separator + 1..span.close),
                context_before,
            );
            block.line_ending = lines[span.open].ending();
            block
        })
        .collect()
}

/// `true` if `text` still contains any marker line.
#[must_use]
pub fn has_marker_lines(text: &str) -> bool {
    split_raw_lines(text).iter().any(|l| {
        l.body.starts_with(OPEN_MARKER)
            || l.body.starts_with(SEPARATOR_MARKER)
            || l.body.starts_with(CLOSE_MARKER)
    })
}
