//! In-place substitution of resolved conflict blocks.
//!
//! A single linear pass over the file's lines: region `i` found by the
//! scanner corresponds to `blocks[i]`. Resolved regions are replaced by their
//! resolution (no marker lines); unresolved regions and every line outside a
//! region are copied byte-for-byte, terminators included.

use std::fmt;

use super::model::ConflictBlock;
use super::parse::{scan_regions, split_raw_lines};

/// Result of rewriting one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    /// The new file text.
    pub text: String,
    /// `true` when every block was resolved (no markers remain from this pass).
    pub fully_resolved: bool,
}

/// The supplied blocks do not describe the text being rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewriteError {
    /// Number of marker triples in the text differs from the blocks supplied.
    BlockCountMismatch {
        /// Complete regions found in the text.
        found: usize,
        /// Blocks passed by the caller.
        supplied: usize,
    },
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockCountMismatch { found, supplied } => write!(
                f,
                "conflict rewrite: text has {found} conflict region(s) but {supplied} block(s) were supplied"
            ),
        }
    }
}

impl std::error::Error for RewriteError {}

/// Rewrite `original`, substituting every resolved block.
///
/// `blocks` must be the output of
/// [`parse_conflicts`](super::parse::parse_conflicts) for the same text, in
/// file order, after classification.
///
/// # Errors
/// [`RewriteError::BlockCountMismatch`] when `blocks` does not line up with
/// the text. This is a caller bug; debug builds also assert.
pub fn rewrite_file(original: &str, blocks: &[ConflictBlock]) -> Result<Rewrite, RewriteError> {
    let lines = split_raw_lines(original);
    let spans = scan_regions(&lines);

    debug_assert_eq!(
        spans.len(),
        blocks.len(),
        "blocks must come from parsing this exact text"
    );
    if spans.len() != blocks.len() {
        return Err(RewriteError::BlockCountMismatch {
            found: spans.len(),
            supplied: blocks.len(),
        });
    }

    let mut text = String::with_capacity(original.len());
    let mut cursor = 0;

    for (span, block) in spans.iter().zip(blocks) {
        for line in &lines[cursor..span.open] {
            text.push_str(line.body);
            text.push_str(line.eol);
        }

        if let Some(resolution) = block.resolution() {
            let eol = block.line_ending.as_str();
            let last_eol = lines[span.close].eol;
            for (i, line) in resolution.iter().enumerate() {
                text.push_str(line);
                text.push_str(if i + 1 == resolution.len() { last_eol } else { eol });
            }
        } else {
            for line in &lines[span.open..=span.close] {
                text.push_str(line.body);
                text.push_str(line.eol);
            }
        }

        cursor = span.close + 1;
    }

    for line in &lines[cursor..] {
        text.push_str(line.body);
        text.push_str(line.eol);
    }

    Ok(Rewrite {
        text,
        fully_resolved: blocks.iter().all(ConflictBlock::is_resolved),
    })
}
