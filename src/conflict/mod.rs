//! Conflict detection and conservative auto-resolution.
//!
//! Pipeline per conflicted file: [`parse`] the markers into
//! [`ConflictBlock`]s, [`classify`] each block, then [`rewrite`] the file.
//! None of these steps fail on malformed input; blocks that cannot be
//! resolved safely are left exactly as git wrote them.

pub mod classify;
pub mod model;
pub mod parse;
pub mod report;
pub mod rewrite;

use std::path::Path;

use tracing::debug;

pub use classify::{Classification, Classifier, DeclarationPolicy, Rule};
pub use model::{ConflictBlock, LineEnding, MergeReport};
pub use parse::{DEFAULT_CONTEXT_LINES, has_marker_lines, parse_conflicts};
pub use report::render_conflict_report;
pub use rewrite::{Rewrite, RewriteError, rewrite_file};

/// Everything learned from resolving one file's text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileResolution {
    /// All blocks, classified, in file order.
    pub blocks: Vec<ConflictBlock>,
    /// Rule that resolved each block (`None` = unresolved), parallel to
    /// `blocks`.
    pub rules: Vec<Option<Rule>>,
    /// The rewritten text.
    pub rewrite: Rewrite,
}

impl FileResolution {
    /// `true` if the text had at least one complete conflict region.
    #[must_use]
    pub fn has_blocks(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Blocks still needing a human, in file order.
    pub fn unresolved(&self) -> impl Iterator<Item = &ConflictBlock> {
        self.blocks.iter().filter(|b| !b.is_resolved())
    }
}

/// Parse, classify and rewrite one file's text.
///
/// # Errors
/// Only [`RewriteError`], which cannot occur for blocks produced here.
pub fn resolve_text(
    file_path: &Path,
    text: &str,
    classifier: &Classifier,
    context_lines: usize,
) -> Result<FileResolution, RewriteError> {
    let mut blocks = parse_conflicts(file_path, text, context_lines);
    let rules: Vec<Option<Rule>> = blocks
        .iter_mut()
        .map(|block| classifier.resolve_block(block))
        .collect();
    for (i, rule) in rules.iter().enumerate() {
        debug!(file = %file_path.display(), block = i, rule = ?rule, "classified conflict block");
    }
    let rewrite = rewrite_file(text, &blocks)?;
    Ok(FileResolution {
        blocks,
        rules,
        rewrite,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_text_reports_rules_in_order() {
        let text = "\
<<<<<<< HEAD
same
=======
same
>>>>>>> main
<<<<<<< HEAD
hp = 10
=======
hp = 12
>>>>>>> main
";
        let res = resolve_text(Path::new("a.gd"), text, &Classifier::default(), 3).unwrap();
        assert!(res.has_blocks());
        assert_eq!(res.rules, vec![Some(Rule::Identical), None]);
        assert_eq!(res.unresolved().count(), 1);
        assert!(!res.rewrite.fully_resolved);
        assert!(res.rewrite.text.starts_with("same\n<<<<<<< HEAD\nhp = 10\n"));
    }

    #[test]
    fn resolve_text_without_blocks() {
        let res = resolve_text(Path::new("a.bin"), "\0\x01", &Classifier::default(), 3).unwrap();
        assert!(!res.has_blocks());
        assert!(res.rewrite.fully_resolved);
        assert_eq!(res.rewrite.text, "\0\x01");
    }
}
