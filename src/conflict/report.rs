//! Human-readable conflict report (Markdown), written when conflicts block
//! the run.

use std::fmt::Write as _;

use super::model::MergeReport;

/// Lines shown per side before eliding the rest.
pub const MAX_SIDE_LINES: usize = 10;

/// Trailing characters of `context_before` shown per entry.
const CONTEXT_CHARS: usize = 80;

/// Render the merge report as Markdown, one entry per unresolved block.
#[must_use]
pub fn render_conflict_report(report: &MergeReport) -> String {
    let mut out = String::from("## Merge Conflict Report\n\n");

    if !report.auto_resolved_files.is_empty() {
        let _ = writeln!(
            out,
            "### Auto-Resolved ({} files)",
            report.auto_resolved_files.len()
        );
        for path in &report.auto_resolved_files {
            let _ = writeln!(out, "- `{}`", path.display());
        }
        out.push('\n');
    }

    if !report.manual_conflicts.is_empty() {
        let _ = writeln!(
            out,
            "### Manual Resolution Required ({} conflicts)\n",
            report.manual_conflicts.len()
        );
        for (i, block) in report.manual_conflicts.iter().enumerate() {
            let _ = writeln!(out, "**{}. `{}`**", i + 1, block.file_path.display());
            if !block.context_before.is_empty() {
                let _ = writeln!(out, "Context: `...{}`", tail_chars(&block.context_before));
            }
            out.push_str("```\n<<<<<<< PR branch (yours)\n");
            push_side(&mut out, &block.ours);
            out.push_str("=======\n");
            push_side(&mut out, &block.theirs);
            out.push_str(">>>>>>> target branch (theirs)\n```\n\n");
        }
    }

    if let Some(error) = &report.error {
        let _ = writeln!(out, "### Error\n{error}\n");
    }

    out
}

fn push_side(out: &mut String, lines: &[String]) {
    for line in lines.iter().take(MAX_SIDE_LINES) {
        out.push_str(line);
        out.push('\n');
    }
    if lines.len() > MAX_SIDE_LINES {
        let _ = writeln!(out, "  ... ({} more lines)", lines.len() - MAX_SIDE_LINES);
    }
}

fn tail_chars(s: &str) -> &str {
    let count = s.chars().count();
    if count <= CONTEXT_CHARS {
        return s;
    }
    let skip = count - CONTEXT_CHARS;
    s.char_indices().nth(skip).map_or(s, |(idx, _)| &s[idx..])
}
