use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use prgate::conflict::{Classifier, has_marker_lines, resolve_text};
use tracing::info;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Files containing conflict markers
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Declaration prefixes and context from this config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Exit 0 when every file is free of conflicts afterwards, 4 otherwise.
pub fn run(args: &ResolveArgs) -> Result<u8> {
    let config = super::load_config(args.config.as_deref(), std::path::Path::new("."))?;
    let classifier = Classifier::new(config.merge.declaration_policy());
    let mut all_resolved = true;

    for path in &args.files {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let resolution = resolve_text(path, &text, &classifier, config.merge.context_lines)?;

        if !resolution.has_blocks() {
            if has_marker_lines(&text) {
                all_resolved = false;
                println!("✗ {}: malformed conflict markers", path.display());
            } else {
                println!("- {}: no conflicts", path.display());
            }
            continue;
        }

        let total = resolution.blocks.len();
        let left = resolution.unresolved().count();
        if resolution.rewrite.text != text {
            fs::write(path, &resolution.rewrite.text)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(file = %path.display(), resolved = total - left, "rewrote file");
        }

        if resolution.rewrite.fully_resolved {
            println!("✓ {}: {total} block(s) auto-resolved", path.display());
        } else {
            all_resolved = false;
            println!(
                "✗ {}: {left} of {total} block(s) need manual resolution",
                path.display()
            );
        }
        for (i, rule) in resolution.rules.iter().enumerate() {
            if let Some(rule) = rule {
                println!("    block {}: {rule}", i + 1);
            }
        }
    }

    Ok(if all_resolved { 0 } else { 4 })
}
