use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use prgate::regression::{Comparator, GameplayReport};

use super::INFRASTRUCTURE;

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Baseline report (JSON)
    pub baseline: PathBuf,

    /// Current report (JSON)
    pub current: PathBuf,

    /// Treat warnings (new scenarios absent from the baseline) as regressions
    #[arg(long)]
    pub strict: bool,

    /// Thresholds from this config file instead of .prgate/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Exit 0 when clean, 2 on regressions, 3 if either report is unreadable.
pub fn run(args: &CompareArgs) -> Result<u8> {
    let config = super::load_config(args.config.as_deref(), std::path::Path::new("."))?;

    let (baseline, current) = match (
        GameplayReport::load(&args.baseline),
        GameplayReport::load(&args.current),
    ) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("ERROR: {e}");
            return Ok(INFRASTRUCTURE);
        }
    };

    let comparison = Comparator::from_config(&config.regression)
        .with_strict(args.strict || config.regression.strict)
        .compare(&baseline, &current);
    print!("{comparison}");

    Ok(if comparison.has_regressions() { 2 } else { 0 })
}
