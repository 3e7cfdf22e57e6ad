use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use prgate::cancel::CancelToken;
use prgate::engine::{Engine, find_binary};
use prgate::paths::Paths;
use prgate::pipeline::{Options, PipelineError, Runner};
use prgate_git::{CliRepo, GitRepo};
use tracing::{info, warn};

use super::{INFRASTRUCTURE, exit_code};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Minimal checks: quick gameplay scenario, no training or regression
    #[arg(long)]
    pub quick: bool,

    /// Baseline report to compare against
    #[arg(long, value_name = "PATH")]
    pub baseline: Option<PathBuf>,

    /// Engine binary (default: config, then PATH lookup)
    #[arg(long, value_name = "PATH", env = "PRGATE_ENGINE")]
    pub engine: Option<PathBuf>,

    /// Skip the training smoke test
    #[arg(long)]
    pub skip_training: bool,

    /// Branch to merge into the PR branch (default: config merge.target)
    #[arg(long, value_name = "BRANCH")]
    pub merge_target: Option<String>,

    /// Skip the merge phase
    #[arg(long)]
    pub no_merge: bool,

    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Config file (default: <project>/.prgate/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ValidateArgs, cancel: &CancelToken) -> Result<u8> {
    let project = args
        .project
        .canonicalize()
        .with_context(|| format!("project directory {}", args.project.display()))?;
    let config = super::load_config(args.config.as_deref(), &project)?;
    let baseline = args.baseline.as_deref().map(std::path::absolute).transpose()?;
    let paths = Paths::resolve(&project, &config, baseline.as_deref());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    banner(&mut out, &project)?;

    let binary = match find_binary(args.engine.as_deref(), &config.engine) {
        Ok(b) => b,
        Err(e) => {
            writeln!(out, "ERROR: {e}")?;
            writeln!(out, "Use --engine=<path> or set engine.binary in the config")?;
            return Ok(INFRASTRUCTURE);
        }
    };
    let engine = Engine::new(binary, &project);
    writeln!(out, "  Engine: {}", engine.binary().display())?;

    let repo = open_repo(&project);
    let options = Options {
        quick: args.quick,
        skip_training: args.skip_training,
        no_merge: args.no_merge,
        merge_target: args.merge_target.clone(),
    };
    let runner = Runner::new(
        &config,
        &paths,
        engine,
        repo.as_ref().map(|r| r as &dyn GitRepo),
        options,
        cancel.clone(),
    );

    match runner.run(&mut out) {
        Ok(report) => {
            info!(verdict = %report.verdict(), "run finished");
            Ok(exit_code(report.exit_code()))
        }
        Err(PipelineError::Cancelled) => {
            writeln!(out, "\n  ✗ Cancelled")?;
            Ok(exit_code(PipelineError::Cancelled.exit_code()))
        }
        Err(e) => Err(e.into()),
    }
}

fn open_repo(project: &Path) -> Option<CliRepo> {
    match CliRepo::open(project) {
        Ok(repo) => Some(repo),
        Err(e) => {
            warn!(error = %e, "no git repository");
            None
        }
    }
}

fn banner(out: &mut dyn io::Write, project: &Path) -> io::Result<()> {
    let rule = "#".repeat(50);
    writeln!(out, "{rule}")?;
    writeln!(out, "  PR VALIDATION PIPELINE")?;
    writeln!(out, "  {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "{rule}")?;
    writeln!(out, "  Project: {}", project.display())
}
