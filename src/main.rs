use std::io;
use std::process::ExitCode;

use clap::{CommandFactory as _, Parser, Subcommand};
use clap_complete::Shell;
use prgate::cancel::CancelToken;
use tracing::warn;

mod commands;

/// Gated PR validation for the game project
///
/// Before a PR branch is accepted, prgate merges the target branch into it,
/// auto-resolving conflicts that are provably safe, then runs the engine's
/// unit tests, gameplay scenarios and a training smoke test headlessly, and
/// finally compares the gameplay report against a stored baseline.
///
/// EXIT CODES:
///
///   0  all phases passed (or were skipped)
///   1  a test phase failed
///   2  gameplay or performance regression against the baseline
///   3  infrastructure problem (engine missing, timeout, git error, Ctrl-C)
///   4  merge conflicts that need manual resolution
#[derive(Parser)]
#[command(name = "prgate")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'prgate <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full validation pipeline
    ///
    /// Phases run in order: merge, unit tests, gameplay tests, training
    /// smoke test, regression check. The first hard failure stops the run.
    Validate(commands::validate::ValidateArgs),

    /// Compare two gameplay reports
    ///
    /// Prints the regression report and exits 2 if the current report
    /// regressed against the baseline.
    Compare(commands::compare::CompareArgs),

    /// Auto-resolve conflict markers in files, in place
    ///
    /// Only provably safe blocks are resolved. Exits 4 if any block is left
    /// for a human.
    Resolve(commands::resolve::ResolveArgs),

    /// Print shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let _telemetry = prgate::telemetry::init();
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::run(&args, &cancel),
        Commands::Compare(args) => commands::compare::run(&args),
        Commands::Resolve(args) => commands::resolve::run(&args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "prgate", &mut io::stdout());
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(commands::INFRASTRUCTURE)
        }
    }
}
