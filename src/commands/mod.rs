//! Subcommand implementations. Each `run` returns the process exit code.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use prgate::config::GateConfig;

pub mod compare;
pub mod resolve;
pub mod validate;

/// Exit code for errors that stop a command before it has a verdict.
pub const INFRASTRUCTURE: u8 = 3;

/// Load `explicit`, or `<project>/.prgate/config.toml` (defaults if absent).
pub fn load_config(explicit: Option<&Path>, project: &Path) -> Result<GateConfig> {
    let path: PathBuf =
        explicit.map_or_else(|| project.join(GateConfig::DEFAULT_PATH), Path::to_owned);
    if explicit.is_some() && !path.exists() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    GateConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Clamp a verdict code into the `u8` range used by `ExitCode`.
pub fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(INFRASTRUCTURE)
}
