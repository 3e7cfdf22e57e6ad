//! The external engine binary: discovery and argument shape.
//!
//! Every phase invokes the engine as
//! `<bin> --headless --path <project> --script <script> [-- --scenario=<name>]`
//! with the project as working directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::EngineConfig;
use crate::exec::Invocation;

/// No usable engine binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineNotFound {
    pub tried: Vec<String>,
}

impl fmt::Display for EngineNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine binary not found (tried: {})", self.tried.join(", "))
    }
}

impl std::error::Error for EngineNotFound {}

/// Pick the engine binary.
///
/// Order: `cli_override`, then `engine.binary`, then the first of
/// `engine.candidates` found on `PATH`. A name containing a path separator
/// must be an executable file as given; a bare name is looked up on `PATH`.
///
/// # Errors
/// [`EngineNotFound`] listing everything tried.
pub fn find_binary(
    cli_override: Option<&Path>,
    config: &EngineConfig,
) -> Result<PathBuf, EngineNotFound> {
    let explicit = cli_override.or(config.binary.as_deref());
    let candidates: Vec<PathBuf> = match explicit {
        Some(p) => vec![p.to_owned()],
        None => config.candidates.iter().map(PathBuf::from).collect(),
    };
    for candidate in &candidates {
        match which::which(candidate) {
            Ok(found) => {
                debug!(binary = %found.display(), "found engine");
                return Ok(found);
            }
            Err(e) => {
                debug!(candidate = %candidate.display(), error = %e, "engine candidate rejected");
            }
        }
    }
    Err(EngineNotFound {
        tried: candidates.iter().map(|c| c.display().to_string()).collect(),
    })
}

/// A resolved engine bound to one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Engine {
    binary: PathBuf,
    project: PathBuf,
}

impl Engine {
    pub fn new(binary: impl Into<PathBuf>, project: &Path) -> Self {
        Self {
            binary: binary.into(),
            project: project.to_owned(),
        }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Headless invocation of `script`, optionally selecting a scenario.
    #[must_use]
    pub fn invocation(
        &self,
        script: &str,
        scenario: Option<&str>,
        timeout: Duration,
    ) -> Invocation {
        let mut inv = Invocation::new(&self.binary, &self.project, timeout)
            .arg("--headless")
            .arg("--path")
            .arg(self.project.as_os_str())
            .arg("--script")
            .arg(script);
        if let Some(s) = scenario {
            inv = inv.arg("--").arg(format!("--scenario={s}"));
        }
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_shape_without_scenario() {
        let e = Engine::new("/usr/bin/godot", Path::new("/proj"));
        let inv = e.invocation("test/test_runner.gd", None, Duration::from_secs(60));
        assert_eq!(inv.program, PathBuf::from("/usr/bin/godot"));
        assert_eq!(inv.working_dir, PathBuf::from("/proj"));
        assert_eq!(inv.timeout, Duration::from_secs(60));
        assert_eq!(
            inv.display(),
            "/usr/bin/godot --headless --path /proj --script test/test_runner.gd"
        );
    }

    #[test]
    fn invocation_shape_with_scenario() {
        let e = Engine::new("godot", Path::new("/proj"));
        let inv = e.invocation("g.gd", Some("boot_and_run"), Duration::from_secs(1));
        assert_eq!(
            inv.display(),
            "godot --headless --path /proj --script g.gd -- --scenario=boot_and_run"
        );
    }

    #[test]
    fn missing_candidates_list_everything_tried() {
        let config = EngineConfig {
            candidates: vec![
                "prgate-no-such-engine-a".into(),
                "prgate-no-such-engine-b".into(),
            ],
            ..EngineConfig::default()
        };
        let err = find_binary(None, &config).unwrap_err();
        assert_eq!(err.tried, vec!["prgate-no-such-engine-a", "prgate-no-such-engine-b"]);
        assert!(err.to_string().contains("prgate-no-such-engine-a, prgate-no-such-engine-b"));
    }

    #[cfg(unix)]
    #[test]
    fn explicit_path_must_be_executable() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("engine");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        assert!(find_binary(Some(&bin), &EngineConfig::default()).is_err());

        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_binary(Some(&bin), &EngineConfig::default()).unwrap(), bin);
    }

    #[cfg(unix)]
    #[test]
    fn override_beats_config_binary() {
        let config = EngineConfig {
            binary: Some(PathBuf::from("/nonexistent/godot")),
            ..EngineConfig::default()
        };
        let found = find_binary(Some(Path::new("/bin/sh")), &config).unwrap();
        assert_eq!(found, PathBuf::from("/bin/sh"));
        assert!(find_binary(None, &config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_is_searched_on_path() {
        let config = EngineConfig {
            candidates: vec!["prgate-no-such-engine".into(), "sh".into()],
            ..EngineConfig::default()
        };
        let found = find_binary(None, &config).unwrap();
        assert!(found.ends_with("sh"));
        assert!(found.is_absolute());
    }
}
