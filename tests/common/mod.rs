//! Shared test helpers for prgate integration tests.
//!
//! Every test works in its own temp directory: a throwaway git repo, a fake
//! engine script, or both.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Base content of `player.gd` in every test repo.
pub const PLAYER_GD: &str = "extends Node\n\nfunc _ready():\n\thp = 10\n";

/// Run a git command in `dir`. Panics on failure; returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));
    assert!(
        out.status.success(),
        "git {} failed:\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    String::from_utf8_lossy(&out.stdout).to_string()
}

/// A repo on `main` with one commit containing `player.gd`.
pub fn setup_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    let p = dir.path();
    git(p, &["init", "-q", "-b", "main"]);
    git(p, &["config", "user.email", "test@test.com"]);
    git(p, &["config", "user.name", "Test User"]);
    git(p, &["config", "commit.gpgsign", "false"]);
    git(p, &["config", "merge.conflictStyle", "merge"]);
    write(p, "player.gd", PLAYER_GD);
    git(p, &["add", "."]);
    git(p, &["commit", "-q", "-m", "initial"]);
    dir
}

/// Write `content` to `rel` under `dir`, creating parents.
pub fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
}

pub fn read(dir: &Path, rel: &str) -> String {
    std::fs::read_to_string(dir.join(rel)).unwrap()
}

/// Commit everything on the current branch.
pub fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
}

/// Put `main_edit` on `main` and `feature_edit` on a new `feature` branch,
/// each applied to `player.gd`; leaves `feature` checked out.
pub fn diverge(dir: &Path, feature_edit: &str, main_edit: &str) {
    git(dir, &["checkout", "-q", "-b", "feature"]);
    write(dir, "player.gd", feature_edit);
    commit_all(dir, "feature edit");
    git(dir, &["checkout", "-q", "main"]);
    write(dir, "player.gd", main_edit);
    commit_all(dir, "main edit");
    git(dir, &["checkout", "-q", "feature"]);
}

/// `git status --porcelain` output.
pub fn status(dir: &Path) -> String {
    git(dir, &["status", "--porcelain"])
}

/// Subject and body of HEAD's commit message.
pub fn head_message(dir: &Path) -> String {
    git(dir, &["log", "-1", "--format=%B"])
}

/// Run prgate with `args` in `dir`, with logging disabled.
pub fn prgate_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_prgate"))
        .args(args)
        .current_dir(dir)
        .env_remove("PRGATE_LOG")
        .env_remove("PRGATE_ENGINE")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .output()
        .expect("failed to execute prgate")
}

/// Exit code and stdout of a finished run.
pub fn code_and_stdout(out: &Output) -> (Option<i32>, String) {
    (
        out.status.code(),
        String::from_utf8_lossy(&out.stdout).to_string(),
    )
}

/// An executable shell script standing in for the engine. `body` runs for
/// every invocation; `$@` holds the engine arguments.
#[cfg(unix)]
pub fn fake_engine(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join("fake-engine.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
