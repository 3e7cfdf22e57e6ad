//! The merge orchestrator driven against real git repositories.

mod common;

use std::path::PathBuf;

use common::{PLAYER_GD, commit_all, diverge, git, head_message, read, setup_repo, status, write};
use prgate::cancel::CancelToken;
use prgate::config::MergeConfig;
use prgate::merge::{MergeState, Orchestrator};
use prgate_git::CliRepo;

fn run_merge(dir: &std::path::Path) -> prgate::merge::MergeOutcome {
    let repo = CliRepo::open(dir).unwrap();
    Orchestrator::new(&repo, &MergeConfig::default(), CancelToken::new()).run()
}

#[test]
fn clean_merge_is_committed() {
    let repo = setup_repo();
    let p = repo.path();
    git(p, &["checkout", "-q", "-b", "feature"]);
    write(p, "feature.txt", "feature\n");
    commit_all(p, "feature work");
    git(p, &["checkout", "-q", "main"]);
    write(p, "main.txt", "main\n");
    commit_all(p, "main work");
    git(p, &["checkout", "-q", "feature"]);

    let outcome = run_merge(p);

    assert!(outcome.report.clean, "{:?}", outcome.report);
    assert!(outcome.report.error.is_none());
    assert_eq!(outcome.final_state(), MergeState::Committed);
    assert_eq!(outcome.branch.as_deref(), Some("feature"));
    assert_eq!(head_message(p).trim(), "Merge main into feature (auto, clean)");
    assert_eq!(read(p, "main.txt"), "main\n");
    assert!(status(p).is_empty());
}

#[test]
fn already_up_to_date_commits_nothing() {
    let repo = setup_repo();
    let p = repo.path();
    git(p, &["checkout", "-q", "-b", "feature"]);
    write(p, "feature.txt", "feature\n");
    commit_all(p, "feature work");
    let head_before = git(p, &["rev-parse", "HEAD"]);

    let outcome = run_merge(p);

    assert!(outcome.report.clean);
    assert_eq!(outcome.final_state(), MergeState::UpToDate);
    assert_eq!(git(p, &["rev-parse", "HEAD"]), head_before);
}

#[test]
fn declaration_conflict_is_auto_resolved_and_committed() {
    let repo = setup_repo();
    let p = repo.path();
    diverge(
        p,
        "extends Node\nconst SPEED = 5\n\nfunc _ready():\n\thp = 10\n",
        "extends Node\nconst JUMP = 3\n\nfunc _ready():\n\thp = 10\n",
    );

    let outcome = run_merge(p);

    assert!(outcome.report.clean, "{:?}", outcome.report);
    assert_eq!(
        outcome.report.auto_resolved_files.iter().cloned().collect::<Vec<_>>(),
        vec![PathBuf::from("player.gd")]
    );
    assert_eq!(outcome.final_state(), MergeState::Committed);
    assert_eq!(
        read(p, "player.gd"),
        "extends Node\nconst SPEED = 5\nconst JUMP = 3\n\nfunc _ready():\n\thp = 10\n"
    );
    let message = head_message(p);
    assert!(
        message.starts_with(
            "Merge main into feature (auto-resolved conflicts)\n\nAuto-resolved files:\n"
        )
    );
    assert!(message.contains("  - player.gd"));
    assert!(status(p).is_empty());
}

#[test]
fn logic_conflict_needs_manual_and_leaves_tree_clean() {
    let repo = setup_repo();
    let p = repo.path();
    diverge(
        p,
        "extends Node\n\nfunc _ready():\n\thp = 12\n",
        "extends Node\n\nfunc _ready():\n\thp = 15\n",
    );
    let head_before = git(p, &["rev-parse", "HEAD"]);

    let outcome = run_merge(p);

    assert!(!outcome.report.clean);
    assert!(outcome.report.needs_manual());
    assert_eq!(outcome.report.manual_conflicts.len(), 1);
    let block = &outcome.report.manual_conflicts[0];
    assert_eq!(block.file_path, PathBuf::from("player.gd"));
    assert_eq!(block.ours, vec!["\thp = 12"]);
    assert_eq!(block.theirs, vec!["\thp = 15"]);
    assert_eq!(outcome.final_state(), MergeState::ManualRequired);

    // The merge was aborted: no merge in progress, no markers, HEAD unchanged.
    assert!(!p.join(".git/MERGE_HEAD").exists());
    assert!(status(p).is_empty());
    assert_eq!(read(p, "player.gd"), "extends Node\n\nfunc _ready():\n\thp = 12\n");
    assert_eq!(git(p, &["rev-parse", "HEAD"]), head_before);
}

#[test]
fn mixed_files_abort_when_any_block_is_manual() {
    let repo = setup_repo();
    let p = repo.path();
    write(p, "enemy.gd", "extends Node\n");
    commit_all(p, "enemy");

    git(p, &["checkout", "-q", "-b", "feature"]);
    write(p, "enemy.gd", "extends Node\nvar armor = 1\n");
    write(p, "player.gd", "extends Node\n\nfunc _ready():\n\thp = 12\n");
    commit_all(p, "feature");
    git(p, &["checkout", "-q", "main"]);
    write(p, "enemy.gd", "extends Node\nvar speed = 2\n");
    write(p, "player.gd", "extends Node\n\nfunc _ready():\n\thp = 15\n");
    commit_all(p, "main");
    git(p, &["checkout", "-q", "feature"]);

    let outcome = run_merge(p);

    assert!(outcome.report.needs_manual());
    assert!(
        outcome.report.auto_resolved_files.contains(&PathBuf::from("enemy.gd")),
        "{:?}",
        outcome.report
    );
    assert!(status(p).is_empty());
    assert_eq!(read(p, "enemy.gd"), "extends Node\nvar armor = 1\n");
}

#[test]
fn detached_head_is_an_error() {
    let repo = setup_repo();
    let p = repo.path();
    git(p, &["checkout", "-q", "--detach"]);

    let outcome = run_merge(p);

    assert!(!outcome.report.clean);
    assert_eq!(
        outcome.report.error.as_deref(),
        Some(prgate::merge::orchestrator::DETACHED_HEAD)
    );
    assert_eq!(read(p, "player.gd"), PLAYER_GD);
}

#[test]
fn unknown_target_is_an_error_and_aborts() {
    let repo = setup_repo();
    let p = repo.path();
    git(p, &["checkout", "-q", "-b", "feature"]);

    let repo_handle = CliRepo::open(p).unwrap();
    let outcome = Orchestrator::new(&repo_handle, &MergeConfig::default(), CancelToken::new())
        .with_target("no-such-branch")
        .run();

    assert!(!outcome.report.clean);
    assert!(
        outcome.report.error.as_deref().is_some_and(|e| e.contains("merge failed")),
        "{:?}",
        outcome.report
    );
    assert_eq!(outcome.final_state(), MergeState::Aborted);
    assert!(status(p).is_empty());
}
