#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for git-backed overlays: clone, push into a local
//! working tree, and the unlink guards. Skipped when `git` is not on PATH.
#![cfg(unix)]

mod common;

use std::path::Path;
use std::process::Command as Process;

use common::IntegrationTestContext;
use repoverlay::cli::{CloneOpts, Command, GlobalOpts, UnlinkOpts};
use repoverlay::commands::{clone, unlink, vcs};
use repoverlay::error::{GitError, OverlayError};
use repoverlay::overlay::clone_dir;
use repoverlay::overlay::execute::RunStatus;

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = Process::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A target plus an overlay that is a non-bare git repository on `main`.
fn git_overlay() -> IntegrationTestContext {
    let ctx = common::TestContextBuilder::new()
        .with_overlay_file("envrc", "export A=1\n")
        .build();
    let overlay = ctx.overlay.path();
    git(overlay, &["init", "-q"]);
    git(overlay, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(overlay);
    git(overlay, &["add", "-A"]);
    git(overlay, &["commit", "-q", "-m", "initial"]);
    ctx
}

fn commit_in_clone(ctx: &IntegrationTestContext, content: &str) {
    let clone = clone_dir(ctx.root());
    configure_identity(&clone);
    std::fs::write(clone.join("envrc"), content).unwrap();
    git(&clone, &["commit", "-q", "-am", "update envrc"]);
}

fn global(ctx: &IntegrationTestContext) -> GlobalOpts {
    ctx.global(false)
}

#[test]
fn git_overlay_is_cloned_with_history() {
    if !git_available() {
        return;
    }
    let ctx = git_overlay();
    clone::run(&global(&ctx), &CloneOpts::default(), &ctx.logger()).unwrap();

    assert!(clone_dir(ctx.root()).join(".git").is_dir());
    assert!(ctx.is_link("envrc"));
    assert!(!ctx.is_link(".git"));
}

#[test]
fn push_pulls_into_checked_out_local_repository() {
    if !git_available() {
        return;
    }
    let ctx = git_overlay();
    clone::run(&global(&ctx), &CloneOpts::default(), &ctx.logger()).unwrap();
    commit_in_clone(&ctx, "export A=2\n");

    let status = vcs::run(&global(&ctx), &Command::Push, &ctx.logger()).unwrap();

    assert_eq!(status, RunStatus::Success);
    assert_eq!(
        std::fs::read_to_string(ctx.overlay_path("envrc")).unwrap(),
        "export A=2\n"
    );
}

#[test]
fn conflicting_remote_edit_is_a_fatal_error() {
    if !git_available() {
        return;
    }
    let ctx = git_overlay();
    clone::run(&global(&ctx), &CloneOpts::default(), &ctx.logger()).unwrap();
    commit_in_clone(&ctx, "export A=2\n");
    ctx.write_overlay_file("envrc", "export A=local\n");

    let err = vcs::run(&global(&ctx), &Command::Push, &ctx.logger()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GitError>(),
        Some(GitError::PullIntoRemote { branch, .. }) if branch == "main"
    ));
    assert_eq!(
        std::fs::read_to_string(ctx.overlay_path("envrc")).unwrap(),
        "export A=local\n"
    );
}

#[test]
fn unlink_refuses_unpushed_commits_until_pushed() {
    if !git_available() {
        return;
    }
    let ctx = git_overlay();
    clone::run(&global(&ctx), &CloneOpts::default(), &ctx.logger()).unwrap();
    commit_in_clone(&ctx, "export A=3\n");

    let err = unlink::run(&global(&ctx), &UnlinkOpts::default(), &ctx.logger()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OverlayError>(),
        Some(OverlayError::UnpushedCommits(1))
    ));
    assert!(ctx.is_link("envrc"));

    vcs::run(&global(&ctx), &Command::Push, &ctx.logger()).unwrap();
    let status = unlink::run(&global(&ctx), &UnlinkOpts::default(), &ctx.logger()).unwrap();
    assert_eq!(status, RunStatus::Success);
    assert!(!ctx.is_link("envrc"));
}

#[test]
fn unlink_refuses_uncommitted_changes_without_force() {
    if !git_available() {
        return;
    }
    let ctx = git_overlay();
    clone::run(&global(&ctx), &CloneOpts::default(), &ctx.logger()).unwrap();
    std::fs::write(clone_dir(ctx.root()).join("envrc"), "dirty\n").unwrap();

    let err = unlink::run(&global(&ctx), &UnlinkOpts::default(), &ctx.logger()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OverlayError>(),
        Some(OverlayError::UncommittedChanges(files)) if files == &["envrc".to_string()]
    ));

    let forced = UnlinkOpts {
        remove_repo: false,
        force: true,
    };
    assert_eq!(
        unlink::run(&global(&ctx), &forced, &ctx.logger()).unwrap(),
        RunStatus::Success
    );
}
