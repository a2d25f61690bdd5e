#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `clone` command against plain-directory overlays.
#![cfg(unix)]

mod common;

use std::path::Path;

use common::TestContextBuilder;
use repoverlay::cli::CloneOpts;
use repoverlay::commands::clone;
use repoverlay::error::{OverlayError, ValidationReport};
use repoverlay::overlay::execute::RunStatus;

const FORCE: CloneOpts = CloneOpts { force: true };
const NO_FORCE: CloneOpts = CloneOpts { force: false };

// ---------------------------------------------------------------------------
// Mirror-all
// ---------------------------------------------------------------------------

#[test]
fn mirror_all_links_every_overlay_file() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file(".envrc", "export A=1")
        .with_overlay_file(".claude/settings.json", "{}")
        .build();
    let log = ctx.logger();

    let status = clone::run(&ctx.global(false), &NO_FORCE, &log).unwrap();

    assert_eq!(status, RunStatus::Success);
    assert_eq!(ctx.link_target(".envrc"), Path::new(".repoverlay/repo/.envrc"));
    assert_eq!(
        ctx.link_target(".claude/settings.json"),
        Path::new("../.repoverlay/repo/.claude/settings.json")
    );
    assert_eq!(
        std::fs::read_to_string(ctx.path(".claude/settings.json")).unwrap(),
        "{}"
    );
}

#[test]
fn exclude_block_lists_links_and_state_files() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("b.txt", "b")
        .with_overlay_file("a.txt", "a")
        .with_target_file(".git/info/exclude", "*.swp\n")
        .build();
    clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();

    insta::assert_snapshot!(ctx.exclude_file(), @r"
    *.swp

    # BEGIN repoverlay managed - do not edit
    .repoverlay.yaml
    .repoverlayignore
    .repoverlay/
    a.txt
    b.txt
    # END repoverlay managed
    ");
}

#[test]
fn ignore_rules_filter_mirrored_files() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a.example", "")
        .with_overlay_file("dir/b.example", "")
        .with_overlay_file("a.example.txt", "")
        .with_overlay_file("x/test/y", "")
        .with_ignore_file("# samples\n*.example\n**/test/**\n")
        .build();
    clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();

    assert!(ctx.is_link("a.example.txt"));
    assert!(!ctx.is_link("a.example"));
    assert!(!ctx.is_link("dir/b.example"));
    assert!(!ctx.is_link("x/test/y"));
}

// ---------------------------------------------------------------------------
// Explicit mappings
// ---------------------------------------------------------------------------

#[test]
fn directory_mapping_expands_to_files() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a.txt", "a")
        .with_overlay_file("dir/x.txt", "x")
        .with_overlay_file("dir/y.txt", "y")
        .with_overlay_file("unmapped.txt", "")
        .with_mapping("a.txt", "out/a.txt")
        .with_mapping("dir", "out/dir")
        .build();
    let status = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();

    assert_eq!(status, RunStatus::Success);
    assert_eq!(
        ctx.link_target("out/dir/x.txt"),
        Path::new("../../.repoverlay/repo/dir/x.txt")
    );
    assert!(ctx.is_link("out/a.txt"));
    assert!(ctx.is_link("out/dir/y.txt"));
    assert!(!ctx.path("unmapped.txt").exists());
    assert!(!ctx.is_link("out/dir"));
}

#[test]
fn duplicate_destination_is_rejected_before_linking() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a", "")
        .with_overlay_file("b", "")
        .with_mapping("a", "shared/file")
        .with_mapping("b", "shared/file")
        .build();
    let err = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap_err();

    let report = err.downcast_ref::<ValidationReport>().unwrap();
    assert_eq!(report.len(), 1);
    assert!(report.to_string().contains("shared/file"));
    assert!(!ctx.path("shared").exists());
}

#[test]
fn unsafe_destinations_are_all_reported() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a", "")
        .with_overlay_file("b", "")
        .with_mapping("a", "../escape")
        .with_mapping("b", ".git/hooks/pre-commit")
        .build();
    let err = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap_err();

    let report = err.downcast_ref::<ValidationReport>().unwrap();
    assert_eq!(report.len(), 2);
}

#[test]
fn missing_source_is_a_validation_error() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("present", "")
        .with_mapping("absent", "absent")
        .build();
    let err = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap_err();
    assert!(err.downcast_ref::<ValidationReport>().is_some());
}

// ---------------------------------------------------------------------------
// Conflicts and --force
// ---------------------------------------------------------------------------

#[test]
fn existing_file_is_skipped_with_partial_status() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("out/a.txt", "overlay")
        .with_target_file("out/a.txt", "user")
        .build();
    let status = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();

    assert_eq!(status, RunStatus::Partial);
    assert_eq!(status.exit_code(), 2);
    assert_eq!(std::fs::read_to_string(ctx.path("out/a.txt")).unwrap(), "user");
    assert!(!ctx.exclude_file().contains("out/a.txt"));
}

#[test]
fn force_replaces_existing_file() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("out/a.txt", "overlay")
        .with_target_file("out/a.txt", "user")
        .build();
    let status = clone::run(&ctx.global(false), &FORCE, &ctx.logger()).unwrap();

    assert_eq!(status, RunStatus::Success);
    assert_eq!(
        std::fs::read_to_string(ctx.path("out/a.txt")).unwrap(),
        "overlay"
    );
}

#[test]
fn second_clone_needs_force() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a", "1")
        .build();
    clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();

    let err = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OverlayError>(),
        Some(OverlayError::AlreadyCloned)
    ));

    ctx.write_overlay_file("a", "2");
    clone::run(&ctx.global(false), &FORCE, &ctx.logger()).unwrap();
    assert_eq!(std::fs::read_to_string(ctx.path("a")).unwrap(), "2");
}

// ---------------------------------------------------------------------------
// Dry-run and discovery
// ---------------------------------------------------------------------------

#[test]
fn dry_run_changes_nothing() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file(".envrc", "")
        .build();
    let status = clone::run(&ctx.global(true), &NO_FORCE, &ctx.logger()).unwrap();

    assert_eq!(status, RunStatus::Success);
    assert!(!ctx.path(".repoverlay").exists());
    assert!(!ctx.is_link(".envrc"));
    assert!(ctx.exclude_file().is_empty());
}

#[test]
fn config_is_found_from_a_subdirectory() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a", "")
        .build();
    std::fs::create_dir_all(ctx.path("src/deep")).unwrap();
    let mut global = ctx.global(false);
    global.root = Some(ctx.path("src/deep"));

    clone::run(&global, &NO_FORCE, &ctx.logger()).unwrap();
    assert!(ctx.is_link("a"));
    assert!(!ctx.path("src/deep/a").exists());
}

#[test]
fn missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let global = repoverlay::cli::GlobalOpts {
        dry_run: false,
        root: Some(dir.path().to_path_buf()),
    };
    let log = repoverlay::logging::Logger::new("test");
    assert!(clone::run(&global, &NO_FORCE, &log).is_err());
}

#[test]
fn no_git_directory_skips_exclude_block() {
    let ctx = TestContextBuilder::new()
        .with_overlay_file("a", "")
        .without_git_dir()
        .build();
    let status = clone::run(&ctx.global(false), &NO_FORCE, &ctx.logger()).unwrap();
    assert_eq!(status, RunStatus::Success);
    assert!(ctx.is_link("a"));
    assert!(!ctx.path(".git").exists());
}
