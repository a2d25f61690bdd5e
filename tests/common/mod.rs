// Shared helpers for integration tests.
//
// Provides a pair of temporary directories (a target repository and a plain
// overlay directory) and a fluent builder so each integration test can set up
// an isolated environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use repoverlay::cli::GlobalOpts;
use repoverlay::logging::Logger;

/// A target repository and an overlay directory, both deleted on drop.
pub struct IntegrationTestContext {
    /// Target repository root (holds `.repoverlay.yaml` and a bare `.git/`).
    pub target: tempfile::TempDir,
    /// Overlay source directory referenced by `overlay.repo`.
    pub overlay: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Path to the target root.
    pub fn root(&self) -> &Path {
        self.target.path()
    }

    /// Path to `rel` under the target root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.target.path().join(rel)
    }

    /// Path to `rel` under the overlay source.
    pub fn overlay_path(&self, rel: &str) -> PathBuf {
        self.overlay.path().join(rel)
    }

    /// Global options pointing `--root` at the target.
    pub fn global(&self, dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            dry_run,
            root: Some(self.target.path().to_path_buf()),
        }
    }

    /// A logger that is not connected to a subscriber.
    pub fn logger(&self) -> Logger {
        Logger::new("test")
    }

    /// Read the symlink at `rel`, relative to the target root.
    pub fn link_target(&self, rel: &str) -> PathBuf {
        std::fs::read_link(self.path(rel)).expect("read link")
    }

    /// `true` when `rel` exists as a symlink (broken or not).
    pub fn is_link(&self, rel: &str) -> bool {
        std::fs::symlink_metadata(self.path(rel)).is_ok_and(|m| m.file_type().is_symlink())
    }

    /// Write or overwrite a file in the overlay source.
    pub fn write_overlay_file(&self, rel: &str, content: &str) {
        write_file(&self.overlay_path(rel), content);
    }

    /// Write or overwrite a file in the target.
    pub fn write_target_file(&self, rel: &str, content: &str) {
        write_file(&self.path(rel), content);
    }

    /// Contents of `.git/info/exclude`, empty when absent.
    pub fn exclude_file(&self) -> String {
        std::fs::read_to_string(self.path(".git/info/exclude")).unwrap_or_default()
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
}

/// Fluent builder for [`IntegrationTestContext`].
///
/// By default the config has no `mappings`, so the whole overlay is mirrored.
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
    mappings: Vec<(String, String)>,
    with_git_dir: bool,
}

impl TestContextBuilder {
    /// Begin building with empty target and overlay directories.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext {
                target: tempfile::tempdir().expect("create target dir"),
                overlay: tempfile::tempdir().expect("create overlay dir"),
            },
            mappings: Vec::new(),
            with_git_dir: true,
        }
    }

    /// Add a file to the overlay source.
    pub fn with_overlay_file(self, rel: &str, content: &str) -> Self {
        self.ctx.write_overlay_file(rel, content);
        self
    }

    /// Add an explicit `{src, dst}` mapping.
    pub fn with_mapping(mut self, src: &str, dst: &str) -> Self {
        self.mappings.push((src.to_string(), dst.to_string()));
        self
    }

    /// Write `.repoverlayignore` in the target.
    pub fn with_ignore_file(self, content: &str) -> Self {
        self.ctx.write_target_file(".repoverlayignore", content);
        self
    }

    /// Write a file into the target before the first command runs.
    pub fn with_target_file(self, rel: &str, content: &str) -> Self {
        self.ctx.write_target_file(rel, content);
        self
    }

    /// Create an empty directory in the target before the first command runs.
    pub fn with_target_dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.ctx.path(rel)).expect("create target dir");
        self
    }

    /// Leave the target without a `.git` directory.
    pub const fn without_git_dir(mut self) -> Self {
        self.with_git_dir = false;
        self
    }

    /// Write `.repoverlay.yaml` and return the context.
    pub fn build(self) -> IntegrationTestContext {
        if self.with_git_dir {
            std::fs::create_dir_all(self.ctx.path(".git/info")).expect("create .git");
        }
        let mut yaml = format!(
            "version: 1\noverlay:\n  repo: {}\n",
            self.ctx.overlay.path().display()
        );
        if !self.mappings.is_empty() {
            yaml.push_str("  mappings:\n");
            for (src, dst) in &self.mappings {
                yaml.push_str(&format!("    - src: {src}\n      dst: {dst}\n"));
            }
        }
        self.ctx.write_target_file(".repoverlay.yaml", &yaml);
        self.ctx
    }
}
