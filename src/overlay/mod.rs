//! The overlay engine: resolve mappings, check them, plan against a
//! filesystem snapshot, and apply the plan.
//!
//! Everything up to [`plan::plan`] is pure. Only [`execute`], [`exclude`],
//! [`source`], and [`state`] touch the disk.
pub mod conflicts;
pub mod exclude;
pub mod execute;
pub mod paths;
pub mod plan;
pub mod resolve;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod validate;
pub mod warnings;

use std::path::{Path, PathBuf};

/// Directory holding repoverlay state inside the target root.
pub const OVERLAY_DIR: &str = ".repoverlay";

/// Clone location relative to the target root.
pub const CLONE_DIR: &str = ".repoverlay/repo";

/// Absolute path of `.repoverlay/` under `root`.
#[must_use]
pub fn overlay_dir(root: &Path) -> PathBuf {
    root.join(OVERLAY_DIR)
}

/// Absolute path of the clone under `root`.
#[must_use]
pub fn clone_dir(root: &Path) -> PathBuf {
    root.join(OVERLAY_DIR).join("repo")
}

/// One file-level link the engine wants to exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedLink {
    /// Path relative to the overlay root.
    pub src: String,
    /// Path relative to the target root.
    pub dst: String,
    /// Relative symlink target, computed from `dst`'s depth.
    pub target: String,
    /// Whether `src` was confirmed in the overlay listing.
    pub src_exists: bool,
}

impl ResolvedLink {
    /// Build a link whose target climbs out of `dst`'s directory and back
    /// down into the clone.
    #[must_use]
    pub fn new(src: impl Into<String>, dst: impl Into<String>, src_exists: bool) -> Self {
        let src = src.into();
        let dst = dst.into();
        let target = link_target(&dst, &src);
        Self {
            src,
            dst,
            target,
            src_exists,
        }
    }

    /// Describe an already-present link found on disk, for removal.
    #[must_use]
    pub fn from_existing(dst: impl Into<String>, target: impl Into<String>) -> Self {
        let dst = dst.into();
        let target = target.into();
        let src = target
            .split_once(&format!("{CLONE_DIR}/"))
            .map_or_else(String::new, |(_, rest)| rest.to_string());
        Self {
            src,
            dst,
            target,
            src_exists: false,
        }
    }
}

/// `"../" * (depth(dst) - 1) + ".repoverlay/repo/" + src`.
#[must_use]
pub fn link_target(dst: &str, src: &str) -> String {
    let depth = paths::segments(dst).len().saturating_sub(1);
    format!("{}{CLONE_DIR}/{src}", "../".repeat(depth))
}

/// `true` when root-relative `segments` point inside the clone.
#[must_use]
pub fn is_inside_clone(segments: &[String]) -> bool {
    segments.len() > 2
        && segments.first().is_some_and(|s| s == OVERLAY_DIR)
        && segments.get(1).is_some_and(|s| s == "repo")
}
