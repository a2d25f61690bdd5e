//! Overlay files from a separate config repository into a target repository
//! as relative symlinks.
//!
//! The overlay is cloned (or copied) into `.repoverlay/repo` under the target
//! root, and each mapped file is linked into place. Links are listed in a
//! managed block of `.git/info/exclude` so they never show up as untracked.
//!
//! - **[`config`]**: discover and parse `.repoverlay.yaml` and `.repoverlayignore`
//! - **[`overlay`]**: the pure resolve / validate / plan pipeline and its executor
//! - **[`resources`]**: symlink and directory primitives
//! - **[`git`]**: the version-control capability and its `git` adapter
//! - **[`commands`]**: subcommand orchestration (`clone`, `sync`, `unlink`, git passthrough)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod git;
pub mod logging;
pub mod overlay;
pub mod resources;
