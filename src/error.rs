//! Domain-specific error types for repoverlay.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`], [`GitError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RepoverlayError
//! ├── Config(ConfigError)          discovery, YAML parsing, unsupported version
//! ├── Validation(ValidationReport) collected mapping problems
//! ├── Overlay(OverlayError)        clone acquisition and unlink guards
//! └── Git(GitError)                version-control failures
//! ```
//!
//! Per-destination filesystem failures are not errors of the run: they are
//! recorded as [`ExecutionError`] inside each action outcome so sibling
//! destinations keep going.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for repoverlay.
#[derive(Error, Debug)]
pub enum RepoverlayError {
    /// Configuration could not be found, parsed, or is unsupported.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One or more mapping problems; nothing was applied.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationReport),

    /// Overlay acquisition or removal guard failed.
    #[error("{0}")]
    Overlay(#[from] OverlayError),

    /// A version-control operation failed.
    #[error("Git error: {0}")]
    Git(#[from] GitError),
}

impl RepoverlayError {
    /// Unwrap to the specific error as an [`anyhow::Error`], so callers at
    /// the CLI boundary can `downcast_ref` to the inner type.
    #[must_use]
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Config(e) => e.into(),
            Self::Validation(e) => e.into(),
            Self::Overlay(e) => e.into(),
            Self::Git(e) => e.into(),
        }
    }
}

/// Errors that arise from configuration discovery and parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No `.repoverlay.yaml` exists in the start directory or any ancestor.
    #[error("No .repoverlay.yaml found (searched upward from {})", .start.display())]
    NotFound {
        /// Directory the upward search started from.
        start: PathBuf,
    },

    /// The config or ignore file exists but could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Structurally invalid document (bad YAML, wrong node types, empty file).
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// A required key is absent.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// `version` is present but is not `1`.
    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// A single mapping problem found before anything touches the filesystem.
///
/// Violations are collected, never short-circuited, so one run reports every
/// problem at once.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Violation {
    /// Destination starts at a filesystem root.
    #[error("destination must be relative: {dst}")]
    AbsoluteDestination {
        /// Offending destination.
        dst: String,
    },

    /// Destination contains a `..` segment.
    #[error("destination cannot contain '..': {dst}")]
    ParentTraversal {
        /// Offending destination.
        dst: String,
    },

    /// Destination equals or is nested in `.git`.
    #[error("destination cannot be in .git/: {dst}")]
    InsideGitDir {
        /// Offending destination.
        dst: String,
    },

    /// Destination would overwrite repoverlay's own config or state.
    #[error("cannot overwrite repoverlay files: {dst}")]
    ReservedPath {
        /// Offending destination.
        dst: String,
    },

    /// Destination normalises to the target root itself.
    #[error("destination cannot be empty (source: {src})")]
    EmptyDestination {
        /// Source that mapped onto the root.
        src: String,
    },

    /// Two or more sources resolve to the same destination.
    #[error("duplicate destination '{dst}' (sources: {})", .sources.join(", "))]
    DuplicateDestination {
        /// Shared destination.
        dst: String,
        /// Every contributing source, in mapping order.
        sources: Vec<String>,
    },

    /// One destination is nested inside another.
    #[error("overlapping destinations: '{child}' is inside '{parent}'")]
    OverlappingDestinations {
        /// The shorter destination.
        parent: String,
        /// The destination nested under `parent`.
        child: String,
    },

    /// An explicit mapping names a source absent from the overlay.
    #[error("source not found in overlay: {src}")]
    SourceMissing {
        /// Missing source.
        src: String,
    },

    /// An explicit mapping source is absolute or climbs out with `..`.
    #[error("source must stay inside the overlay: {src}")]
    SourceOutsideOverlay {
        /// Offending source.
        src: String,
    },
}

/// The collected set of [`Violation`]s for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Build a report, dropping exact duplicates while keeping first-seen order.
    #[must_use]
    pub fn new(violations: impl IntoIterator<Item = Violation>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let violations = violations
            .into_iter()
            .filter(|v| seen.insert(v.clone()))
            .collect();
        Self { violations }
    }

    /// The individual problems.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// `true` when there is nothing to report.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of problems.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.violations.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Failure applying one plan action; recorded per entry, never fatal to the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{dst}: {message}")]
pub struct ExecutionError {
    /// Destination the action targeted.
    pub dst: String,
    /// Rendered cause chain.
    pub message: String,
}

/// Errors that arise from overlay acquisition and unlink guards.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// `.repoverlay/repo` already exists and `--force` was not given.
    #[error("Already cloned. Remove .repoverlay/ to re-clone or use --force")]
    AlreadyCloned,

    /// A command that needs the clone ran before `clone`.
    #[error("Overlay repo not cloned. Run 'repoverlay clone' first")]
    NotCloned,

    /// A local `overlay.repo` path does not exist.
    #[error("Local overlay path not found: {0}")]
    LocalPathMissing(String),

    /// A local `overlay.repo` path is not a directory.
    #[error("Local overlay path is not a directory: {0}")]
    LocalPathNotDirectory(String),

    /// Unlink would discard commits that only exist in the clone.
    #[error(
        "Cannot unlink - there are {0} unpushed commit(s) in the overlay repo. \
         Run 'repoverlay push' first, or remove the commits with 'git reset'"
    )]
    UnpushedCommits(usize),

    /// Unlink would discard uncommitted work in the clone.
    #[error(
        "Uncommitted changes detected in overlay repo ({}); commit them or pass --force",
        .0.join(", ")
    )]
    UncommittedChanges(Vec<String>),

    /// Filesystem failure while preparing or removing the clone directory.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being operated on.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from the version-control capability.
#[derive(Error, Debug)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("failed to run git {command}: {message}")]
    Spawn {
        /// Subcommand being run.
        command: String,
        /// Spawn failure description.
        message: String,
    },

    /// git ran and exited non-zero.
    #[error("git {command} failed: {stderr}")]
    Failed {
        /// Subcommand that failed.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Reconciling a local non-bare remote by pulling into it failed.
    #[error(
        "pull into {remote} (branch {branch}) failed; resolve it manually in that working directory: {stderr}"
    )]
    PullIntoRemote {
        /// Remote working directory.
        remote: String,
        /// Checked-out branch that was being updated.
        branch: String,
        /// Captured standard error.
        stderr: String,
    },
}
