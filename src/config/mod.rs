//! Discovery and loading of `.repoverlay.yaml` and `.repoverlayignore`.
pub mod ignore;
pub mod yaml_loader;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

pub use ignore::IgnoreRules;

use crate::error::ConfigError;

/// Config file name, searched for upward from the working directory.
pub const CONFIG_FILE: &str = ".repoverlay.yaml";

/// Ignore file name, read from the target root.
pub const IGNORE_FILE: &str = ".repoverlayignore";

/// Where the overlay comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySource {
    /// Remote URL or local path (relative paths resolve against the target root).
    pub repo: String,
    /// Branch, tag, or commit to check out after cloning.
    pub reference: Option<String>,
}

/// One explicit `src -> dst` mapping from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSpec {
    /// Path relative to the overlay root; a directory expands to its files.
    pub src: String,
    /// Path relative to the target root.
    pub dst: String,
}

/// How overlay files are assigned destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingMode {
    /// Only the listed mappings.
    Explicit(Vec<MappingSpec>),
    /// Every overlay file maps to the same relative path in the target.
    MirrorAll,
}

/// Fully loaded configuration for one target repository.
#[derive(Debug, Clone)]
pub struct Config {
    /// Overlay origin.
    pub source: OverlaySource,
    /// Mapping mode.
    pub mappings: MappingMode,
    /// Rules from `.repoverlayignore`.
    pub ignore: IgnoreRules,
}

impl Config {
    /// Walk upward from `start` to the first directory holding
    /// `.repoverlay.yaml` and return that directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when no ancestor has a config file.
    pub fn discover(start: &Path) -> Result<PathBuf, ConfigError> {
        start
            .ancestors()
            .find(|dir| dir.join(CONFIG_FILE).is_file())
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::NotFound {
                start: start.to_path_buf(),
            })
    }

    /// Load configuration from the target root `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is unreadable or invalid, or if the
    /// ignore file exists but cannot be read.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let (source, mappings) = yaml_loader::parse(&content)?;
        let ignore = IgnoreRules::load(&root.join(IGNORE_FILE))
            .with_context(|| format!("loading {IGNORE_FILE}"))?;

        Ok(Self {
            source,
            mappings,
            ignore,
        })
    }
}
