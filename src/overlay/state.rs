//! `.repoverlay/state.yaml`: directories created to hold links.
//!
//! Only directories listed here are pruned when links go away, so a
//! directory the user already had is never removed.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use super::{overlay_dir, paths};

/// File name under `.repoverlay/`.
pub const STATE_FILE: &str = "state.yaml";

/// What earlier runs left on disk besides the links themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayState {
    /// Root-relative, `/`-separated directories created for links.
    #[serde(default)]
    pub created_directories: BTreeSet<String>,
}

impl OverlayState {
    /// Location of the state file under `root`.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        overlay_dir(root).join(STATE_FILE)
    }

    /// Read the state for `root`; a missing or empty file is the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write the state for `root`. An empty state removes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or removed.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        if self.created_directories.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
            return Ok(());
        }
        let dir = overlay_dir(root);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let yaml = serde_yaml::to_string(self).context("serializing overlay state")?;
        std::fs::write(&path, yaml).with_context(|| format!("writing {}", path.display()))
    }

    /// Remember `dirs` (absolute, under `root`) as created by a link.
    pub fn record_created(&mut self, root: &Path, dirs: &[PathBuf]) {
        self.created_directories
            .extend(dirs.iter().filter_map(|dir| key(root, dir)));
    }

    /// `true` when `dir` was created by an earlier link.
    #[must_use]
    pub fn is_created(&self, root: &Path, dir: &Path) -> bool {
        key(root, dir).is_some_and(|k| self.created_directories.contains(&k))
    }

    /// Drop `dir` after it has been removed.
    pub fn forget(&mut self, root: &Path, dir: &Path) {
        if let Some(k) = key(root, dir) {
            self.created_directories.remove(&k);
        }
    }
}

fn key(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let key = paths::normalize(&rel.to_string_lossy());
    (!key.is_empty()).then_some(key)
}
