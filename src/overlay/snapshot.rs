//! Point-in-time views of the target root and the overlay tree.
//!
//! The planner reads only from an [`FsSnapshot`]; tests build one by hand
//! instead of staging files on disk.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context as _, Result};
use walkdir::WalkDir;

use super::paths;

/// What exists at a destination path, observed without following links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Nothing there.
    Absent,
    /// A regular file.
    File,
    /// A real directory.
    Directory,
    /// A symlink with its raw target text.
    Symlink {
        /// Target as stored in the link.
        target: String,
    },
}

impl EntryState {
    /// Short human description, used in conflict messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Absent => "nothing".to_string(),
            Self::File => "regular file".to_string(),
            Self::Directory => "directory".to_string(),
            Self::Symlink { target } => format!("symlink to {target}"),
        }
    }
}

const ABSENT: EntryState = EntryState::Absent;

/// Observed state of a set of destination paths and their ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsSnapshot {
    entries: BTreeMap<String, EntryState>,
}

impl FsSnapshot {
    /// An empty snapshot; every path reads as [`EntryState::Absent`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_entry(mut self, path: &str, state: EntryState) -> Self {
        self.insert(path, state);
        self
    }

    /// Record the state of `path`.
    pub fn insert(&mut self, path: &str, state: EntryState) {
        self.entries.insert(paths::normalize(path), state);
    }

    /// State of `path`, defaulting to absent.
    #[must_use]
    pub fn state(&self, path: &str) -> &EntryState {
        self.entries.get(&paths::normalize(path)).unwrap_or(&ABSENT)
    }

    /// Observe every path in `dsts` plus each of its ancestors under `root`.
    #[must_use]
    pub fn capture<'a>(root: &Path, dsts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut snapshot = Self::new();
        for dst in dsts {
            for path in paths::ancestors(dst)
                .into_iter()
                .chain(std::iter::once(paths::normalize(dst)))
            {
                if !snapshot.entries.contains_key(&path) {
                    let state = probe(&root.join(&path));
                    snapshot.entries.insert(path, state);
                }
            }
        }
        snapshot
    }
}

fn probe(path: &Path) -> EntryState {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return EntryState::Absent;
    };
    if meta.file_type().is_symlink() {
        let target = std::fs::read_link(path)
            .map(|t| t.to_string_lossy().into_owned())
            .unwrap_or_default();
        EntryState::Symlink { target }
    } else if meta.is_dir() {
        EntryState::Directory
    } else {
        EntryState::File
    }
}

/// Listing of an overlay: every file and directory, relative to its root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayTree {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
}

impl OverlayTree {
    /// Walk `dir` without following symlinks, skipping a top-level `.git`.
    ///
    /// Symlinks inside the overlay are listed as files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be walked.
    pub fn capture(dir: &Path) -> Result<Self> {
        let mut tree = Self::default();
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == std::ffi::OsStr::new(".git")));

        for entry in walker {
            let entry = entry.with_context(|| format!("walking overlay {}", dir.display()))?;
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                tree.dirs.insert(relative);
            } else {
                tree.files.insert(relative);
            }
        }
        Ok(tree)
    }

    /// Build a listing from file paths; parent directories are implied.
    #[must_use]
    pub fn from_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for file in files {
            let file = paths::normalize(file.as_ref());
            tree.dirs.extend(paths::ancestors(&file));
            tree.files.insert(file);
        }
        tree
    }

    /// `true` when `path` is a file in the overlay.
    #[must_use]
    pub fn is_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// `true` when `path` is a directory in the overlay; `""` is the root.
    #[must_use]
    pub fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    /// All files, sorted.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Files below `dir` as `(overlay path, path relative to dir)`, sorted.
    pub fn files_under<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.files.iter().filter_map(move |file| {
            if dir.is_empty() {
                return Some((file.as_str(), file.as_str()));
            }
            file.strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| (file.as_str(), rest))
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unknown_paths_read_as_absent() {
        let snapshot = FsSnapshot::new().with_entry("a", EntryState::File);
        assert_eq!(snapshot.state("a"), &EntryState::File);
        assert_eq!(snapshot.state("./a"), &EntryState::File);
        assert_eq!(snapshot.state("b"), &EntryState::Absent);
    }

    #[test]
    fn capture_records_destination_and_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/file"), "x").unwrap();

        let snapshot = FsSnapshot::capture(dir.path(), ["a/b/file", "missing/x"]);
        assert_eq!(snapshot.state("a"), &EntryState::Directory);
        assert_eq!(snapshot.state("a/b"), &EntryState::Directory);
        assert_eq!(snapshot.state("a/b/file"), &EntryState::File);
        assert_eq!(snapshot.state("missing"), &EntryState::Absent);
    }

    #[cfg(unix)]
    #[test]
    fn capture_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("nowhere", dir.path().join("dangling")).unwrap();
        let snapshot = FsSnapshot::capture(dir.path(), ["dangling"]);
        assert_eq!(
            snapshot.state("dangling"),
            &EntryState::Symlink {
                target: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn overlay_tree_skips_top_level_git() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(dir.path().join("claude")).unwrap();
        fs::write(dir.path().join("claude/settings.json"), "{}").unwrap();
        fs::write(dir.path().join(".envrc"), "").unwrap();

        let tree = OverlayTree::capture(dir.path()).unwrap();
        let files: Vec<&str> = tree.files().collect();
        assert_eq!(files, vec![".envrc", "claude/settings.json"]);
        assert!(tree.is_dir("claude"));
        assert!(!tree.is_dir(".git"));
    }

    #[test]
    fn files_under_strips_prefix() {
        let tree = OverlayTree::from_files(["docs/a.md", "docs/sub/b.md", "docsx/c.md"]);
        let under: Vec<_> = tree.files_under("docs").collect();
        assert_eq!(under, vec![("docs/a.md", "a.md"), ("docs/sub/b.md", "sub/b.md")]);
        assert!(tree.is_dir("docs/sub"));
    }

    #[test]
    fn files_under_root_lists_everything() {
        let tree = OverlayTree::from_files(["a", "b/c"]);
        assert_eq!(tree.files_under("").count(), 2);
    }
}
