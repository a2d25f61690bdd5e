//! Directory helpers: parent creation, tree copies, and empty-parent pruning.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use walkdir::WalkDir;

use crate::overlay::OVERLAY_DIR;

/// Ensure the parent directory of `path` exists.
///
/// Returns the directories that had to be created, outermost first.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<Vec<PathBuf>> {
    let Some(parent) = path.parent() else {
        return Ok(Vec::new());
    };
    let mut missing: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && std::fs::symlink_metadata(dir).is_err())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create parent: {}", parent.display()))?;
    Ok(missing)
}

/// Copy the tree at `src` into `dst`, leaving out every `.git` directory.
///
/// Symlinks inside the tree are recreated with the same target, not
/// followed. Returns the number of non-directory entries copied.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or an entry cannot be
/// written under `dst`.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", entry.path().display(), src.display()))?;
        let out = dst.join(rel);
        let kind = entry.file_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&out)
                .with_context(|| format!("creating directory {}", out.display()))?;
            continue;
        }
        if kind.is_symlink() {
            copy_link(entry.path(), &out)?;
        } else {
            std::fs::copy(entry.path(), &out)
                .with_context(|| format!("copying {}", rel.display()))?;
        }
        copied += 1;
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_link(link: &Path, out: &Path) -> Result<()> {
    let target =
        std::fs::read_link(link).with_context(|| format!("reading link {}", link.display()))?;
    std::os::unix::fs::symlink(&target, out)
        .with_context(|| format!("recreating link {}", out.display()))
}

#[cfg(not(unix))]
fn copy_link(link: &Path, out: &Path) -> Result<()> {
    std::fs::copy(link, out)
        .map(drop)
        .with_context(|| format!("copying {}", link.display()))
}

/// Remove now-empty directories above `removed` that `removable` accepts,
/// walking upward until a non-empty or rejected directory, `root`, or
/// `.repoverlay/` is reached.
///
/// Returns the directories that were removed. A directory that cannot be
/// removed stops the walk without error.
pub fn prune_empty_parents(
    root: &Path,
    removed: &Path,
    removable: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    let mut pruned = Vec::new();
    let mut current = removed.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) || !removable(dir) {
            break;
        }
        if dir
            .strip_prefix(root)
            .is_ok_and(|rel| rel.starts_with(OVERLAY_DIR))
        {
            break;
        }
        let is_empty = std::fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
        if !is_empty || std::fs::remove_dir(dir).is_err() {
            break;
        }
        pruned.push(dir.to_path_buf());
        current = dir.parent();
    }
    pruned
}
