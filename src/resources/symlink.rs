//! Creating, replacing, and removing symlinks.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::fs::ensure_parent_dir;

/// Create a symlink at `link` pointing to `target`, creating parents first.
///
/// Returns the parent directories that did not exist before.
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the link already exists.
pub fn create_link(link: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let made = ensure_parent_dir(link)?;
    create_symlink(target, link)?;
    Ok(made)
}

/// Replace whatever is at `link` with a symlink to `target`.
///
/// Directories are removed recursively first. Files and symlinks are
/// swapped by creating the new link beside them and renaming it over.
/// Returns the parent directories that did not exist before.
///
/// # Errors
///
/// Returns an error if the existing entry cannot be removed or the new link
/// cannot be put in place.
pub fn replace_link(link: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::symlink_metadata(link).ok();
    if meta.as_ref().is_some_and(|m| m.is_dir()) {
        std::fs::remove_dir_all(link)
            .with_context(|| format!("removing directory: {}", link.display()))?;
        return create_link(link, target);
    }
    if meta.is_none() {
        return create_link(link, target);
    }

    let tmp = sibling_tmp(link);
    if std::fs::symlink_metadata(&tmp).is_ok() {
        remove_symlink(&tmp)?;
    }
    create_symlink(target, &tmp)?;

    #[cfg(windows)]
    {
        // Windows cannot rename over a directory symlink.
        if let Err(e) = remove_symlink(link) {
            let _ = remove_symlink(&tmp);
            return Err(e);
        }
    }

    if let Err(e) = std::fs::rename(&tmp, link) {
        let _ = remove_symlink(&tmp);
        return Err(e).with_context(|| format!("rename {} to {}", tmp.display(), link.display()));
    }
    Ok(Vec::new())
}

/// Remove the symlink at `link`. The link's target is never touched.
///
/// # Errors
///
/// Returns an error if `link` cannot be read or removed.
pub fn remove_link(link: &Path) -> Result<()> {
    remove_symlink(link)
}

fn sibling_tmp(link: &Path) -> PathBuf {
    let name = link.file_name().map_or_else(
        || "repoverlay_tmp".to_string(),
        |n| format!(".{}.repoverlay_tmp", n.to_string_lossy()),
    );
    link.with_file_name(name)
}

/// Overlay links always name files, so Windows gets file symlinks.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let made = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let made = std::os::windows::fs::symlink_file(target, link);
    made.with_context(|| format!("linking {} -> {}", link.display(), target.display()))
}

/// Delete the link itself. A Windows directory link left by another tool
/// only goes away with `remove_dir`.
fn remove_symlink(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        #[cfg(windows)]
        Err(_) if std::fs::remove_dir(path).is_ok() => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing link {}", path.display())),
    }
}
