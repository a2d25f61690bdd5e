//! Where the overlay comes from, how it lands in `.repoverlay/repo`, and how
//! changes made in the clone go back.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::snapshot::OverlayTree;
use super::{clone_dir, overlay_dir};
use crate::config::OverlaySource;
use crate::error::{GitError, OverlayError, RepoverlayError};
use crate::git::VersionControl;
use crate::logging::Log;
use crate::resources::fs;

/// `true` unless `repo` looks like a URL or an scp-style `user@host:path`.
#[must_use]
pub fn is_local_path(repo: &str) -> bool {
    if repo.contains("://") {
        return false;
    }
    match repo.split_once(':') {
        Some((head, _)) => {
            // A single letter before the colon is a Windows drive.
            !(head.contains('@') || (head.len() > 1 && !head.contains(['/', '\\'])))
        }
        None => true,
    }
}

/// Reduce a repository URL to `host/owner/name` so SSH and HTTPS spellings
/// of the same repository compare equal.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_ascii_lowercase();
    let without_scheme = match lowered.split_once("://") {
        Some((_, rest)) => rest.to_string(),
        None => match lowered.split_once(':') {
            Some((host, path)) if !host.contains('/') => format!("{host}/{path}"),
            _ => lowered.clone(),
        },
    };
    let without_user = match without_scheme.split_once('@') {
        Some((user, rest)) if !user.contains('/') => rest,
        _ => without_scheme.as_str(),
    };
    let trimmed = without_user.trim_end_matches('/');
    trimmed
        .strip_suffix(".git")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

/// `true` when two URLs name the same repository.
#[must_use]
pub fn urls_match(a: &str, b: &str) -> bool {
    normalize_url(a) == normalize_url(b)
}

/// A configured overlay source, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A directory on this machine (absolute after resolution).
    Local(PathBuf),
    /// Anything git can clone by URL.
    Remote(String),
}

impl SourceLocation {
    /// Classify `source.repo`, resolving relative local paths against `root`.
    #[must_use]
    pub fn of(root: &Path, source: &OverlaySource) -> Self {
        let repo = source.repo.as_str();
        if !is_local_path(repo) {
            return Self::Remote(repo.to_string());
        }
        let path = match repo.strip_prefix("~/") {
            Some(rest) => std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from(repo), |home| PathBuf::from(home).join(rest)),
            None => PathBuf::from(repo),
        };
        if path.is_absolute() {
            Self::Local(path)
        } else {
            Self::Local(root.join(path))
        }
    }

    fn checked_dir(&self, repo: &str) -> Result<Option<&Path>, OverlayError> {
        match self {
            Self::Remote(_) => Ok(None),
            Self::Local(path) if !path.exists() => {
                Err(OverlayError::LocalPathMissing(repo.to_string()))
            }
            Self::Local(path) if !path.is_dir() => {
                Err(OverlayError::LocalPathNotDirectory(repo.to_string()))
            }
            Self::Local(path) => Ok(Some(path)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> OverlayError {
    OverlayError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// `true` when `path` is a git working tree or a bare repository.
fn is_git_source(path: &Path, vcs: &dyn VersionControl) -> bool {
    path.join(".git").exists() || vcs.is_bare(path).unwrap_or(false)
}

/// `true` when the clone exists and is a git repository (not a plain copy).
#[must_use]
pub fn clone_is_git(root: &Path) -> bool {
    clone_dir(root).join(".git").exists()
}

/// Fetch the overlay into `.repoverlay/repo`.
///
/// Git sources are cloned (then `overlay.ref` is checked out); a plain local
/// directory is copied without its `.git`. With `force` an existing clone is
/// deleted first.
///
/// # Errors
///
/// Returns [`OverlayError::AlreadyCloned`] when a clone exists and `force` is
/// unset, a local-path error when the source directory is unusable, or a
/// [`GitError`] when cloning or checkout fails.
pub fn acquire(
    root: &Path,
    source: &OverlaySource,
    vcs: &dyn VersionControl,
    force: bool,
    log: &dyn Log,
) -> Result<(), RepoverlayError> {
    let dest = clone_dir(root);
    if dest.exists() && !force {
        return Err(OverlayError::AlreadyCloned.into());
    }

    let location = SourceLocation::of(root, source);
    let local = location.checked_dir(&source.repo)?;

    if dest.exists() {
        log.debug(&format!("removing existing clone at {}", dest.display()));
        std::fs::remove_dir_all(&dest).map_err(|e| io_error(&dest, e))?;
    }
    let state_dir = overlay_dir(root);
    std::fs::create_dir_all(&state_dir).map_err(|e| io_error(&state_dir, e))?;

    let cloned = match local {
        Some(path) if !is_git_source(path, vcs) => {
            log.info(&format!("copying {} (not a git repository)", path.display()));
            let copied = fs::copy_tree(path, &dest)
                .map_err(|e| io_error(&dest, std::io::Error::other(format!("{e:#}"))))?;
            log.debug(&format!("copied {copied} file(s)"));
            false
        }
        Some(path) => {
            log.info(&format!("cloning {}", path.display()));
            vcs.clone_repo(&path.to_string_lossy(), &dest)?;
            true
        }
        None => {
            log.info(&format!("cloning {}", source.repo));
            vcs.clone_repo(&source.repo, &dest)?;
            true
        }
    };

    match (&source.reference, cloned) {
        (Some(reference), true) => {
            log.info(&format!("checking out {reference}"));
            vcs.checkout(&dest, reference)?;
        }
        (Some(reference), false) => {
            log.warn(&format!(
                "overlay.ref '{reference}' ignored: source is a plain directory"
            ));
        }
        (None, _) => {}
    }
    Ok(())
}

/// Listing used to preview a clone without acquiring it.
///
/// Local sources are read in place. Remote sources cannot be listed, so the
/// result is `None`.
///
/// # Errors
///
/// Returns an error if a local source is missing, not a directory, or
/// cannot be walked.
pub fn preview_tree(root: &Path, source: &OverlaySource) -> Result<Option<OverlayTree>> {
    let location = SourceLocation::of(root, source);
    match location.checked_dir(&source.repo)? {
        Some(path) => Ok(Some(OverlayTree::capture(path)?)),
        None => Ok(None),
    }
}

/// Listing of the existing clone, `None` when it is absent.
///
/// # Errors
///
/// Returns an error if the clone exists but cannot be walked.
pub fn clone_tree(root: &Path) -> Result<Option<OverlayTree>> {
    let dir = clone_dir(root);
    if dir.is_dir() {
        Ok(Some(OverlayTree::capture(&dir)?))
    } else {
        Ok(None)
    }
}

/// How `push` delivers the clone's commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRoute {
    /// Ordinary `git push` from the clone.
    PlainPush,
    /// The source is a local working tree with the same branch checked out;
    /// pull the clone's branch into it instead.
    PullIntoRemote {
        /// The source's working directory.
        remote_dir: PathBuf,
        /// Branch checked out on both sides.
        branch: String,
    },
}

/// Pick the push route for `source`.
///
/// # Errors
///
/// Returns a [`GitError`] if branch detection fails to run.
pub fn detect_push_route(
    root: &Path,
    source: &OverlaySource,
    vcs: &dyn VersionControl,
) -> Result<PushRoute, GitError> {
    let SourceLocation::Local(remote_dir) = SourceLocation::of(root, source) else {
        return Ok(PushRoute::PlainPush);
    };
    if !remote_dir.join(".git").exists() || vcs.is_bare(&remote_dir).unwrap_or(true) {
        return Ok(PushRoute::PlainPush);
    }
    let Some(remote_branch) = vcs.current_branch(&remote_dir)? else {
        return Ok(PushRoute::PlainPush);
    };
    let local_branch = vcs.current_branch(&clone_dir(root))?;
    if local_branch.as_deref() != Some(remote_branch.as_str()) {
        return Ok(PushRoute::PlainPush);
    }
    Ok(PushRoute::PullIntoRemote {
        remote_dir,
        branch: remote_branch,
    })
}

/// Push the clone's commits back to the source along the detected route.
///
/// # Errors
///
/// Returns [`GitError::PullIntoRemote`] when pulling into a local working
/// tree fails (typically a conflict to resolve there by hand), or the push
/// error otherwise.
pub fn push(
    root: &Path,
    source: &OverlaySource,
    vcs: &dyn VersionControl,
    log: &dyn Log,
) -> Result<PushRoute, GitError> {
    let clone = clone_dir(root);
    let route = detect_push_route(root, source, vcs)?;
    match &route {
        PushRoute::PlainPush => {
            log.debug("pushing from clone");
            vcs.push(&clone)?;
        }
        PushRoute::PullIntoRemote { remote_dir, branch } => {
            log.info(&format!(
                "{} has {branch} checked out; pulling into it",
                remote_dir.display()
            ));
            vcs.pull_from(remote_dir, &clone, branch)
                .map_err(|e| GitError::PullIntoRemote {
                    remote: remote_dir.display().to_string(),
                    branch: branch.clone(),
                    stderr: match e {
                        GitError::Failed { stderr, .. } => stderr,
                        other => other.to_string(),
                    },
                })?;
            if let Err(e) = vcs.fetch(&clone) {
                log.debug(&format!("fetch after pull-into-remote failed: {e}"));
            }
        }
    }
    Ok(route)
}
