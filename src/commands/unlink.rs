use std::path::Path;

use anyhow::{Context as _, Result};

use super::{ReconcileOptions, Workspace, reconcile};
use crate::cli::{GlobalOpts, UnlinkOpts};
use crate::error::{OverlayError, RepoverlayError};
use crate::git::{GitCli, VersionControl};
use crate::logging::{Log, StepStatus};
use crate::overlay::execute::RunStatus;
use crate::overlay::plan::Mode;
use crate::overlay::{OVERLAY_DIR, clone_dir, overlay_dir, source};

/// Run the unlink command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the clone has work that
/// would be lost, or `.repoverlay/` cannot be removed.
pub fn run(global: &GlobalOpts, opts: &UnlinkOpts, log: &dyn Log) -> Result<RunStatus> {
    let ws = Workspace::open(global, log)?;
    unlink_workspace(&ws, &GitCli::new(), opts, global.dry_run, log)
}

/// Refuse to unlink when the clone holds commits or edits that exist nowhere
/// else. Unpushed commits always block; uncommitted changes block unless
/// `force`, and are not checked in dry-run.
///
/// # Errors
///
/// Returns [`OverlayError::UnpushedCommits`] or
/// [`OverlayError::UncommittedChanges`], or a git failure.
pub fn check_guards(
    clone: &Path,
    vcs: &dyn VersionControl,
    force: bool,
    dry_run: bool,
) -> Result<(), RepoverlayError> {
    let unpushed = vcs.unpushed_commit_count(clone)?;
    if unpushed > 0 {
        return Err(OverlayError::UnpushedCommits(unpushed).into());
    }
    if force || dry_run {
        return Ok(());
    }
    let changes = vcs.uncommitted_changes(clone)?;
    if changes.is_empty() {
        Ok(())
    } else {
        Err(OverlayError::UncommittedChanges(changes).into())
    }
}

/// Remove every overlay link for `ws`, strip the exclude block, and
/// optionally delete `.repoverlay/`.
///
/// Works without the clone: recorded destinations and unexpanded explicit
/// mappings are still removed when they point into `.repoverlay/repo`.
///
/// # Errors
///
/// Returns an error if a guard refuses, validation fails, or `.repoverlay/`
/// cannot be deleted.
pub fn unlink_workspace(
    ws: &Workspace,
    vcs: &dyn VersionControl,
    opts: &UnlinkOpts,
    dry_run: bool,
    log: &dyn Log,
) -> Result<RunStatus> {
    log.stage("Checking overlay clone");
    if source::clone_is_git(&ws.root) {
        check_guards(&clone_dir(&ws.root), vcs, opts.force, dry_run)
            .inspect_err(|e| {
                log.record_step("guards", StepStatus::Failed, Some(&e.to_string()));
            })
            .map_err(RepoverlayError::into_inner)?;
        log.record_step("guards", StepStatus::Ok, None);
    }
    let tree = source::clone_tree(&ws.root)?;
    if tree.is_none() {
        log.info("overlay clone not found; removing recorded links only");
    }

    let result = reconcile(
        ws,
        tree.as_ref(),
        ReconcileOptions {
            mode: Mode::Remove,
            force: opts.force,
            dry_run,
        },
        log,
    )?;

    if opts.remove_repo {
        remove_state_dir(&ws.root, result.status, dry_run, log)?;
    }
    Ok(result.status)
}

fn remove_state_dir(root: &Path, status: RunStatus, dry_run: bool, log: &dyn Log) -> Result<()> {
    let dir = overlay_dir(root);
    if !dir.exists() {
        log.record_step("remove repo", StepStatus::Skipped, Some("nothing to remove"));
        return Ok(());
    }
    if status == RunStatus::Failed {
        log.warn(&format!("keeping {OVERLAY_DIR}/: some links could not be removed"));
        log.record_step("remove repo", StepStatus::Skipped, Some("links remain"));
        return Ok(());
    }
    if dry_run {
        log.dry_run(&format!("would remove {OVERLAY_DIR}/"));
        log.record_step("remove repo", StepStatus::DryRun, None);
        return Ok(());
    }
    std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
    log.info(&format!("removed {OVERLAY_DIR}/"));
    log.record_step("remove repo", StepStatus::Ok, None);
    Ok(())
}
