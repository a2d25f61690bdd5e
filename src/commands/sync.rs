use anyhow::Result;

use super::{ReconcileOptions, Workspace, check_gitignore, reconcile};
use crate::cli::{GlobalOpts, SyncOpts};
use crate::error::OverlayError;
use crate::git::{GitCli, VersionControl};
use crate::logging::{Log, StepStatus};
use crate::overlay::execute::RunStatus;
use crate::overlay::plan::Mode;
use crate::overlay::{clone_dir, source, warnings};

/// Run the sync command.
///
/// # Errors
///
/// Returns an error if configuration loading or validation fails, or the
/// overlay has not been cloned.
pub fn run(global: &GlobalOpts, opts: &SyncOpts, log: &dyn Log) -> Result<RunStatus> {
    let ws = Workspace::open(global, log)?;
    sync_workspace(&ws, &GitCli::new(), opts.force, global.dry_run, log)
}

/// Reconcile links for `ws` against the existing clone.
///
/// # Errors
///
/// Returns [`OverlayError::NotCloned`] when `.repoverlay/repo` is missing, or
/// the validation report when mappings are invalid.
pub fn sync_workspace(
    ws: &Workspace,
    vcs: &dyn VersionControl,
    force: bool,
    dry_run: bool,
    log: &dyn Log,
) -> Result<RunStatus> {
    let Some(tree) = source::clone_tree(&ws.root)? else {
        return Err(OverlayError::NotCloned.into());
    };

    let mut status = RunStatus::Success;
    if source::clone_is_git(&ws.root) {
        let origin = vcs.remote_url(&clone_dir(&ws.root)).unwrap_or_else(|e| {
            log.debug(&format!("reading clone origin: {e}"));
            None
        });
        if let Some(message) = warnings::url_mismatch(&ws.root, &ws.config.source, origin.as_deref())
        {
            log.warn(&message);
            log.record_step("origin", StepStatus::Warning, Some("repository URL mismatch"));
            status = RunStatus::Partial;
        }
    }

    let result = reconcile(
        ws,
        Some(&tree),
        ReconcileOptions {
            mode: Mode::Sync,
            force,
            dry_run,
        },
        log,
    )?;
    Ok(status
        .combine(result.status)
        .combine(check_gitignore(ws, &result.links, log)))
}
