use anyhow::{Result, bail};

use super::{ReconcileOptions, Workspace, check_gitignore, reconcile};
use crate::cli::{CloneOpts, GlobalOpts};
use crate::error::{OverlayError, RepoverlayError};
use crate::git::{GitCli, VersionControl};
use crate::logging::{Log, StepStatus};
use crate::overlay::execute::RunStatus;
use crate::overlay::plan::Mode;
use crate::overlay::source::{self, SourceLocation};
use crate::overlay::{CLONE_DIR, clone_dir};

/// Run the clone command.
///
/// # Errors
///
/// Returns an error if configuration loading, acquisition, or validation fails.
pub fn run(global: &GlobalOpts, opts: &CloneOpts, log: &dyn Log) -> Result<RunStatus> {
    let ws = Workspace::open(global, log)?;
    let git = GitCli::new();
    if matches!(
        SourceLocation::of(&ws.root, &ws.config.source),
        SourceLocation::Remote(_)
    ) && !git.is_available()
    {
        bail!("git is not installed or not on PATH");
    }
    clone_workspace(&ws, &git, opts.force, global.dry_run, log)
}

/// Acquire the overlay for `ws` and create its links.
///
/// In dry-run nothing is acquired: a local source is previewed in place and
/// a remote one is previewed from its explicit mappings only.
///
/// # Errors
///
/// Returns an error if the clone already exists without `force`, the source
/// cannot be acquired, or the mappings fail validation.
pub fn clone_workspace(
    ws: &Workspace,
    vcs: &dyn VersionControl,
    force: bool,
    dry_run: bool,
    log: &dyn Log,
) -> Result<RunStatus> {
    log.stage("Acquiring overlay");
    let tree = if dry_run {
        if clone_dir(&ws.root).exists() && !force {
            return Err(OverlayError::AlreadyCloned.into());
        }
        log.dry_run(&format!(
            "would clone {} into {CLONE_DIR}",
            ws.config.source.repo
        ));
        log.record_step("acquire", StepStatus::DryRun, None);
        source::preview_tree(&ws.root, &ws.config.source)?
    } else {
        source::acquire(&ws.root, &ws.config.source, vcs, force, log)
            .inspect_err(|e| {
                log.record_step("acquire", StepStatus::Failed, Some(&e.to_string()));
            })
            .map_err(RepoverlayError::into_inner)?;
        log.record_step("acquire", StepStatus::Ok, Some(&ws.config.source.repo));
        source::clone_tree(&ws.root)?
    };

    let result = reconcile(
        ws,
        tree.as_ref(),
        ReconcileOptions {
            mode: Mode::Create,
            force,
            dry_run,
        },
        log,
    )?;
    Ok(result
        .status
        .combine(check_gitignore(ws, &result.links, log)))
}
