//! Git commands run inside the overlay clone.
//!
//! `pull`, `checkout`, and `merge` change the clone's contents, so each is
//! followed by a sync. `push` goes through [`source::push`] so local working
//! tree sources are updated by pulling into them.
use std::path::PathBuf;

use anyhow::{Result, bail};

use super::Workspace;
use super::sync::sync_workspace;
use crate::cli::{Command, GlobalOpts};
use crate::error::OverlayError;
use crate::git::{GitCli, VersionControl};
use crate::logging::{Log, StepStatus};
use crate::overlay::execute::RunStatus;
use crate::overlay::source::{self, PushRoute};
use crate::overlay::{CLONE_DIR, clone_dir};

/// Run one of the git passthrough commands.
///
/// # Errors
///
/// Returns an error if the overlay is not cloned, the clone is not a git
/// repository, or git fails.
pub fn run(global: &GlobalOpts, command: &Command, log: &dyn Log) -> Result<RunStatus> {
    let ws = Workspace::open(global, log)?;
    let git = GitCli::new();
    if !git.is_available() {
        bail!("git is not installed or not on PATH");
    }
    dispatch(&ws, &git, command, global.dry_run, log)
}

fn require_clone(ws: &Workspace) -> Result<PathBuf> {
    let clone = clone_dir(&ws.root);
    if !clone.is_dir() {
        return Err(OverlayError::NotCloned.into());
    }
    if !source::clone_is_git(&ws.root) {
        bail!("{CLONE_DIR} is a plain copy of a directory, not a git repository");
    }
    Ok(clone)
}

const fn exit_status(code: i32) -> RunStatus {
    if code == 0 {
        RunStatus::Success
    } else {
        RunStatus::Failed
    }
}

fn record(log: &dyn Log, name: &str, status: RunStatus) {
    let step = match status {
        RunStatus::Success => StepStatus::Ok,
        RunStatus::Partial => StepStatus::Warning,
        RunStatus::Failed => StepStatus::Failed,
    };
    log.record_step(name, step, None);
}

/// Run `command` against the clone of `ws`.
///
/// # Errors
///
/// Returns an error if the overlay is not cloned, the clone is not a git
/// repository, or git fails. Non-passthrough commands are rejected.
pub fn dispatch(
    ws: &Workspace,
    vcs: &dyn VersionControl,
    command: &Command,
    dry_run: bool,
    log: &dyn Log,
) -> Result<RunStatus> {
    let clone = require_clone(ws)?;
    let name = command.name();

    match command {
        Command::Status => return Ok(exit_status(vcs.status(&clone)?)),
        Command::Diff(opts) => return Ok(exit_status(vcs.diff(&clone, &opts.args)?)),
        _ => {}
    }

    if dry_run {
        log.dry_run(&format!("would run git {name} in {CLONE_DIR}"));
        log.record_step(name, StepStatus::DryRun, None);
        return Ok(RunStatus::Success);
    }

    log.stage(&format!("git {name}"));
    let status = match command {
        Command::Fetch => {
            vcs.fetch(&clone)?;
            RunStatus::Success
        }
        Command::Add(opts) => {
            vcs.add(&clone, &opts.files)?;
            RunStatus::Success
        }
        Command::Commit(opts) => exit_status(vcs.commit(&clone, &opts.args)?),
        Command::Pull => {
            vcs.pull(&clone)?;
            RunStatus::Success
        }
        Command::Checkout(opts) => {
            vcs.checkout(&clone, &opts.reference)?;
            RunStatus::Success
        }
        Command::Merge(opts) => exit_status(vcs.merge(&clone, &opts.args)?),
        Command::Push => {
            match source::push(&ws.root, &ws.config.source, vcs, log)? {
                PushRoute::PlainPush => log.info("pushed"),
                PushRoute::PullIntoRemote { remote_dir, branch } => log.info(&format!(
                    "updated {branch} in {}",
                    remote_dir.display()
                )),
            }
            RunStatus::Success
        }
        other => bail!("{} is not a git passthrough command", other.name()),
    };
    record(log, name, status);

    let changes_tree = matches!(
        command,
        Command::Pull | Command::Checkout(_) | Command::Merge(_)
    );
    if changes_tree && status == RunStatus::Success {
        return sync_workspace(ws, vcs, false, false, log);
    }
    Ok(status)
}
