//! Apply plan actions to disk, one destination at a time.
//!
//! A failure on one destination is recorded in its [`ActionOutcome`] and the
//! batch carries on.
use std::fmt;
use std::path::Path;

use super::plan::{PlanAction, PlanSummary, SkipReason};
use super::state::OverlayState;
use crate::error::ExecutionError;
use crate::logging::Log;
use crate::resources::{fs, symlink};

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The filesystem was changed.
    Applied,
    /// Dry-run: the change was reported but not made.
    SkippedDryRun,
    /// The action was a skip; nothing to do.
    Unchanged,
    /// The change was attempted and failed.
    Failed(ExecutionError),
}

/// An action paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The planned action.
    pub action: PlanAction,
    /// How it went.
    pub outcome: Outcome,
}

/// Overall result of a run, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStatus {
    /// Everything converged (exit 0).
    Success,
    /// Conflicts or warnings were left behind (exit 2).
    Partial,
    /// At least one action or step failed (exit 1).
    Failed,
}

impl RunStatus {
    /// Classify a batch: any failure wins, then any conflict skip.
    #[must_use]
    pub fn classify(outcomes: &[ActionOutcome]) -> Self {
        if outcomes
            .iter()
            .any(|o| matches!(o.outcome, Outcome::Failed(_)))
        {
            Self::Failed
        } else if outcomes.iter().any(|o| o.action.is_conflict()) {
            Self::Partial
        } else {
            Self::Success
        }
    }

    /// The worse of two statuses.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }

    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Partial => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Tally of applied outcomes, adapted for the end-of-run summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    /// Actions that changed the filesystem (or would have, in dry-run).
    pub changed: u32,
    /// Actions that were already correct.
    pub already_ok: u32,
    /// Conflict skips.
    pub conflicts: u32,
    /// Actions that failed.
    pub failed: u32,
}

impl ApplyStats {
    /// Count `outcomes`.
    #[must_use]
    pub fn of(outcomes: &[ActionOutcome]) -> Self {
        let mut stats = Self::default();
        for o in outcomes {
            match &o.outcome {
                Outcome::Applied | Outcome::SkippedDryRun => stats.changed += 1,
                Outcome::Failed(_) => stats.failed += 1,
                Outcome::Unchanged if o.action.is_conflict() => stats.conflicts += 1,
                Outcome::Unchanged => {
                    if matches!(
                        &o.action,
                        PlanAction::Skip {
                            reason: SkipReason::AlreadyCorrect,
                            ..
                        }
                    ) {
                        stats.already_ok += 1;
                    }
                }
            }
        }
        stats
    }

    /// Format as `"3 changed, 10 already ok"` (`"would change"` in dry-run).
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut parts = vec![format!("{} {verb}", self.changed)];
        if self.already_ok > 0 {
            parts.push(format!("{} already ok", self.already_ok));
        }
        if self.conflicts > 0 {
            parts.push(format!("{} conflict(s)", self.conflicts));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        parts.join(", ")
    }
}

/// Apply `actions` under `root`, logging each one.
///
/// Directories created for new links are added to `state`; only those are
/// pruned when a removal leaves them empty.
pub fn execute(
    root: &Path,
    actions: Vec<PlanAction>,
    dry_run: bool,
    state: &mut OverlayState,
    log: &dyn Log,
) -> Vec<ActionOutcome> {
    log.debug(&format!("plan: {}", PlanSummary::of(&actions)));
    actions
        .into_iter()
        .map(|action| {
            let outcome = apply_one(root, &action, dry_run, state, log);
            ActionOutcome { action, outcome }
        })
        .collect()
}

fn apply_one(
    root: &Path,
    action: &PlanAction,
    dry_run: bool,
    state: &mut OverlayState,
    log: &dyn Log,
) -> Outcome {
    if let PlanAction::Skip { .. } = action {
        if action.is_conflict() {
            log.warn(&action.rationale());
        } else {
            log.debug(&action.rationale());
        }
        return Outcome::Unchanged;
    }

    if dry_run {
        log.dry_run(&format!("would {}", action.rationale()));
        return Outcome::SkippedDryRun;
    }

    let link = action.link();
    let path = root.join(&link.dst);
    let target = Path::new(&link.target);
    let result = match action {
        PlanAction::Create { .. } => symlink::create_link(&path, target),
        PlanAction::Replace { .. } => symlink::replace_link(&path, target),
        PlanAction::Remove { .. } => symlink::remove_link(&path).map(|()| {
            let pruned = fs::prune_empty_parents(root, &path, |dir| state.is_created(root, dir));
            for dir in &pruned {
                log.debug(&format!("removed empty directory {}", dir.display()));
                state.forget(root, dir);
            }
            Vec::new()
        }),
        PlanAction::Skip { .. } => Ok(Vec::new()),
    };

    match result {
        Ok(made) => {
            state.record_created(root, &made);
            log.debug(&action.rationale());
            Outcome::Applied
        }
        Err(e) => {
            let error = ExecutionError {
                dst: link.dst.clone(),
                message: format!("{e:#}"),
            };
            log.error(&error.to_string());
            Outcome::Failed(error)
        }
    }
}
