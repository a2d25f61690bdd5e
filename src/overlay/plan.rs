//! Decide, per destination, what the executor should do.
//!
//! The planner is pure: it reads an [`FsSnapshot`] and returns a list of
//! [`PlanAction`]s. Removals of links left over from the previous run come
//! first, then one action per destination in input order.
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::snapshot::{EntryState, FsSnapshot};
use super::{ResolvedLink, is_inside_clone, paths};

/// What the caller is reconciling towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First-time linking after a clone.
    Create,
    /// Bring links in line with the current config.
    Sync,
    /// Tear down every overlay-managed link.
    Remove,
}

/// Why an action leaves a destination alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The link already points at the right place.
    AlreadyCorrect,
    /// Something else occupies the destination and `--force` was not given.
    Exists {
        /// Description of what is there.
        existing: String,
    },
    /// An ancestor of the destination is a file or symlink.
    BlockedByParent {
        /// The blocking ancestor.
        parent: String,
    },
    /// The entry is not a link into the clone, so removal leaves it.
    NotOverlayManaged,
    /// Nothing to remove.
    NotPresent,
}

impl SkipReason {
    /// Conflicts make the run partial (exit code 2).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Exists { .. } | Self::BlockedByParent { .. })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCorrect => write!(f, "already correct"),
            Self::Exists { existing } => write!(f, "exists ({existing}), use --force"),
            Self::BlockedByParent { parent } => {
                write!(f, "parent {parent} is not a directory")
            }
            Self::NotOverlayManaged => write!(f, "not overlay-managed"),
            Self::NotPresent => write!(f, "not present"),
        }
    }
}

/// One decision for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// Nothing at the destination; make the link.
    Create {
        /// Link to create.
        link: ResolvedLink,
    },
    /// Overwrite what is there (only with `--force`).
    Replace {
        /// Link to create.
        link: ResolvedLink,
        /// The entry being replaced.
        existing: EntryState,
    },
    /// Leave the destination as it is.
    Skip {
        /// Link the decision is about.
        link: ResolvedLink,
        /// Why.
        reason: SkipReason,
    },
    /// Delete an overlay-managed link.
    Remove {
        /// Link to delete.
        link: ResolvedLink,
        /// `true` when the link is left over from a previous config.
        stale: bool,
    },
}

impl PlanAction {
    /// The link this action concerns.
    #[must_use]
    pub const fn link(&self) -> &ResolvedLink {
        match self {
            Self::Create { link }
            | Self::Replace { link, .. }
            | Self::Skip { link, .. }
            | Self::Remove { link, .. } => link,
        }
    }

    /// `true` for skips that should make the run partial.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Skip { reason, .. } if reason.is_conflict())
    }

    /// One-line human description.
    #[must_use]
    pub fn rationale(&self) -> String {
        match self {
            Self::Create { link } => format!("link {} -> {}", link.dst, link.target),
            Self::Replace { link, existing } => format!(
                "replace {} ({}) -> {}",
                link.dst,
                existing.describe(),
                link.target
            ),
            Self::Skip { link, reason } => format!("skip {}: {reason}", link.dst),
            Self::Remove { link, stale: true } => format!("remove stale link {}", link.dst),
            Self::Remove { link, stale: false } => format!("remove link {}", link.dst),
        }
    }
}

/// Inputs that are the same for every destination in one run.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions<'a> {
    /// Target root, used to interpret absolute symlink targets.
    pub root: &'a Path,
    /// What to reconcile towards.
    pub mode: Mode,
    /// Replace conflicting entries instead of skipping them.
    pub force: bool,
    /// Destinations recorded by the previous run.
    pub previous: &'a [String],
}

/// Build the plan for `links` against `snapshot`.
#[must_use]
pub fn plan(links: &[ResolvedLink], snapshot: &FsSnapshot, opts: &PlanOptions<'_>) -> Vec<PlanAction> {
    let mut actions = leftover_removals(links, snapshot, opts);
    let removing: HashSet<String> = actions.iter().map(|a| a.link().dst.clone()).collect();
    actions.extend(links.iter().map(|link| match opts.mode {
        Mode::Create | Mode::Sync => plan_link(link, snapshot, opts, &removing),
        Mode::Remove => plan_removal(link.clone(), snapshot, opts.root, false),
    }));
    actions
}

/// `Remove` actions for destinations the previous run linked that the
/// current links no longer cover.
fn leftover_removals(
    links: &[ResolvedLink],
    snapshot: &FsSnapshot,
    opts: &PlanOptions<'_>,
) -> Vec<PlanAction> {
    let current: HashSet<&str> = links.iter().map(|l| l.dst.as_str()).collect();
    let stale = opts.mode != Mode::Remove;
    let mut seen = HashSet::new();
    let mut removals = Vec::new();
    for dst in opts.previous {
        let dst = paths::normalize(dst);
        if current.contains(dst.as_str()) || !seen.insert(dst.clone()) {
            continue;
        }
        let EntryState::Symlink { target } = snapshot.state(&dst) else {
            continue;
        };
        let link = ResolvedLink::from_existing(dst.clone(), target.clone());
        if let action @ PlanAction::Remove { .. } = plan_removal(link, snapshot, opts.root, stale) {
            removals.push(action);
        }
    }
    removals
}

fn plan_link(
    link: &ResolvedLink,
    snapshot: &FsSnapshot,
    opts: &PlanOptions<'_>,
    removing: &HashSet<String>,
) -> PlanAction {
    if let Some(parent) = blocking_parent(&link.dst, snapshot, removing) {
        return PlanAction::Skip {
            link: link.clone(),
            reason: SkipReason::BlockedByParent { parent },
        };
    }

    let existing = snapshot.state(&link.dst);
    match existing {
        EntryState::Absent => PlanAction::Create { link: link.clone() },
        EntryState::Symlink { target } if same_target(opts.root, &link.dst, target, &link.target) => {
            PlanAction::Skip {
                link: link.clone(),
                reason: SkipReason::AlreadyCorrect,
            }
        }
        other if opts.force => PlanAction::Replace {
            link: link.clone(),
            existing: other.clone(),
        },
        other => PlanAction::Skip {
            link: link.clone(),
            reason: SkipReason::Exists {
                existing: other.describe(),
            },
        },
    }
}

fn plan_removal(link: ResolvedLink, snapshot: &FsSnapshot, root: &Path, stale: bool) -> PlanAction {
    if blocking_parent(&link.dst, snapshot, &HashSet::new()).is_some() {
        return PlanAction::Skip {
            link,
            reason: SkipReason::NotOverlayManaged,
        };
    }
    match snapshot.state(&link.dst) {
        EntryState::Absent => PlanAction::Skip {
            link,
            reason: SkipReason::NotPresent,
        },
        EntryState::Symlink { target } if points_into_clone(root, &link.dst, target) => {
            PlanAction::Remove { link, stale }
        }
        _ => PlanAction::Skip {
            link,
            reason: SkipReason::NotOverlayManaged,
        },
    }
}

/// The first ancestor of `dst` that is a file or a symlink, ignoring
/// overlay links in `removing` that the plan deletes first.
fn blocking_parent(dst: &str, snapshot: &FsSnapshot, removing: &HashSet<String>) -> Option<String> {
    paths::ancestors(dst).into_iter().find(|ancestor| {
        match snapshot.state(ancestor) {
            EntryState::File => true,
            EntryState::Symlink { .. } => !removing.contains(ancestor),
            EntryState::Absent | EntryState::Directory => false,
        }
    })
}

fn same_target(root: &Path, dst: &str, actual: &str, expected: &str) -> bool {
    match (
        paths::resolve_target(root, dst, actual),
        paths::resolve_target(root, dst, expected),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn points_into_clone(root: &Path, dst: &str, target: &str) -> bool {
    paths::resolve_target(root, dst, target).is_some_and(|segments| is_inside_clone(&segments))
}

/// Count actions by kind for a one-line summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// New links.
    pub create: usize,
    /// Forced replacements.
    pub replace: usize,
    /// Links to delete.
    pub remove: usize,
    /// Already correct.
    pub unchanged: usize,
    /// Skipped because of a conflict.
    pub conflicts: usize,
    /// Skipped for any other reason.
    pub skipped: usize,
}

impl PlanSummary {
    /// Tally `actions`.
    #[must_use]
    pub fn of(actions: &[PlanAction]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action {
                PlanAction::Create { .. } => summary.create += 1,
                PlanAction::Replace { .. } => summary.replace += 1,
                PlanAction::Remove { .. } => summary.remove += 1,
                PlanAction::Skip {
                    reason: SkipReason::AlreadyCorrect,
                    ..
                } => summary.unchanged += 1,
                PlanAction::Skip { reason, .. } if reason.is_conflict() => summary.conflicts += 1,
                PlanAction::Skip { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} create, {} replace, {} remove, {} unchanged, {} conflict(s), {} skipped",
            self.create, self.replace, self.remove, self.unchanged, self.conflicts, self.skipped
        )
    }
}
