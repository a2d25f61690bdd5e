pub mod clone;
pub mod sync;
pub mod unlink;
pub mod vcs;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Config, MappingMode};
use crate::error::{ValidationReport, Violation};
use crate::logging::{Log, StepStatus};
use crate::overlay::execute::{self, ActionOutcome, ApplyStats, Outcome, RunStatus};
use crate::overlay::plan::{self, Mode, PlanAction, PlanOptions, SkipReason};
use crate::overlay::snapshot::{FsSnapshot, OverlayTree};
use crate::overlay::state::OverlayState;
use crate::overlay::{ResolvedLink, conflicts, exclude, resolve, validate, warnings};

/// A target root with its loaded configuration.
///
/// Every command starts here: find `.repoverlay.yaml` from `--root` (or the
/// current directory) upward, then parse it and `.repoverlayignore`.
#[derive(Debug)]
pub struct Workspace {
    /// Directory holding `.repoverlay.yaml`.
    pub root: PathBuf,
    /// Parsed configuration.
    pub config: Config,
}

impl Workspace {
    /// Discover and load the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if no `.repoverlay.yaml` is found above the start
    /// directory or the configuration fails to parse.
    pub fn open(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let start = match &global.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("reading current directory")?,
        };
        let start = dunce::canonicalize(&start)
            .with_context(|| format!("resolving {}", start.display()))?;
        let root = Config::discover(&start)?;
        log.debug(&format!("target root: {}", root.display()));

        let config = Config::load(&root)?;
        match &config.mappings {
            MappingMode::Explicit(specs) => {
                log.debug(&format!("{} explicit mapping(s)", specs.len()));
            }
            MappingMode::MirrorAll => log.debug("no mappings: mirroring the whole overlay"),
        }
        log.debug(&format!("{} ignore rule(s)", config.ignore.len()));
        for rule in config.ignore.negations() {
            log.debug(&format!(
                "ignore rule '{rule}' is matched literally; negation is not supported"
            ));
        }
        Ok(Self { root, config })
    }
}

/// How one reconcile pass should behave.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Create, sync, or remove links.
    pub mode: Mode,
    /// Allow `Replace` of conflicting entries.
    pub force: bool,
    /// Report actions without touching the filesystem.
    pub dry_run: bool,
}

/// What a reconcile pass did.
#[derive(Debug)]
pub struct Reconciliation {
    /// Exit classification of the pass.
    pub status: RunStatus,
    /// Links the pass resolved.
    pub links: Vec<ResolvedLink>,
    /// Per-kind tallies.
    pub stats: ApplyStats,
}

/// Resolve, validate, plan, and apply links for `ws`, then rewrite the
/// managed exclude block.
///
/// # Errors
///
/// Returns the [`ValidationReport`] when any mapping is unsafe, duplicated,
/// overlapping, or missing from the overlay. Nothing is touched in that case.
pub fn reconcile(
    ws: &Workspace,
    tree: Option<&OverlayTree>,
    opts: ReconcileOptions,
    log: &dyn Log,
) -> Result<Reconciliation> {
    log.stage("Resolving mappings");
    let resolution = resolve::resolve(&ws.config.mappings, tree, &ws.config.ignore);
    for ignored in &resolution.ignored {
        log.debug(&format!("ignored {} (rule '{}')", ignored.src, ignored.rule));
    }
    if tree.is_none()
        && opts.mode != Mode::Remove
        && matches!(ws.config.mappings, MappingMode::MirrorAll)
    {
        log.warn("overlay contents unknown; mirror-all mappings resolve to nothing");
    }
    let resolved = format!("{} link(s) resolved", resolution.links.len());
    log.info(&resolved);
    log.record_step("resolve", StepStatus::Ok, Some(&resolved));

    let mut violations = resolution.violations;
    if opts.mode == Mode::Remove {
        violations.retain(|v| !matches!(v, Violation::SourceMissing { .. }));
    }
    violations.extend(validate::validate_links(&resolution.links));
    violations.extend(conflicts::analyze(&resolution.links));
    let report = ValidationReport::new(violations);
    if !report.is_empty() {
        for violation in report.violations() {
            log.error(&violation.to_string());
        }
        log.record_step(
            "validate",
            StepStatus::Failed,
            Some(&format!("{} problem(s)", report.len())),
        );
        return Err(report.into());
    }
    log.record_step("validate", StepStatus::Ok, None);

    let links = resolution.links;
    let previous = exclude::read_managed_entries(&ws.root);
    let snapshot = FsSnapshot::capture(
        &ws.root,
        links
            .iter()
            .map(|l| l.dst.as_str())
            .chain(previous.iter().map(String::as_str)),
    );
    let actions = plan::plan(
        &links,
        &snapshot,
        &PlanOptions {
            root: &ws.root,
            mode: opts.mode,
            force: opts.force,
            previous: &previous,
        },
    );

    log.stage(match opts.mode {
        Mode::Remove => "Removing links",
        Mode::Create | Mode::Sync => "Applying links",
    });
    let mut state = OverlayState::load(&ws.root).unwrap_or_else(|e| {
        log.warn(&format!("{e:#}; directories created for links will be kept"));
        OverlayState::default()
    });
    let outcomes = execute::execute(&ws.root, actions, opts.dry_run, &mut state, log);
    let stats = ApplyStats::of(&outcomes);
    let mut status = RunStatus::classify(&outcomes);
    log.record_step(
        "apply",
        step_status(status, opts.dry_run),
        Some(&stats.summary(opts.dry_run)),
    );

    status = status.combine(write_exclude(ws, opts, &outcomes, log));
    if !opts.dry_run
        && let Err(e) = state.save(&ws.root)
    {
        log.warn(&format!("saving overlay state: {e:#}"));
        status = status.combine(RunStatus::Partial);
    }
    Ok(Reconciliation {
        status,
        links,
        stats,
    })
}

/// Destinations that hold an overlay link once `outcomes` are applied.
fn linked_destinations(outcomes: &[ActionOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| match (&o.action, &o.outcome) {
            (PlanAction::Create { .. } | PlanAction::Replace { .. }, Outcome::Applied) => true,
            (
                PlanAction::Skip {
                    reason: SkipReason::AlreadyCorrect,
                    ..
                },
                _,
            )
            | (PlanAction::Remove { .. }, Outcome::Failed(_)) => true,
            _ => false,
        })
        .map(|o| o.action.link().dst.clone())
        .collect()
}

fn write_exclude(
    ws: &Workspace,
    opts: ReconcileOptions,
    outcomes: &[ActionOutcome],
    log: &dyn Log,
) -> RunStatus {
    if opts.dry_run {
        log.dry_run("would update .git/info/exclude");
        log.record_step("exclude", StepStatus::DryRun, None);
        return RunStatus::Success;
    }

    let linked = linked_destinations(outcomes);
    let result = if opts.mode == Mode::Remove && linked.is_empty() {
        exclude::remove(&ws.root)
    } else {
        exclude::update(&ws.root, &linked)
    };
    match result {
        Ok(true) => {
            log.record_step("exclude", StepStatus::Ok, None);
            RunStatus::Success
        }
        Ok(false) => {
            log.debug("no .git directory at target root; exclude block not written");
            log.record_step("exclude", StepStatus::Skipped, None);
            RunStatus::Success
        }
        Err(e) => {
            log.warn(&format!("updating .git/info/exclude: {e:#}"));
            log.record_step("exclude", StepStatus::Warning, None);
            RunStatus::Partial
        }
    }
}

/// Warn about destinations git would ignore anyway.
pub fn check_gitignore(ws: &Workspace, links: &[ResolvedLink], log: &dyn Log) -> RunStatus {
    let rules = warnings::load_gitignore(&ws.root);
    let found = warnings::gitignore_conflicts(&rules, links.iter().map(|l| l.dst.as_str()));
    if found.is_empty() {
        return RunStatus::Success;
    }
    for conflict in &found {
        log.warn(&conflict.to_string());
    }
    log.record_step(
        "gitignore",
        StepStatus::Warning,
        Some(&format!("{} destination(s) ignored by .gitignore", found.len())),
    );
    RunStatus::Partial
}

const fn step_status(status: RunStatus, dry_run: bool) -> StepStatus {
    match status {
        RunStatus::Failed => StepStatus::Failed,
        RunStatus::Partial => StepStatus::Warning,
        RunStatus::Success if dry_run => StepStatus::DryRun,
        RunStatus::Success => StepStatus::Ok,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{IgnoreRules, MappingSpec, OverlaySource};
    use crate::logging::isolated_logger;
    use crate::overlay::clone_dir;

    fn workspace(root: &std::path::Path, mappings: MappingMode) -> Workspace {
        Workspace {
            root: root.to_path_buf(),
            config: Config {
                source: OverlaySource {
                    repo: "../overlay".to_string(),
                    reference: None,
                },
                mappings,
                ignore: IgnoreRules::default(),
            },
        }
    }

    fn options(mode: Mode) -> ReconcileOptions {
        ReconcileOptions {
            mode,
            force: false,
            dry_run: false,
        }
    }

    fn write_clone(root: &std::path::Path, files: &[&str]) -> OverlayTree {
        for file in files {
            let path = clone_dir(root).join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, file).unwrap();
        }
        OverlayTree::capture(&clone_dir(root)).unwrap()
    }

    #[test]
    fn duplicate_destination_aborts_before_touching_disk() {
        let root = tempfile::tempdir().unwrap();
        let tree = write_clone(root.path(), &["a", "b"]);
        let ws = workspace(
            root.path(),
            MappingMode::Explicit(vec![
                MappingSpec {
                    src: "a".to_string(),
                    dst: "shared/file".to_string(),
                },
                MappingSpec {
                    src: "b".to_string(),
                    dst: "shared/file".to_string(),
                },
            ]),
        );
        let (log, _tmp, _guard) = isolated_logger();
        let err = reconcile(&ws, Some(&tree), options(Mode::Create), &log).unwrap_err();
        let report = err.downcast_ref::<ValidationReport>().unwrap();
        assert_eq!(report.len(), 1);
        assert!(!root.path().join("shared").exists());
        assert_eq!(log.failure_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn second_pass_is_all_already_correct() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join(".git")).unwrap();
        let tree = write_clone(root.path(), &["envrc", "claude/settings.json"]);
        let ws = workspace(root.path(), MappingMode::MirrorAll);
        let (log, _tmp, _guard) = isolated_logger();

        let first = reconcile(&ws, Some(&tree), options(Mode::Create), &log).unwrap();
        assert_eq!(first.status, RunStatus::Success);
        assert_eq!(first.stats.changed, 2);

        let second = reconcile(&ws, Some(&tree), options(Mode::Sync), &log).unwrap();
        assert_eq!(second.stats.changed, 0);
        assert_eq!(second.stats.already_ok, 2);
        assert_eq!(
            exclude::read_managed_entries(root.path()),
            vec!["claude/settings.json".to_string(), "envrc".to_string()]
        );
    }

    #[cfg(unix)]
    #[test]
    fn dropped_source_is_removed_on_next_sync() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join(".git")).unwrap();
        let tree = write_clone(root.path(), &["keep", "gone/file"]);
        let ws = workspace(root.path(), MappingMode::MirrorAll);
        let (log, _tmp, _guard) = isolated_logger();
        reconcile(&ws, Some(&tree), options(Mode::Create), &log).unwrap();

        std::fs::remove_dir_all(clone_dir(root.path()).join("gone")).unwrap();
        let tree = OverlayTree::capture(&clone_dir(root.path())).unwrap();
        let result = reconcile(&ws, Some(&tree), options(Mode::Sync), &log).unwrap();

        assert_eq!(result.status, RunStatus::Success);
        assert!(std::fs::symlink_metadata(root.path().join("gone/file")).is_err());
        assert!(!root.path().join("gone").exists());
        assert_eq!(
            exclude::read_managed_entries(root.path()),
            vec!["keep".to_string()]
        );
    }

    #[test]
    fn existing_file_makes_run_partial() {
        let root = tempfile::tempdir().unwrap();
        let tree = write_clone(root.path(), &["envrc"]);
        std::fs::write(root.path().join("envrc"), "mine").unwrap();
        let ws = workspace(root.path(), MappingMode::MirrorAll);
        let (log, _tmp, _guard) = isolated_logger();
        let result = reconcile(&ws, Some(&tree), options(Mode::Sync), &log).unwrap();
        assert_eq!(result.status, RunStatus::Partial);
        assert_eq!(result.stats.conflicts, 1);
        assert_eq!(std::fs::read_to_string(root.path().join("envrc")).unwrap(), "mine");
    }

    #[test]
    fn gitignored_destination_is_partial() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(".gitignore"), ".envrc\n").unwrap();
        let ws = workspace(root.path(), MappingMode::MirrorAll);
        let (log, _tmp, _guard) = isolated_logger();
        let links = vec![ResolvedLink::new("envrc", ".envrc", true)];
        assert_eq!(check_gitignore(&ws, &links, &log), RunStatus::Partial);
        assert_eq!(
            check_gitignore(&ws, &[ResolvedLink::new("a", "a", true)], &log),
            RunStatus::Success
        );
    }
}
