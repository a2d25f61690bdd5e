//! Turn mapping config plus an overlay listing into file-level links.
use super::snapshot::OverlayTree;
use super::{ResolvedLink, paths, validate};
use crate::config::{IgnoreRules, MappingMode, MappingSpec};
use crate::error::Violation;

/// An overlay file left out because an ignore rule matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredEntry {
    /// Overlay-relative path.
    pub src: String,
    /// The rule that matched.
    pub rule: String,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Links to reconcile, in overlay order.
    pub links: Vec<ResolvedLink>,
    /// Files skipped by `.repoverlayignore`.
    pub ignored: Vec<IgnoredEntry>,
    /// Missing or out-of-overlay sources.
    pub violations: Vec<Violation>,
}

/// Resolve `mode` against `tree`.
///
/// Without a listing (a dry-run clone of a remote, or unlink after the clone
/// is gone) each explicit mapping becomes a single unverified link and
/// mirror-all resolves to nothing.
#[must_use]
pub fn resolve(mode: &MappingMode, tree: Option<&OverlayTree>, ignore: &IgnoreRules) -> Resolution {
    let mut resolution = Resolution::default();
    match mode {
        MappingMode::Explicit(specs) => {
            for spec in specs {
                resolve_spec(spec, tree, ignore, &mut resolution);
            }
        }
        MappingMode::MirrorAll => {
            let Some(tree) = tree else {
                return resolution;
            };
            for file in tree.files() {
                if file == ".git" || file.starts_with(".git/") {
                    continue;
                }
                if let Some(rule) = ignore.matching_rule(file) {
                    resolution.ignored.push(IgnoredEntry {
                        src: file.to_string(),
                        rule: rule.to_string(),
                    });
                    continue;
                }
                resolution
                    .links
                    .push(ResolvedLink::new(file, file, true));
            }
        }
    }
    resolution
}

fn resolve_spec(
    spec: &MappingSpec,
    tree: Option<&OverlayTree>,
    ignore: &IgnoreRules,
    out: &mut Resolution,
) {
    let source_problems = validate::validate_source(&spec.src);
    if !source_problems.is_empty() {
        out.violations.extend(source_problems);
        return;
    }

    let src = paths::normalize(&spec.src);
    let dst = paths::normalize(&spec.dst);

    let Some(tree) = tree else {
        if !is_ignored(&src, ignore, out) {
            out.links.push(ResolvedLink::new(src, dst, false));
        }
        return;
    };

    if tree.is_file(&src) {
        if !is_ignored(&src, ignore, out) {
            out.links.push(ResolvedLink::new(src, dst, true));
        }
    } else if tree.is_dir(&src) {
        for (file, relative) in tree.files_under(&src) {
            if !is_ignored(file, ignore, out) {
                out.links
                    .push(ResolvedLink::new(file, paths::join(&dst, relative), true));
            }
        }
    } else {
        out.violations.push(Violation::SourceMissing {
            src: spec.src.clone(),
        });
    }
}

fn is_ignored(src: &str, ignore: &IgnoreRules, out: &mut Resolution) -> bool {
    ignore.matching_rule(src).is_some_and(|rule| {
        out.ignored.push(IgnoredEntry {
            src: src.to_string(),
            rule: rule.to_string(),
        });
        true
    })
}
