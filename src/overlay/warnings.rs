//! Advisory checks that never block a run but downgrade it to partial success.
use std::path::Path;

use super::paths;
use super::source::{SourceLocation, urls_match};
use crate::config::{IgnoreRules, OverlaySource};

/// A destination that the target repository's `.gitignore` also matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitignoreConflict {
    /// Root-relative destination.
    pub dst: String,
    /// The `.gitignore` pattern that matched.
    pub rule: String,
}

impl std::fmt::Display for GitignoreConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is matched by .gitignore pattern '{}'; git will not see changes to it",
            self.dst, self.rule
        )
    }
}

/// Parse `.gitignore` content, dropping `!` re-include lines.
#[must_use]
pub fn parse_gitignore(content: &str) -> IgnoreRules {
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('!'))
        .collect();
    IgnoreRules::parse(&kept.join("\n"))
}

/// Rules from `root/.gitignore`; empty when missing or unreadable.
#[must_use]
pub fn load_gitignore(root: &Path) -> IgnoreRules {
    std::fs::read_to_string(root.join(".gitignore"))
        .map(|content| parse_gitignore(&content))
        .unwrap_or_default()
}

/// Destinations matched by `rules`, directly or through an ancestor directory.
#[must_use]
pub fn gitignore_conflicts<'a>(
    rules: &IgnoreRules,
    dsts: impl IntoIterator<Item = &'a str>,
) -> Vec<GitignoreConflict> {
    if rules.is_empty() {
        return Vec::new();
    }
    dsts.into_iter()
        .filter_map(|dst| {
            let mut candidates = paths::ancestors(dst);
            candidates.push(paths::normalize(dst));
            candidates.iter().find_map(|path| {
                rules.matching_rule(path).map(|rule| GitignoreConflict {
                    dst: dst.to_string(),
                    rule: rule.to_string(),
                })
            })
        })
        .collect()
}

/// Warning text when the clone's `origin` is not the configured remote.
///
/// Local sources and clones without an `origin` are never reported.
#[must_use]
pub fn url_mismatch(
    root: &Path,
    source: &OverlaySource,
    origin: Option<&str>,
) -> Option<String> {
    let SourceLocation::Remote(configured) = SourceLocation::of(root, source) else {
        return None;
    };
    let origin = origin?;
    (!urls_match(&configured, origin)).then(|| {
        format!(
            "overlay clone points at {origin} but .repoverlay.yaml says {configured}; \
             run 'repoverlay clone --force' to re-clone"
        )
    })
}
