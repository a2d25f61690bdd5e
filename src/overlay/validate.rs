//! Lexical safety checks on mapping sources and resolved destinations.
use std::collections::HashSet;

use super::paths;
use super::{OVERLAY_DIR, ResolvedLink};
use crate::config::{CONFIG_FILE, IGNORE_FILE};
use crate::error::Violation;

/// Check one destination. Every rule is applied independently, so a single
/// path can yield several violations.
#[must_use]
pub fn validate_destination(dst: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let owned = || dst.to_string();
    let parts = paths::segments(dst);

    if paths::is_absolute(dst) {
        violations.push(Violation::AbsoluteDestination { dst: owned() });
    }
    if parts.contains(&"..") {
        violations.push(Violation::ParentTraversal { dst: owned() });
    }

    // Drive-letter prefixes are not part of the relative layout.
    let relative: Vec<&str> = parts
        .iter()
        .copied()
        .skip_while(|s| s.len() == 2 && s.ends_with(':'))
        .collect();

    if relative.first() == Some(&".git") {
        violations.push(Violation::InsideGitDir { dst: owned() });
    }
    let reserved = match relative.as_slice() {
        [only] => [CONFIG_FILE, IGNORE_FILE, OVERLAY_DIR].contains(only),
        [first, ..] => *first == OVERLAY_DIR,
        [] => false,
    };
    if reserved {
        violations.push(Violation::ReservedPath { dst: owned() });
    }
    violations
}

/// Check an explicit mapping source stays within the overlay.
#[must_use]
pub fn validate_source(src: &str) -> Vec<Violation> {
    if paths::is_absolute(src) || paths::segments(src).contains(&"..") {
        vec![Violation::SourceOutsideOverlay {
            src: src.to_string(),
        }]
    } else {
        Vec::new()
    }
}

/// Check every resolved link's destination, reporting each path once.
#[must_use]
pub fn validate_links(links: &[ResolvedLink]) -> Vec<Violation> {
    let mut seen = HashSet::new();
    let mut violations = Vec::new();
    for link in links {
        if !seen.insert(link.dst.as_str()) {
            continue;
        }
        if paths::segments(&link.dst).is_empty() && !paths::is_absolute(&link.dst) {
            violations.push(Violation::EmptyDestination {
                src: link.src.clone(),
            });
            continue;
        }
        violations.extend(validate_destination(&link.dst));
    }
    violations
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn plain_relative_destination_is_clean() {
        assert!(validate_destination(".claude/settings.json").is_empty());
        assert!(validate_destination("docs/.gitkeep").is_empty());
        assert!(validate_destination(".github/workflows/ci.yml").is_empty());
    }

    #[test]
    fn absolute_destinations_are_rejected() {
        assert_eq!(
            validate_destination("/etc/passwd"),
            vec![Violation::AbsoluteDestination {
                dst: "/etc/passwd".to_string()
            }]
        );
        assert!(matches!(
            validate_destination("C:/Windows/x").as_slice(),
            [Violation::AbsoluteDestination { .. }]
        ));
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(
            validate_destination("a/../../x"),
            vec![Violation::ParentTraversal {
                dst: "a/../../x".to_string()
            }]
        );
    }

    #[test]
    fn git_dir_is_rejected() {
        assert!(matches!(
            validate_destination(".git").as_slice(),
            [Violation::InsideGitDir { .. }]
        ));
        assert!(matches!(
            validate_destination(".git/hooks/pre-commit").as_slice(),
            [Violation::InsideGitDir { .. }]
        ));
        assert!(validate_destination(".gitignore").is_empty());
    }

    #[test]
    fn reserved_paths_are_rejected() {
        for dst in [
            ".repoverlay.yaml",
            ".repoverlayignore",
            ".repoverlay",
            ".repoverlay/repo/x",
        ] {
            assert!(
                matches!(
                    validate_destination(dst).as_slice(),
                    [Violation::ReservedPath { .. }]
                ),
                "{dst}"
            );
        }
        assert!(validate_destination("sub/.repoverlay.yaml").is_empty());
    }

    #[test]
    fn rules_apply_independently() {
        let violations = validate_destination("/.git/../x");
        assert_eq!(violations.len(), 3, "{violations:?}");
    }

    #[test]
    fn source_must_stay_inside_overlay() {
        assert!(validate_source("docs/a.md").is_empty());
        assert_eq!(validate_source("../secret").len(), 1);
        assert_eq!(validate_source("/abs").len(), 1);
    }

    #[test]
    fn links_are_checked_once_per_destination() {
        let links = vec![
            ResolvedLink::new("a", ".git/x", true),
            ResolvedLink::new("b", ".git/x", true),
            ResolvedLink::new("c", "ok", true),
        ];
        assert_eq!(validate_links(&links).len(), 1);
    }

    #[test]
    fn empty_destination_is_rejected() {
        let links = vec![ResolvedLink::new("file", "", true)];
        assert_eq!(
            validate_links(&links),
            vec![Violation::EmptyDestination {
                src: "file".to_string()
            }]
        );
    }
}
