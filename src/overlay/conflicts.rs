//! Detect destinations that collide or nest inside each other.
use std::collections::BTreeMap;

use super::{ResolvedLink, paths};
use crate::error::Violation;

/// Report every duplicate and every overlapping destination pair.
#[must_use]
pub fn analyze(links: &[ResolvedLink]) -> Vec<Violation> {
    let mut violations = duplicates(links);
    violations.extend(overlaps(links));
    violations
}

fn duplicates(links: &[ResolvedLink]) -> Vec<Violation> {
    let mut by_dst: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for link in links {
        by_dst.entry(&link.dst).or_default().push(&link.src);
    }
    by_dst
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(dst, sources)| Violation::DuplicateDestination {
            dst: dst.to_string(),
            sources: sources.into_iter().map(String::from).collect(),
        })
        .collect()
}

/// Sorting by segments puts every ancestor before its descendants, so a
/// stack of the current ancestor chain finds all pairs in one pass.
fn overlaps(links: &[ResolvedLink]) -> Vec<Violation> {
    let mut unique: Vec<Vec<&str>> = links.iter().map(|l| paths::segments(&l.dst)).collect();
    unique.sort();
    unique.dedup();

    let mut violations = Vec::new();
    let mut chain: Vec<&Vec<&str>> = Vec::new();
    for path in &unique {
        while chain.last().is_some_and(|top| !path.starts_with(top)) {
            chain.pop();
        }
        for ancestor in &chain {
            violations.push(Violation::OverlappingDestinations {
                parent: ancestor.join("/"),
                child: path.join("/"),
            });
        }
        chain.push(path);
    }
    violations
}
