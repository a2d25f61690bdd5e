//! The managed block in `.git/info/exclude`.
//!
//! The block keeps repoverlay's own files and every created link out of the
//! target repository's `git status`. It also records which destinations the
//! last run linked, which is how stale links are found on the next sync.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

/// First line of the managed block.
pub const BEGIN_MARKER: &str = "# BEGIN repoverlay managed - do not edit";

/// Last line of the managed block.
pub const END_MARKER: &str = "# END repoverlay managed";

/// Entries written at the top of every block.
pub const FIXED_ENTRIES: [&str; 3] = [".repoverlay.yaml", ".repoverlayignore", ".repoverlay/"];

/// `.git/info/exclude` under `root`, or `None` when `root/.git` is not a
/// directory (e.g. a worktree or a non-git target).
#[must_use]
pub fn exclude_path(root: &Path) -> Option<PathBuf> {
    let git_dir = root.join(".git");
    git_dir
        .is_dir()
        .then(|| git_dir.join("info").join("exclude"))
}

/// Render the block for `links` (sorted, deduplicated), without a trailing newline.
#[must_use]
pub fn render_block(links: &[String]) -> String {
    let mut sorted: Vec<&str> = links.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut lines: Vec<String> = vec![BEGIN_MARKER.to_string()];
    lines.extend(FIXED_ENTRIES.map(String::from));
    lines.extend(sorted.into_iter().map(escape_entry));
    lines.push(END_MARKER.to_string());
    lines.join("\n")
}

/// A leading `#` or `!` would read as a comment or a negation in
/// gitignore syntax; both are backslash-escaped.
fn escape_entry(dst: &str) -> String {
    if dst.starts_with(['#', '!']) {
        format!("\\{dst}")
    } else {
        dst.to_string()
    }
}

fn unescape_entry(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if rest.starts_with(['#', '!']) => rest,
        _ => line,
    }
}

/// Locate the block as `(begin, end)` line indices, inclusive. A begin
/// marker without an end extends to the last line.
fn block_span(lines: &[&str]) -> Option<(usize, usize)> {
    let begin = lines.iter().position(|l| l.trim() == BEGIN_MARKER)?;
    let end = lines
        .iter()
        .skip(begin + 1)
        .position(|l| l.trim() == END_MARKER)
        .map_or(lines.len().saturating_sub(1), |offset| begin + 1 + offset);
    Some((begin, end))
}

/// Replace the block in `content`, or append it. Lines outside the block are
/// kept verbatim. Applying twice gives the same text as applying once.
#[must_use]
pub fn apply_block(content: &str, links: &[String]) -> String {
    let block = render_block(links);
    let lines: Vec<&str> = content.lines().collect();

    if let Some((begin, end)) = block_span(&lines) {
        let before = lines.get(..begin).unwrap_or_default();
        let after = lines.get(end + 1..).unwrap_or_default();
        let mut out: Vec<&str> = before.to_vec();
        out.push(&block);
        out.extend_from_slice(after);
        return format!("{}\n", out.join("\n"));
    }

    let existing = content.trim_end();
    if existing.is_empty() {
        format!("{block}\n")
    } else {
        format!("{existing}\n\n{block}\n")
    }
}

/// Remove the block from `content`, keeping everything else.
#[must_use]
pub fn strip_block(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let Some((begin, end)) = block_span(&lines) else {
        return content.to_string();
    };
    let mut out: Vec<&str> = lines.get(..begin).unwrap_or_default().to_vec();
    out.extend_from_slice(lines.get(end + 1..).unwrap_or_default());
    let text = out.join("\n");
    let text = text.trim_end();
    if text.is_empty() {
        String::new()
    } else {
        format!("{text}\n")
    }
}

/// Link destinations recorded in the block, excluding the fixed entries.
#[must_use]
pub fn managed_entries(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let Some((begin, end)) = block_span(&lines) else {
        return Vec::new();
    };
    lines
        .get(begin + 1..=end)
        .unwrap_or_default()
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && *l != END_MARKER && !l.starts_with('#'))
        .filter(|l| !FIXED_ENTRIES.contains(l))
        .map(|l| unescape_entry(l).to_string())
        .collect()
}

/// Destinations recorded by the previous run; empty when unreadable.
#[must_use]
pub fn read_managed_entries(root: &Path) -> Vec<String> {
    exclude_path(root)
        .and_then(|path| std::fs::read_to_string(path).ok())
        .map(|content| managed_entries(&content))
        .unwrap_or_default()
}

/// Write the block for `links`. Returns `false` when there is no `.git` directory.
///
/// # Errors
///
/// Returns an error if the exclude file cannot be read or written.
pub fn update(root: &Path, links: &[String]) -> Result<bool> {
    let Some(path) = exclude_path(root) else {
        return Ok(false);
    };
    let existing = read_existing(&path)?;
    let updated = apply_block(&existing, links);
    if updated != existing {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, updated).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(true)
}

/// Remove the block. Returns `false` when there is no `.git` directory.
///
/// # Errors
///
/// Returns an error if the exclude file cannot be read or written.
pub fn remove(root: &Path) -> Result<bool> {
    let Some(path) = exclude_path(root) else {
        return Ok(false);
    };
    if !path.exists() {
        return Ok(true);
    }
    let existing = read_existing(&path)?;
    let stripped = strip_block(&existing);
    if stripped != existing {
        std::fs::write(&path, stripped).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(true)
}

fn read_existing(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
