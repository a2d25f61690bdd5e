//! Lexical path handling for `/`-separated paths relative to the target root.
//!
//! Nothing here touches the filesystem; symlink targets are resolved purely
//! by string arithmetic so plans can be computed from a snapshot.
use std::path::Path;

/// Split into segments, dropping empty and `.` segments. `..` is kept.
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

/// Collapse separators and `.` segments; keep `..` and a leading `/`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let joined = segments(path).join("/");
    if path.starts_with(['/', '\\']) {
        format!("/{joined}")
    } else {
        joined
    }
}

/// `true` for `/x`, `\x`, and drive-letter forms such as `C:/x`.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    if path.starts_with(['/', '\\']) {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

/// Join a relative path under a (possibly empty) prefix.
#[must_use]
pub fn join(prefix: &str, rest: &str) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}/{rest}"),
    }
}

/// Every proper ancestor of `path`, shortest first: `a/b/c` yields `a`, `a/b`.
#[must_use]
pub fn ancestors(path: &str) -> Vec<String> {
    let parts = segments(path);
    (1..parts.len())
        .filter_map(|len| parts.get(..len))
        .map(|prefix| prefix.join("/"))
        .collect()
}

/// Resolve a symlink `target` stored at `dst` to root-relative segments.
///
/// Absolute targets are accepted only when they sit under `root`. Returns
/// `None` when the target escapes the root.
#[must_use]
pub fn resolve_target(root: &Path, dst: &str, target: &str) -> Option<Vec<String>> {
    let (mut resolved, rest): (Vec<String>, String) = if Path::new(target).is_absolute() {
        let relative = Path::new(target).strip_prefix(root).ok()?;
        (Vec::new(), relative.to_string_lossy().replace('\\', "/"))
    } else {
        let mut parent: Vec<String> = segments(dst).iter().map(ToString::to_string).collect();
        parent.pop();
        (parent, target.to_string())
    };

    for segment in segments(&rest) {
        if segment == ".." {
            resolved.pop()?;
        } else {
            resolved.push(segment.to_string());
        }
    }
    Some(resolved)
}
