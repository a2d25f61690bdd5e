//! `.repoverlayignore` rules and gitignore-flavoured path matching.
//!
//! Matching is segment-wise over `/`-separated relative paths:
//!
//! - a pattern without `/` (ignoring a trailing one) is tested against the
//!   basename only, so `*.example` matches `a/b.example`;
//! - a pattern with `/` is tested against the whole path, left-anchored;
//! - a `**` segment matches zero or more segments, except in trailing
//!   position where it requires at least one (`dir/**` matches contents of
//!   `dir`, not `dir` itself);
//! - a trailing `/` makes the pattern match directories, i.e. any proper
//!   ancestor of the path.
//!
//! Negation (`!pattern`) is not supported; such lines match literally.
use std::path::Path;

use anyhow::{Context as _, Result};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Glob(Pattern),
}

impl Segment {
    fn compile(raw: &str) -> Self {
        if raw == "**" {
            return Self::AnyDepth;
        }
        // `**` inside a segment behaves like `*`.
        let mut text = raw.to_string();
        while text.contains("**") {
            text = text.replace("**", "*");
        }
        let pattern = Pattern::new(&text)
            .or_else(|_| Pattern::new(&Pattern::escape(&text)))
            .unwrap_or_default();
        Self::Glob(pattern)
    }
}

/// One compiled ignore pattern.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    raw: String,
    segments: Vec<Segment>,
    basename_only: bool,
    directory_only: bool,
}

impl IgnorePattern {
    /// Compile a single pattern line. Returns `None` for blank lines.
    #[must_use]
    pub fn new(pattern: &str) -> Option<Self> {
        let raw = pattern.trim();
        let mut body = raw.replace('\\', "/");
        let directory_only = body.ends_with('/');
        while body.ends_with('/') {
            body.pop();
        }
        let anchored = body.starts_with('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            return None;
        }
        let segments = body
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(Segment::compile)
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            basename_only: !anchored && !body.contains('/'),
            segments,
            directory_only,
        })
    }

    /// The pattern text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test a `/`-separated path relative to the overlay root.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        let parts: Vec<&str> = normalized
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if parts.is_empty() {
            return false;
        }

        if self.directory_only {
            // Only ancestors are known to be directories.
            let ancestors = parts.len() - 1;
            return (1..=ancestors)
                .filter_map(|len| parts.get(..len))
                .any(|prefix| self.matches_parts(prefix));
        }
        self.matches_parts(&parts)
    }

    fn matches_parts(&self, parts: &[&str]) -> bool {
        if self.basename_only {
            let Some(last) = parts.last() else {
                return false;
            };
            return match_segments(&self.segments, &[*last]);
        }
        match_segments(&self.segments, parts)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    let Some((first, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    match first {
        Segment::AnyDepth if rest.is_empty() => !path.is_empty(),
        Segment::AnyDepth => (0..=path.len())
            .filter_map(|skip| path.get(skip..))
            .any(|tail| match_segments(rest, tail)),
        Segment::Glob(glob) => match path.split_first() {
            Some((head, tail)) => {
                glob.matches_with(head, MATCH_OPTIONS) && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

/// Test one pattern against one relative path.
#[must_use]
pub fn matches(pattern: &str, path: &str) -> bool {
    IgnorePattern::new(pattern).is_some_and(|p| p.matches(path))
}

/// An ordered set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreRules {
    /// Parse ignore-file content: one pattern per line, `#` comments and
    /// blank lines skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let patterns = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(IgnorePattern::new)
            .collect();
        Self { patterns }
    }

    /// Load rules from `path`. A missing file yields an empty rule set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading ignore file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Build rules from literal pattern strings.
    #[must_use]
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .filter_map(|p| IgnorePattern::new(p.as_ref()))
                .collect(),
        }
    }

    /// The first rule matching `path`, if any.
    #[must_use]
    pub fn matching_rule(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(IgnorePattern::as_str)
    }

    /// `true` when any rule matches `path`.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        self.matching_rule(path).is_some()
    }

    /// Rules written as `!pattern`. They are matched literally, never as
    /// re-inclusions.
    pub fn negations(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .map(IgnorePattern::as_str)
            .filter(|p| p.starts_with('!'))
    }

    /// Number of rules.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.patterns.len()
    }

    /// `true` when there are no rules.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
