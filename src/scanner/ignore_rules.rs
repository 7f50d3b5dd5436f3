//! Gitignore-style pattern matching for the path filter.
//!
//! Patterns are loaded from the project ignore file when present and
//! translated to path-segment-aware regular expressions. Absence of an
//! ignore file falls back to a fixed default exclusion set.
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

/// Directories excluded when no project ignore file exists.
const DEFAULT_EXCLUSIONS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "coverage",
    "out",
    ".next",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
];

struct CompiledPattern {
    /// Matches the path itself or anything beneath it.
    scope: Regex,
    /// Matches only paths strictly beneath the pattern (for directory-only
    /// patterns applied to files).
    descendant: Regex,
    dir_only: bool,
}

/// An ordered set of compiled ignore patterns.
pub struct IgnoreRules {
    patterns: Vec<CompiledPattern>,
}

impl IgnoreRules {
    /// Compile an ordered list of gitignore-style patterns.
    ///
    /// Translation: `**` crosses directory boundaries, `*` and `?` stay within
    /// a single path segment, a leading `/` anchors the pattern to the root,
    /// and a pattern without a slash matches at any depth. Blank lines and
    /// comments are skipped.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            let line = raw.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('!') {
                // Negations are rare in practice and not worth the matching
                // complexity here; the pattern is dropped with a note.
                debug!("Skipping unsupported negated ignore pattern: !{stripped}");
                continue;
            }
            match compile_pattern(line) {
                Some(p) => compiled.push(p),
                None => warn!("Failed to compile ignore pattern: {line}"),
            }
        }
        Self { patterns: compiled }
    }

    /// Default exclusion set used when no ignore file is present.
    pub fn defaults() -> Self {
        Self::from_patterns(DEFAULT_EXCLUSIONS.iter().map(|d| format!("{d}/")))
    }

    /// Load rules from `<root>/.gitignore`, falling back to defaults.
    pub fn load(root: &Path) -> Self {
        let ignore_file = root.join(".gitignore");
        match std::fs::read_to_string(&ignore_file) {
            Ok(content) => {
                debug!("Loaded ignore patterns from {}", ignore_file.display());
                let mut rules = Self::from_patterns(content.lines());
                if rules.patterns.is_empty() {
                    rules = Self::defaults();
                }
                rules
            }
            Err(_) => Self::defaults(),
        }
    }

    /// Whether a root-relative path (forward slashes) is excluded.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let rel_path = rel_path.trim_matches('/');
        if rel_path.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| {
            if p.dir_only && !is_dir {
                p.descendant.is_match(rel_path)
            } else {
                p.scope.is_match(rel_path)
            }
        })
    }
}

fn compile_pattern(line: &str) -> Option<CompiledPattern> {
    let dir_only = line.ends_with('/');
    let body = line.trim_end_matches('/');
    let anchored = body.starts_with('/') || body.trim_start_matches('/').contains('/');
    let body = body.trim_start_matches('/');
    if body.is_empty() {
        return None;
    }

    let mut re = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` collapses to any number of whole segments
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        re.push_str("(?:[^/]+/)*");
                    } else {
                        re.push_str(".*");
                    }
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }

    let prefix = if anchored { "^" } else { "(?:^|.*/)" };
    let scope = Regex::new(&format!("{prefix}{re}(?:/.*)?$")).ok()?;
    let descendant = Regex::new(&format!("{prefix}{re}/.*$")).ok()?;
    Some(CompiledPattern {
        scope,
        descendant,
        dir_only,
    })
}
