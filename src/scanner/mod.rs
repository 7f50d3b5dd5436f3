//! File discovery: walks the project tree, applies ignore rules, sniffs
//! binaries, and classifies eligible files.
pub mod classify;
pub mod ignore_rules;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

pub use classify::{FileType, classify, is_binary};
pub use ignore_rules::IgnoreRules;

/// Files above this size are skipped before chunking/extraction.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// A discovered file eligible for indexing. Immutable once created.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Root-relative path with forward slashes, the stable identity of the file.
    pub path: String,
    pub absolute_path: PathBuf,
    pub file_type: FileType,
    pub size_bytes: u64,
    pub mtime: DateTime<Utc>,
}

/// Why a discovered path was excluded. Skips are reported, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Binary,
    Oversized,
    Unreadable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Binary => "binary",
            SkipReason::Oversized => "oversized",
            SkipReason::Unreadable => "unreadable",
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileRecord>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Scanner for the files eligible for indexing under a root directory.
pub struct Scanner {
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    max_file_size: u64,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>, rules: IgnoreRules, max_file_size: u64) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            rules: Arc::new(rules),
            max_file_size,
        }
    }

    /// Walk the tree and collect eligible files.
    ///
    /// Directories matching an ignore rule are pruned before recursing, so a
    /// `node_modules` tree is never descended into. Oversized and binary files
    /// are reported as skips.
    pub fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let root = self.root.clone();
        let rules = Arc::clone(&self.rules);
        let mut builder = WalkBuilder::new(&self.root);
        builder.standard_filters(false).follow_links(false);
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            match relative_path(entry.path(), &root) {
                Some(rel) if !rel.is_empty() => !rules.is_ignored(&rel, is_dir),
                _ => true,
            }
        });

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(rel) = relative_path(path, &self.root) else {
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping unreadable {}: {e}", path.display());
                    outcome.skipped.push((rel, SkipReason::Unreadable));
                    continue;
                }
            };

            if metadata.len() > self.max_file_size {
                debug!(
                    "Skipping large file {} ({} bytes > {})",
                    path.display(),
                    metadata.len(),
                    self.max_file_size
                );
                outcome.skipped.push((rel, SkipReason::Oversized));
                continue;
            }

            if is_binary(path) {
                debug!("Skipping binary file {}", path.display());
                outcome.skipped.push((rel, SkipReason::Binary));
                continue;
            }

            let mtime: DateTime<Utc> = metadata
                .modified()
                .map(Into::into)
                .unwrap_or_else(|_| Utc::now());

            outcome.files.push(FileRecord {
                path: rel,
                absolute_path: path.to_path_buf(),
                file_type: classify(path),
                size_bytes: metadata.len(),
                mtime,
            });
        }

        // Stable ordering keeps downstream aggregation deterministic.
        outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            "Discovered {} files ({} skipped)",
            outcome.files.len(),
            outcome.skipped.len()
        );
        outcome
    }
}

/// Root-relative path with forward slashes, for cross-platform stable keys.
fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn scan_dir(root: &Path) -> ScanOutcome {
        let rules = IgnoreRules::load(root);
        Scanner::new(root, rules, DEFAULT_MAX_FILE_SIZE).scan()
    }

    #[test]
    fn test_discovers_and_classifies() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("app.js"), "const x = 1;\n").unwrap();
        fs::write(temp.path().join("README.md"), "# readme\n").unwrap();

        let outcome = scan_dir(temp.path());
        assert_eq!(outcome.files.len(), 2);
        let js = outcome.files.iter().find(|f| f.path == "app.js").unwrap();
        assert_eq!(js.file_type, FileType::Code);
        let md = outcome.files.iter().find(|f| f.path == "README.md").unwrap();
        assert_eq!(md.file_type, FileType::Markup);
    }

    #[test]
    fn test_ignored_directory_is_pruned() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("bundle.js"), "var a = 1;").unwrap();
        fs::write(temp.path().join("main.js"), "var b = 2;").unwrap();
        fs::write(temp.path().join(".gitignore"), "dist/\n").unwrap();

        let outcome = scan_dir(temp.path());
        assert!(outcome.files.iter().all(|f| !f.path.starts_with("dist")));
        assert!(outcome.files.iter().any(|f| f.path == "main.js"));
    }

    #[test]
    fn test_binary_file_skipped() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
        fs::write(temp.path().join("ok.txt"), "text").unwrap();

        let outcome = scan_dir(temp.path());
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].path, "ok.txt");
        assert!(
            outcome
                .skipped
                .iter()
                .any(|(p, r)| p == "blob.bin" && *r == SkipReason::Binary)
        );
    }

    #[test]
    fn test_oversized_file_skipped() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("big.txt"), "x".repeat(2048)).unwrap();
        fs::write(temp.path().join("small.txt"), "y").unwrap();

        let rules = IgnoreRules::load(temp.path());
        let outcome = Scanner::new(temp.path(), rules, 1024).scan();
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].path, "small.txt");
        assert!(
            outcome
                .skipped
                .iter()
                .any(|(p, r)| p == "big.txt" && *r == SkipReason::Oversized)
        );
    }

    #[test]
    fn test_deterministic_order() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.js"), "1").unwrap();
        fs::write(temp.path().join("a.js"), "2").unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/c.js"), "3").unwrap();

        let paths: Vec<String> = scan_dir(temp.path())
            .files
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(paths, vec!["a.js", "b.js", "src/c.js"]);
    }
}
