//! Cross-file symbol registry.
//!
//! Built in a single pass over every extracted file, then queried by the
//! relationship resolver. Rebuilt from scratch each run; it is a projection of
//! the extracted structures, never persisted. All maps are ordered so
//! downstream edge emission is deterministic.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::extractor::{ClassInfo, CodeStructure, ExportInfo, ExportKind, FunctionInfo, ImportInfo};

/// Extensions tried when a relative specifier has no literal match, in
/// precedence order.
const RESOLVE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "py"];

/// The exportable surface of one file. Classes and functions are candidate
/// exports even without an export statement.
#[derive(Debug, Default, Clone)]
pub struct FileSymbols {
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub named_exports: Vec<ExportInfo>,
    pub default_export: Option<ExportInfo>,
}

impl FileSymbols {
    pub fn find_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_named_export(&self, name: &str) -> Option<&ExportInfo> {
        self.named_exports
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
    }
}

/// One import statement with its resolution outcome. Bare specifiers stay
/// unresolved; that is expected, not an error.
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub import: ImportInfo,
    pub resolved_path: Option<String>,
}

impl ResolvedImport {
    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }
}

/// Symbol registry over every file extracted in this run.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    structures: BTreeMap<String, CodeStructure>,
    symbols: BTreeMap<String, FileSymbols>,
    imports: BTreeMap<String, Vec<ResolvedImport>>,
}

impl SymbolRegistry {
    /// Build the registry from extracted file structures in a single pass.
    pub fn build(files: Vec<(String, CodeStructure)>) -> Self {
        let path_index: BTreeSet<String> = files.iter().map(|(p, _)| p.clone()).collect();

        let mut registry = SymbolRegistry::default();
        for (path, structure) in files {
            let mut symbols = FileSymbols {
                classes: structure.classes.clone(),
                functions: structure.functions.clone(),
                ..Default::default()
            };
            for export in &structure.exports {
                match export.kind {
                    ExportKind::Default => {
                        if symbols.default_export.is_none() {
                            symbols.default_export = Some(export.clone());
                        }
                    }
                    ExportKind::Named | ExportKind::ReExport => {
                        symbols.named_exports.push(export.clone());
                    }
                }
            }

            let resolved: Vec<ResolvedImport> = structure
                .imports
                .iter()
                .map(|import| {
                    let resolved_path = resolve_specifier(&path, &import.source, &path_index);
                    if resolved_path.is_none() && import.source.starts_with('.') {
                        debug!(
                            "Unresolved relative import {:?} in {path}",
                            import.source
                        );
                    }
                    ResolvedImport {
                        import: import.clone(),
                        resolved_path,
                    }
                })
                .collect();

            registry.imports.insert(path.clone(), resolved);
            registry.symbols.insert(path.clone(), symbols);
            registry.structures.insert(path, structure);
        }
        registry
    }

    /// Every registered file path, in order.
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.structures.keys()
    }

    pub fn structure(&self, path: &str) -> Option<&CodeStructure> {
        self.structures.get(path)
    }

    pub fn symbols(&self, path: &str) -> Option<&FileSymbols> {
        self.symbols.get(path)
    }

    /// Imports of a file in declaration order, with resolution outcomes.
    pub fn imports(&self, path: &str) -> &[ResolvedImport] {
        self.imports.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolve a module specifier relative to the importing file against the set
/// of indexed paths. Candidates are tried in order: the literal path, the
/// path with each known extension appended, then `index.<ext>` inside the
/// path as a directory. Bare specifiers (no `./` or `../` prefix) are
/// external packages and never resolve.
fn resolve_specifier(
    importer: &str,
    specifier: &str,
    path_index: &BTreeSet<String>,
) -> Option<String> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") && specifier != "." {
        return None;
    }

    let dir = match importer.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let base = normalize_join(dir, specifier)?;

    if !base.is_empty() && path_index.contains(&base) {
        return Some(base);
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = format!("{base}.{ext}");
        if path_index.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = if base.is_empty() {
            format!("index.{ext}")
        } else {
            format!("{base}/index.{ext}")
        };
        if path_index.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Join a specifier onto a directory and normalize `.`/`..` segments
/// lexically. `None` when `..` escapes the project root.
fn normalize_join(dir: &str, specifier: &str) -> Option<String> {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            part => segments.push(part),
        }
    }
    Some(segments.join("/"))
}
