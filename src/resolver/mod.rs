//! Cross-file relationship resolution.
//!
//! Four independent passes over the symbol registry produce the edge set:
//! import resolution, call resolution, inheritance resolution, and file-level
//! dependencies. A name that cannot be resolved simply produces no edge.
//! Registry iteration order is stable, so the edge list is deterministic for
//! a given input tree.
use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::extractor::ImportKind;
use crate::registry::{FileSymbols, ResolvedImport, SymbolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EdgeKind {
    ImportsResolvesTo,
    CallsFunction,
    InheritsFrom,
    DependsOn,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::ImportsResolvesTo => "IMPORTS_RESOLVES_TO",
            EdgeKind::CallsFunction => "CALLS_FUNCTION",
            EdgeKind::InheritsFrom => "INHERITS_FROM",
            EdgeKind::DependsOn => "DEPENDS_ON",
        }
    }
}

/// One resolved relationship between two files (or two symbols within one).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipEdge {
    pub kind: EdgeKind,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_symbol: Option<String>,
    pub target_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_line: Option<usize>,
    pub cross_file: bool,
}

/// Where a named symbol lives in a target file, for edge endpoints.
fn find_symbol_line(symbols: &FileSymbols, name: &str) -> Option<usize> {
    if let Some(class) = symbols.find_class(name) {
        return Some(class.line);
    }
    if let Some(func) = symbols.find_function(name) {
        return Some(func.line);
    }
    symbols.find_named_export(name).map(|e| e.line)
}

/// Run all four passes and return the deduplicated edge list.
pub fn resolve(registry: &SymbolRegistry) -> Vec<RelationshipEdge> {
    let mut edges = Vec::new();
    resolve_imports(registry, &mut edges);
    resolve_calls(registry, &mut edges);
    resolve_inheritance(registry, &mut edges);
    resolve_dependencies(registry, &mut edges);

    // First occurrence wins; later duplicates (repeated call sites of the
    // same pair) are dropped.
    let mut seen = BTreeSet::new();
    edges.retain(|e| {
        seen.insert((
            e.kind,
            e.source_file.clone(),
            e.source_symbol.clone(),
            e.target_file.clone(),
            e.target_symbol.clone(),
        ))
    });
    debug!("Resolved {} relationship edges", edges.len());
    edges
}

/// Pass 1: one edge per import specifier whose file resolved and whose name
/// the target file actually defines. An unmatched name produces no edge; a
/// side-effect import carries no specifiers and is covered by DEPENDS_ON.
fn resolve_imports(registry: &SymbolRegistry, edges: &mut Vec<RelationshipEdge>) {
    for path in registry.paths() {
        for resolved in registry.imports(path) {
            let Some(target_file) = &resolved.resolved_path else {
                continue;
            };
            let target_symbols = registry.symbols(target_file);

            for spec in &resolved.import.specifiers {
                // Namespace imports bind the whole module, not a symbol;
                // they contribute to DEPENDS_ON only.
                if spec.kind == ImportKind::Namespace {
                    continue;
                }
                let matched = match spec.kind {
                    ImportKind::Default => default_export_target(target_symbols),
                    _ => {
                        let wanted = spec.imported.as_deref().unwrap_or(&spec.local);
                        target_symbols
                            .and_then(|s| find_symbol_line(s, wanted))
                            .map(|line| (Some(wanted.to_string()), Some(line)))
                    }
                };
                let Some((target_symbol, target_line)) = matched else {
                    continue;
                };
                edges.push(RelationshipEdge {
                    kind: EdgeKind::ImportsResolvesTo,
                    source_file: path.clone(),
                    source_symbol: Some(spec.local.clone()),
                    target_file: target_file.clone(),
                    target_symbol,
                    source_line: Some(resolved.import.line),
                    target_line,
                    cross_file: path != target_file,
                });
            }
        }
    }
}

/// Default-export endpoint of a target file; `None` when it has none. An
/// anonymous default export matches without a symbol name.
fn default_export_target(
    symbols: Option<&FileSymbols>,
) -> Option<(Option<String>, Option<usize>)> {
    let symbols = symbols?;
    let default = symbols.default_export.as_ref()?;
    match &default.name {
        Some(name) => {
            let line = find_symbol_line(symbols, name).or(Some(default.line));
            Some((Some(name.clone()), line))
        }
        None => Some((None, Some(default.line))),
    }
}

/// Pass 2: call sites resolve local-first, then through the file's imports in
/// declaration order; the first match wins.
fn resolve_calls(registry: &SymbolRegistry, edges: &mut Vec<RelationshipEdge>) {
    for path in registry.paths() {
        let Some(structure) = registry.structure(path) else {
            continue;
        };
        let Some(local) = registry.symbols(path) else {
            continue;
        };

        for call in &structure.calls {
            if let Some(func) = local.find_function(&call.callee) {
                edges.push(RelationshipEdge {
                    kind: EdgeKind::CallsFunction,
                    source_file: path.clone(),
                    source_symbol: None,
                    target_file: path.clone(),
                    target_symbol: Some(func.name.clone()),
                    source_line: Some(call.line),
                    target_line: Some(func.line),
                    cross_file: false,
                });
                continue;
            }

            if let Some((target_file, symbol, target_line)) =
                imported_definition(registry, registry.imports(path), &call.callee, |s, n| {
                    s.find_function(n).map(|f| f.line)
                })
            {
                edges.push(RelationshipEdge {
                    kind: EdgeKind::CallsFunction,
                    source_file: path.clone(),
                    source_symbol: None,
                    target_file,
                    target_symbol: Some(symbol),
                    source_line: Some(call.line),
                    target_line: Some(target_line),
                    cross_file: true,
                });
            }
        }
    }
}

/// Pass 3: class inheritance, same two-tier lookup as calls.
fn resolve_inheritance(registry: &SymbolRegistry, edges: &mut Vec<RelationshipEdge>) {
    for path in registry.paths() {
        let Some(local) = registry.symbols(path) else {
            continue;
        };
        for class in &local.classes {
            let Some(superclass) = &class.superclass else {
                continue;
            };

            if let Some(parent) = local.find_class(superclass) {
                if parent.name != class.name {
                    edges.push(RelationshipEdge {
                        kind: EdgeKind::InheritsFrom,
                        source_file: path.clone(),
                        source_symbol: Some(class.name.clone()),
                        target_file: path.clone(),
                        target_symbol: Some(parent.name.clone()),
                        source_line: Some(class.line),
                        target_line: Some(parent.line),
                        cross_file: false,
                    });
                }
                continue;
            }

            if let Some((target_file, symbol, target_line)) =
                imported_definition(registry, registry.imports(path), superclass, |s, n| {
                    s.find_class(n).map(|c| c.line)
                })
            {
                edges.push(RelationshipEdge {
                    kind: EdgeKind::InheritsFrom,
                    source_file: path.clone(),
                    source_symbol: Some(class.name.clone()),
                    target_file,
                    target_symbol: Some(symbol),
                    source_line: Some(class.line),
                    target_line: Some(target_line),
                    cross_file: true,
                });
            }
        }
    }
}

/// Pass 4: one DEPENDS_ON edge per distinct (importer, imported) file pair,
/// counting every resolved import including namespace-only ones.
fn resolve_dependencies(registry: &SymbolRegistry, edges: &mut Vec<RelationshipEdge>) {
    let mut pairs = BTreeSet::new();
    for path in registry.paths() {
        for resolved in registry.imports(path) {
            if let Some(target) = &resolved.resolved_path {
                if target != path {
                    pairs.insert((path.clone(), target.clone()));
                }
            }
        }
    }
    for (source_file, target_file) in pairs {
        edges.push(RelationshipEdge {
            kind: EdgeKind::DependsOn,
            source_file,
            source_symbol: None,
            target_file,
            target_symbol: None,
            source_line: None,
            target_line: None,
            cross_file: true,
        });
    }
}

/// Walk a file's imports in declaration order and return the first specifier
/// binding `name` whose target actually defines the looked-up symbol. A
/// name-only match without a definition falls through to later imports.
fn imported_definition(
    registry: &SymbolRegistry,
    imports: &[ResolvedImport],
    name: &str,
    lookup: impl Fn(&FileSymbols, &str) -> Option<usize>,
) -> Option<(String, String, usize)> {
    for resolved in imports {
        let Some(target) = &resolved.resolved_path else {
            continue;
        };
        let Some(target_symbols) = registry.symbols(target) else {
            continue;
        };
        for spec in &resolved.import.specifiers {
            if spec.kind == ImportKind::Namespace || spec.local != name {
                continue;
            }
            let symbol = match spec.kind {
                ImportKind::Default => {
                    // A default import binds whatever the target exports by
                    // default; an anonymous or missing default cannot match.
                    match target_symbols
                        .default_export
                        .as_ref()
                        .and_then(|d| d.name.clone())
                    {
                        Some(symbol) => symbol,
                        None => continue,
                    }
                }
                _ => spec.imported.clone().unwrap_or_else(|| spec.local.clone()),
            };
            if let Some(line) = lookup(target_symbols, &symbol) {
                return Some((target.clone(), symbol, line));
            }
        }
    }
    None
}
