//! Line-oriented structural extraction for Python.
//!
//! Deliberately regex-based and lower fidelity than the tree-sitter path:
//! decorators beyond `@staticmethod`, multi-line signatures and conditional
//! definitions are not tracked. Classes and top-level functions are candidate
//! exports; Python has no export statements.
use std::sync::LazyLock;

use regex::Regex;

use super::types::{
    CallInfo, ClassInfo, CodeStructure, FunctionInfo, ImportInfo, ImportKind, ImportSpecifier,
    MethodInfo,
};

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap()
});

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(async\s+)?def\s+(\w+)\s*\(([^)]*)\)?").unwrap()
});

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").unwrap());

static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(\.*)([\w.]*)\s+import\s+(.+)$").unwrap());

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\w+(?:\.\w+)*)\s*\(").unwrap());

const KEYWORDS: &[&str] = &[
    "if", "elif", "while", "for", "with", "return", "yield", "assert", "raise", "del", "print",
    "lambda", "and", "or", "not", "in", "is", "def", "class", "except", "await",
];

pub fn extract(content: &str) -> CodeStructure {
    let mut structure = CodeStructure::default();
    // Innermost open class scope: (indent, index into structure.classes).
    let mut class_stack: Vec<(usize, usize)> = Vec::new();
    let mut pending_staticmethod = false;

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();

        // Dedent closes class scopes.
        while class_stack.last().is_some_and(|&(ci, _)| indent <= ci) {
            class_stack.pop();
        }

        if trimmed.starts_with('@') {
            pending_staticmethod = trimmed.starts_with("@staticmethod");
            continue;
        }

        if let Some(caps) = IMPORT_RE.captures(line) {
            structure
                .imports
                .extend(read_plain_import(&caps[1], lineno));
            continue;
        }
        if let Some(caps) = FROM_IMPORT_RE.captures(line) {
            if let Some(import) = read_from_import(&caps[1], &caps[2], &caps[3], lineno) {
                structure.imports.push(import);
            }
            continue;
        }

        if let Some(caps) = CLASS_RE.captures(line) {
            let superclass = caps
                .get(3)
                .map(|m| m.as_str())
                .and_then(first_base)
                .map(normalize_dotted);
            if indent == 0 {
                structure.classes.push(ClassInfo {
                    name: caps[2].to_string(),
                    superclass,
                    line: lineno,
                    methods: Vec::new(),
                });
                class_stack.push((indent, structure.classes.len() - 1));
            }
            pending_staticmethod = false;
            continue;
        }

        if let Some(caps) = DEF_RE.captures(line) {
            let is_async = caps.get(2).is_some();
            let name = caps[3].to_string();
            let params = read_params(caps.get(4).map_or("", |m| m.as_str()));

            if let Some(&(_, class_idx)) = class_stack.last() {
                let kind = if name == "__init__" {
                    "constructor"
                } else {
                    "method"
                };
                structure.classes[class_idx].methods.push(MethodInfo {
                    name,
                    kind: kind.to_string(),
                    is_static: pending_staticmethod,
                    is_async,
                    line: lineno,
                    parameters: params
                        .into_iter()
                        .filter(|p| p != "self" && p != "cls")
                        .collect(),
                });
            } else if indent == 0 {
                structure.functions.push(FunctionInfo {
                    name,
                    is_async,
                    is_generator: false,
                    line: lineno,
                    parameters: params,
                });
            }
            pending_staticmethod = false;
            continue;
        }

        pending_staticmethod = false;
        collect_calls(line, lineno, &mut structure.calls);
    }

    structure
}

/// `import a.b as c, d` produces one namespace specifier per module.
fn read_plain_import(modules: &str, line: usize) -> Vec<ImportInfo> {
    let mut imports = Vec::new();
    for part in modules.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (module, alias) = split_alias(part);
        let local = alias.unwrap_or_else(|| {
            module.rsplit('.').next().unwrap_or(module).to_string()
        });
        imports.push(ImportInfo {
            source: module.replace('.', "/"),
            specifiers: vec![ImportSpecifier {
                kind: ImportKind::Namespace,
                local,
                imported: None,
            }],
            line,
        });
    }
    imports
}

/// `from .pkg.mod import a, b as c`. Leading dots become `./` / `../` path
/// prefixes so the registry can resolve them like other relative specifiers.
fn read_from_import(dots: &str, module: &str, names: &str, line: usize) -> Option<ImportInfo> {
    let prefix = match dots.len() {
        0 => String::new(),
        1 => "./".to_string(),
        n => "../".repeat(n - 1),
    };
    let module_path = module.replace('.', "/");
    let source = match (prefix.is_empty(), module_path.is_empty()) {
        (true, true) => return None,
        (true, false) => module_path,
        (false, true) => prefix.trim_end_matches('/').to_string(),
        (false, false) => format!("{prefix}{module_path}"),
    };

    let mut specifiers = Vec::new();
    for part in names.trim().trim_start_matches('(').trim_end_matches(')').split(',') {
        let part = part.trim();
        if part.is_empty() || part == "*" {
            continue;
        }
        let (name, alias) = split_alias(part);
        let (local, imported) = match alias {
            Some(alias) => (alias, Some(name.to_string())),
            None => (name.to_string(), None),
        };
        specifiers.push(ImportSpecifier {
            kind: ImportKind::Named,
            local,
            imported,
        });
    }

    Some(ImportInfo {
        source,
        specifiers,
        line,
    })
}

fn split_alias(part: &str) -> (&str, Option<String>) {
    match part.split_once(" as ") {
        Some((name, alias)) => (name.trim(), Some(alias.trim().to_string())),
        None => (part, None),
    }
}

fn first_base(bases: &str) -> Option<&str> {
    bases
        .split(',')
        .map(str::trim)
        .find(|b| !b.is_empty() && *b != "object" && !b.contains('='))
}

/// `module.Class` inheritance keeps only the class name.
fn normalize_dotted(base: &str) -> String {
    base.rsplit('.').next().unwrap_or(base).to_string()
}

fn read_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(|p| {
            p.split(':')
                .next()
                .unwrap_or("")
                .split('=')
                .next()
                .unwrap_or("")
                .trim()
                .trim_start_matches('*')
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

fn collect_calls(line: &str, lineno: usize, calls: &mut Vec<CallInfo>) {
    for caps in CALL_RE.captures_iter(line) {
        let callee = &caps[1];
        let head = callee.split('.').next().unwrap_or(callee);
        if KEYWORDS.contains(&head) {
            continue;
        }
        let open = caps.get(0).unwrap().end();
        calls.push(CallInfo {
            callee: callee.to_string(),
            line: lineno,
            argument_count: count_args(&line[open..]),
        });
    }
}

/// Top-level comma count inside the (possibly truncated) argument list.
fn count_args(rest: &str) -> usize {
    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut any = false;
    for c in rest.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => commas += 1,
            c if !c.is_whitespace() => any = true,
            _ => {}
        }
    }
    if any { commas + 1 } else { 0 }
}
