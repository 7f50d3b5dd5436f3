//! Tree-sitter structural extraction for JavaScript and TypeScript.
//!
//! TypeScript parses with the plain TS grammar first; if the tree carries
//! errors (usually JSX in a `.ts`-labelled file) it retries once with the TSX
//! grammar. The JavaScript grammar already includes JSX, so it gets no retry.
use tree_sitter::{Node, Parser};
use tracing::debug;

use super::ExtractError;
use super::language::Language;
use super::types::{
    CallInfo, ClassInfo, CodeStructure, ExportInfo, ExportKind, FunctionInfo, ImportInfo,
    ImportKind, ImportSpecifier, MethodInfo,
};

pub fn extract(content: &str, language: Language) -> Result<CodeStructure, ExtractError> {
    let source = content.as_bytes();
    let tree = match language {
        Language::JavaScript => parse_with(source, &tree_sitter_javascript::LANGUAGE.into())?,
        Language::TypeScript => {
            let tree = parse_with(source, &tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?;
            if tree.root_node().has_error() {
                debug!("TypeScript parse had errors, retrying with the TSX grammar");
                parse_with(source, &tree_sitter_typescript::LANGUAGE_TSX.into())?
            } else {
                tree
            }
        }
        Language::Python => unreachable!("python goes through the line-oriented extractor"),
    };

    let root = tree.root_node();
    if root.has_error() {
        return Err(ExtractError::Parse(language.as_str()));
    }

    let mut structure = CodeStructure::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        walk_top_level(child, source, &mut structure);
    }
    collect_calls(root, source, &mut structure.calls);
    Ok(structure)
}

fn parse_with(
    source: &[u8],
    language: &tree_sitter::Language,
) -> Result<tree_sitter::Tree, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ExtractError::Grammar(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or(ExtractError::Parse("parser returned no tree"))
}

fn walk_top_level(node: Node, source: &[u8], structure: &mut CodeStructure) {
    match node.kind() {
        "import_statement" => {
            if let Some(import) = read_import(node, source) {
                structure.imports.push(import);
            }
        }
        "export_statement" => read_export(node, source, structure),
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(class) = read_class(node, source) {
                structure.classes.push(class);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(func) = read_function(node, source) {
                structure.functions.push(func);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            structure.functions.extend(read_bound_functions(node, source));
        }
        _ => {}
    }
}

// ── imports ──

fn read_import(node: Node, source: &[u8]) -> Option<ImportInfo> {
    let import_source = node
        .child_by_field_name("source")
        .map(|n| string_value(n, source))?;

    let mut specifiers = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => specifiers.push(ImportSpecifier {
                    kind: ImportKind::Default,
                    local: text(part, source),
                    imported: None,
                }),
                "namespace_import" => {
                    if let Some(local) = first_child_of_kind(part, "identifier") {
                        specifiers.push(ImportSpecifier {
                            kind: ImportKind::Namespace,
                            local: text(local, source),
                            imported: None,
                        });
                    }
                }
                "named_imports" => {
                    let mut named_cursor = part.walk();
                    for spec in part.named_children(&mut named_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let imported = spec.child_by_field_name("name").map(|n| text(n, source));
                        let alias = spec.child_by_field_name("alias").map(|n| text(n, source));
                        let Some(imported) = imported else { continue };
                        let (local, imported) = match alias {
                            Some(alias) => (alias, Some(imported)),
                            None => (imported, None),
                        };
                        specifiers.push(ImportSpecifier {
                            kind: ImportKind::Named,
                            local,
                            imported,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    Some(ImportInfo {
        source: import_source,
        specifiers,
        line: line_of(node),
    })
}

// ── exports ──

/// Record an export statement. Exported declarations are also recorded in
/// `classes`/`functions` so the registry sees them as regular symbols.
fn read_export(node: Node, source: &[u8], structure: &mut CodeStructure) {
    let line = line_of(node);
    let is_default = has_token(node, "default");
    let re_export_source = node
        .child_by_field_name("source")
        .map(|n| string_value(n, source));

    if let Some(re_source) = re_export_source {
        // `export { a, b } from "./mod"` or `export * from "./mod"`.
        let mut pushed = false;
        if let Some(clause) = first_child_of_kind(node, "export_clause") {
            let mut cursor = clause.walk();
            for spec in clause.named_children(&mut cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let name = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"))
                    .map(|n| text(n, source));
                structure.exports.push(ExportInfo {
                    kind: ExportKind::ReExport,
                    name,
                    declaration_type: None,
                    source_re_export: Some(re_source.clone()),
                    line,
                });
                pushed = true;
            }
        }
        if !pushed {
            structure.exports.push(ExportInfo {
                kind: ExportKind::ReExport,
                name: None,
                declaration_type: None,
                source_re_export: Some(re_source),
                line,
            });
        }
        return;
    }

    if let Some(declaration) = node.child_by_field_name("declaration") {
        let kind = if is_default {
            ExportKind::Default
        } else {
            ExportKind::Named
        };
        match declaration.kind() {
            "class_declaration" | "abstract_class_declaration" => {
                let name = declaration
                    .child_by_field_name("name")
                    .map(|n| text(n, source));
                structure.exports.push(ExportInfo {
                    kind,
                    name: name.clone(),
                    declaration_type: Some("class".to_string()),
                    source_re_export: None,
                    line,
                });
                if let Some(class) = read_class(declaration, source) {
                    structure.classes.push(class);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                let name = declaration
                    .child_by_field_name("name")
                    .map(|n| text(n, source));
                structure.exports.push(ExportInfo {
                    kind,
                    name,
                    declaration_type: Some("function".to_string()),
                    source_re_export: None,
                    line,
                });
                if let Some(func) = read_function(declaration, source) {
                    structure.functions.push(func);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let bound = read_bound_functions(declaration, source);
                for name in declared_names(declaration, source) {
                    structure.exports.push(ExportInfo {
                        kind,
                        name: Some(name),
                        declaration_type: Some("const".to_string()),
                        source_re_export: None,
                        line,
                    });
                }
                structure.functions.extend(bound);
            }
            _ => {
                structure.exports.push(ExportInfo {
                    kind,
                    name: None,
                    declaration_type: Some(declaration.kind().to_string()),
                    source_re_export: None,
                    line,
                });
            }
        }
        return;
    }

    if let Some(value) = node.child_by_field_name("value") {
        // `export default <expression>`.
        let name = (value.kind() == "identifier").then(|| text(value, source));
        structure.exports.push(ExportInfo {
            kind: ExportKind::Default,
            name,
            declaration_type: None,
            source_re_export: None,
            line,
        });
        return;
    }

    if let Some(clause) = first_child_of_kind(node, "export_clause") {
        // `export { a, b as c }` over local bindings.
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let name = spec
                .child_by_field_name("alias")
                .or_else(|| spec.child_by_field_name("name"))
                .map(|n| text(n, source));
            structure.exports.push(ExportInfo {
                kind: ExportKind::Named,
                name,
                declaration_type: None,
                source_re_export: None,
                line,
            });
        }
    }
}

// ── classes ──

fn read_class(node: Node, source: &[u8]) -> Option<ClassInfo> {
    let name = node.child_by_field_name("name").map(|n| text(n, source))?;
    let superclass = read_superclass(node, source);

    let mut methods = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "method_definition" {
                if let Some(method) = read_method(member, source) {
                    methods.push(method);
                }
            }
        }
    }

    Some(ClassInfo {
        name,
        superclass,
        line: line_of(node),
        methods,
    })
}

/// Superclass expression from the heritage clause. The JS grammar puts the
/// expression directly under `class_heritage`; the TS grammar nests an
/// `extends_clause` with a `value` field.
fn read_superclass(node: Node, source: &[u8]) -> Option<String> {
    let heritage = first_child_of_kind(node, "class_heritage")?;
    if let Some(extends) = first_child_of_kind(heritage, "extends_clause") {
        return extends.child_by_field_name("value").map(|n| text(n, source));
    }
    let mut cursor = heritage.walk();
    heritage
        .named_children(&mut cursor)
        .next()
        .map(|n| text(n, source))
}

fn read_method(node: Node, source: &[u8]) -> Option<MethodInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source);

    let mut is_static = false;
    let mut is_async = false;
    let mut accessor: Option<&str> = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.id() == name_node.id() {
            break;
        }
        match child.kind() {
            "static" => is_static = true,
            "async" => is_async = true,
            "get" => accessor = Some("getter"),
            "set" => accessor = Some("setter"),
            _ => {}
        }
    }

    let kind = match accessor {
        Some(kind) => kind.to_string(),
        None if name == "constructor" => "constructor".to_string(),
        None => "method".to_string(),
    };

    Some(MethodInfo {
        name,
        kind,
        is_static,
        is_async,
        line: line_of(node),
        parameters: read_parameters(node, source),
    })
}

// ── functions ──

fn read_function(node: Node, source: &[u8]) -> Option<FunctionInfo> {
    let name = node.child_by_field_name("name").map(|n| text(n, source))?;
    Some(FunctionInfo {
        name,
        is_async: has_token(node, "async"),
        is_generator: node.kind() == "generator_function_declaration",
        line: line_of(node),
        parameters: read_parameters(node, source),
    })
}

/// Arrow functions and function expressions bound to `const`/`let`/`var`.
fn read_bound_functions(node: Node, source: &[u8]) -> Vec<FunctionInfo> {
    let mut functions = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            continue;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        match value.kind() {
            "arrow_function" | "function_expression" | "generator_function" => {
                functions.push(FunctionInfo {
                    name: text(name_node, source),
                    is_async: has_token(value, "async"),
                    is_generator: value.kind() == "generator_function",
                    line: line_of(declarator),
                    parameters: read_parameters(value, source),
                });
            }
            _ => {}
        }
    }
    functions
}

fn declared_names(node: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        if let Some(name) = declarator.child_by_field_name("name") {
            if name.kind() == "identifier" {
                names.push(text(name, source));
            }
        }
    }
    names
}

fn read_parameters(node: Node, source: &[u8]) -> Vec<String> {
    let Some(params) = node.child_by_field_name("parameters") else {
        // Single-parameter arrow functions have a bare identifier instead.
        if let Some(param) = node.child_by_field_name("parameter") {
            return vec![text(param, source)];
        }
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => out.push(text(param, source)),
            // TS wraps each parameter; the binding sits in the pattern field.
            "required_parameter" | "optional_parameter" => {
                if let Some(pattern) = param.child_by_field_name("pattern") {
                    out.push(text(pattern, source));
                }
            }
            "assignment_pattern" => {
                if let Some(left) = param.child_by_field_name("left") {
                    out.push(text(left, source));
                }
            }
            "rest_pattern" | "object_pattern" | "array_pattern" => {
                out.push(compact(&text(param, source)));
            }
            _ => {}
        }
    }
    out
}

// ── calls ──

/// Collect every call expression in the tree, keeping dotted member paths
/// when the receiver chain is plain identifiers.
fn collect_calls(node: Node, source: &[u8], calls: &mut Vec<CallInfo>) {
    if node.kind() == "call_expression" {
        if let Some(function) = node.child_by_field_name("function") {
            if let Some(callee) = callee_name(function, source) {
                let argument_count = node
                    .child_by_field_name("arguments")
                    .map(|args| args.named_child_count())
                    .unwrap_or(0);
                calls.push(CallInfo {
                    callee,
                    line: line_of(node),
                    argument_count,
                });
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(child, source, calls);
    }
}

fn callee_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(text(node, source)),
        "member_expression" => {
            let property = node
                .child_by_field_name("property")
                .map(|n| text(n, source))?;
            let object = node.child_by_field_name("object")?;
            match callee_name(object, source) {
                Some(prefix) => Some(format!("{prefix}.{property}")),
                // Receiver is an expression (call result, literal); keep the
                // method name alone.
                None => Some(property),
            }
        }
        _ => None,
    }
}

// ── node helpers ──

fn text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

/// String literal content without the surrounding quotes.
fn string_value(node: Node, source: &[u8]) -> String {
    let raw = text(node, source);
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == token)
}

fn first_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn compact(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(content: &str) -> CodeStructure {
        extract(content, Language::JavaScript).expect("js extraction failed")
    }

    fn ts(content: &str) -> CodeStructure {
        extract(content, Language::TypeScript).expect("ts extraction failed")
    }

    #[test]
    fn test_import_specifiers() {
        let s = js(r#"
import React from "react";
import * as path from "path";
import { parse, format as fmt } from "./utils";
"#);
        assert_eq!(s.imports.len(), 3);
        assert_eq!(s.imports[0].source, "react");
        assert_eq!(s.imports[0].specifiers[0].kind, ImportKind::Default);
        assert_eq!(s.imports[0].specifiers[0].local, "React");

        assert_eq!(s.imports[1].specifiers[0].kind, ImportKind::Namespace);
        assert_eq!(s.imports[1].specifiers[0].local, "path");

        let named = &s.imports[2].specifiers;
        assert_eq!(named.len(), 2);
        assert_eq!(named[0].local, "parse");
        assert_eq!(named[0].imported, None);
        assert_eq!(named[1].local, "fmt");
        assert_eq!(named[1].imported.as_deref(), Some("format"));
    }

    #[test]
    fn test_exports() {
        let s = js(r#"
export class Widget {}
export function render() {}
export const helper = (x) => x;
export default Widget;
export { render as draw } from "./render";
"#);
        assert_eq!(s.exports.len(), 5);
        assert_eq!(s.exports[0].kind, ExportKind::Named);
        assert_eq!(s.exports[0].name.as_deref(), Some("Widget"));
        assert_eq!(s.exports[0].declaration_type.as_deref(), Some("class"));

        assert_eq!(s.exports[3].kind, ExportKind::Default);
        assert_eq!(s.exports[3].name.as_deref(), Some("Widget"));

        assert_eq!(s.exports[4].kind, ExportKind::ReExport);
        assert_eq!(s.exports[4].name.as_deref(), Some("draw"));
        assert_eq!(s.exports[4].source_re_export.as_deref(), Some("./render"));

        // Exported declarations are also plain symbols.
        assert_eq!(s.classes.len(), 1);
        assert_eq!(s.functions.len(), 2);
    }

    #[test]
    fn test_class_with_methods() {
        let s = js(r#"
class Store extends BaseStore {
  constructor(name) { this.name = name; }
  static create() { return new Store("x"); }
  async load(id, opts = {}) {}
  get size() { return 0; }
}
"#);
        let class = &s.classes[0];
        assert_eq!(class.name, "Store");
        assert_eq!(class.superclass.as_deref(), Some("BaseStore"));
        assert_eq!(class.methods.len(), 4);

        assert_eq!(class.methods[0].kind, "constructor");
        assert_eq!(class.methods[0].parameters, vec!["name"]);
        assert!(class.methods[1].is_static);
        assert!(class.methods[2].is_async);
        assert_eq!(class.methods[2].parameters, vec!["id", "opts"]);
        assert_eq!(class.methods[3].kind, "getter");
    }

    #[test]
    fn test_functions_and_arrows() {
        let s = js(r#"
function plain(a, b) {}
async function fetchIt(url) {}
function* gen() {}
const arrow = async (x) => x + 1;
let notAFunction = 42;
"#);
        assert_eq!(s.functions.len(), 4);
        assert_eq!(s.functions[0].name, "plain");
        assert_eq!(s.functions[0].parameters, vec!["a", "b"]);
        assert!(s.functions[1].is_async);
        assert!(s.functions[2].is_generator);
        assert_eq!(s.functions[3].name, "arrow");
        assert!(s.functions[3].is_async);
    }

    #[test]
    fn test_call_collection() {
        let s = js(r#"
function run() {
  init();
  api.fetch(url, opts);
  config.db.connect();
}
"#);
        let callees: Vec<&str> = s.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["init", "api.fetch", "config.db.connect"]);
        assert_eq!(s.calls[1].argument_count, 2);
    }

    #[test]
    fn test_typescript_heritage_and_types() {
        let s = ts(r#"
import { Base } from "./base";
export class Derived extends Base {
  value: number;
  compute(input: string, flag?: boolean): number { return 0; }
}
"#);
        let class = &s.classes[0];
        assert_eq!(class.superclass.as_deref(), Some("Base"));
        assert_eq!(class.methods[0].parameters, vec!["input", "flag"]);
    }

    #[test]
    fn test_ts_retry_with_tsx() {
        // JSX in the content; plain TS grammar errors, TSX succeeds.
        let s = ts(r#"
export function App() {
  return <div className="app">hello</div>;
}
"#);
        assert_eq!(s.functions[0].name, "App");
    }

    #[test]
    fn test_unparseable_is_an_error() {
        let result = extract("class {{{{ %% not javascript", Language::JavaScript);
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }
}
