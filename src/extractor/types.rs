//! Structural facts extracted from a single source file.
//!
//! All line numbers are 1-based. Every collection preserves source order.
use serde::Serialize;

/// The structural summary of one file, the unit the symbol registry
/// aggregates over.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeStructure {
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub calls: Vec<CallInfo>,
}

/// One import statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportInfo {
    /// The module specifier as written (`"./utils"`, `"react"`).
    pub source: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Default,
    Named,
    Namespace,
}

/// One binding introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSpecifier {
    pub kind: ImportKind,
    /// The local binding name.
    pub local: String,
    /// The exported name in the source module, when it differs from `local`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Named,
    Default,
    ReExport,
}

/// One exported symbol (or re-export clause).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportInfo {
    pub kind: ExportKind,
    /// Exported name, absent for anonymous default exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What was declared at the export site (`"class"`, `"function"`, `"const"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_type: Option<String>,
    /// Module specifier for `export ... from "..."` re-exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_re_export: Option<String>,
    pub line: usize,
}

/// A class declaration with its inheritance link and methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub line: usize,
    pub methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    /// `"constructor"`, `"method"`, `"getter"` or `"setter"`.
    pub kind: String,
    pub is_static: bool,
    pub is_async: bool,
    pub line: usize,
    pub parameters: Vec<String>,
}

/// A top-level function declaration (or arrow function bound to a const).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub is_async: bool,
    pub is_generator: bool,
    pub line: usize,
    pub parameters: Vec<String>,
}

/// One call site. `callee` keeps dotted member paths (`"api.fetch"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallInfo {
    pub callee: String,
    pub line: usize,
    pub argument_count: usize,
}
