//! Per-language structural extraction.
//!
//! JavaScript and TypeScript go through tree-sitter; Python through a
//! line-oriented extractor. Extraction failure degrades a file (it keeps its
//! chunks) rather than failing the run.
pub mod ecmascript;
pub mod language;
pub mod python;
pub mod types;

use std::path::Path;

use thiserror::Error;

pub use language::Language;
pub use types::{
    CallInfo, ClassInfo, CodeStructure, ExportInfo, ExportKind, FunctionInfo, ImportInfo,
    ImportKind, ImportSpecifier, MethodInfo,
};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("parse failed: {0}")]
    Parse(&'static str),

    #[error("grammar initialization failed: {0}")]
    Grammar(String),
}

/// Extract the structural summary of a file. `Ok(None)` means the language is
/// unsupported and the file carries no structure, which is not an error.
pub fn extract_structure(
    path: &Path,
    content: &str,
) -> Result<Option<CodeStructure>, ExtractError> {
    let Some(language) = language::detect(path, content) else {
        return Ok(None);
    };
    let structure = match language {
        Language::JavaScript | Language::TypeScript => ecmascript::extract(content, language)?,
        Language::Python => python::extract(content),
    };
    Ok(Some(structure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_language() {
        let js = extract_structure(Path::new("a.js"), "export function f() {}")
            .unwrap()
            .unwrap();
        assert_eq!(js.functions[0].name, "f");

        let py = extract_structure(Path::new("a.py"), "def f():\n    pass\n")
            .unwrap()
            .unwrap();
        assert_eq!(py.functions[0].name, "f");
    }

    #[test]
    fn test_unsupported_language_is_none() {
        assert!(
            extract_structure(Path::new("a.rb"), "def f; end")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_parse_failure_is_error() {
        let result = extract_structure(Path::new("bad.js"), "function ((( {{{");
        assert!(result.is_err());
    }
}
