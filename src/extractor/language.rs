//! Language detection for structural extraction.
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

/// Detect the language of a file from its extension, falling back to the
/// shebang line for extensionless scripts. `None` means unsupported.
pub fn detect(path: &Path, content: &str) -> Option<Language> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "py" => Some(Language::Python),
            _ => None,
        };
    }

    let first_line = content.lines().next().unwrap_or("");
    if first_line.starts_with("#!") {
        if first_line.contains("node") {
            return Some(Language::JavaScript);
        }
        if first_line.contains("python") {
            return Some(Language::Python);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect(Path::new("a.js"), ""), Some(Language::JavaScript));
        assert_eq!(detect(Path::new("a.jsx"), ""), Some(Language::JavaScript));
        assert_eq!(detect(Path::new("a.mjs"), ""), Some(Language::JavaScript));
        assert_eq!(detect(Path::new("a.ts"), ""), Some(Language::TypeScript));
        assert_eq!(detect(Path::new("a.tsx"), ""), Some(Language::TypeScript));
        assert_eq!(detect(Path::new("a.py"), ""), Some(Language::Python));
        assert_eq!(detect(Path::new("a.rb"), ""), None);
    }

    #[test]
    fn test_detect_by_shebang() {
        assert_eq!(
            detect(Path::new("cli"), "#!/usr/bin/env node\nconsole.log(1);"),
            Some(Language::JavaScript)
        );
        assert_eq!(
            detect(Path::new("tool"), "#!/usr/bin/env python3\nprint(1)"),
            Some(Language::Python)
        );
        assert_eq!(detect(Path::new("script"), "#!/bin/sh\necho hi"), None);
        assert_eq!(detect(Path::new("plain"), "no shebang"), None);
    }

    #[test]
    fn test_extension_wins_over_shebang() {
        assert_eq!(
            detect(Path::new("a.py"), "#!/usr/bin/env node"),
            Some(Language::Python)
        );
    }
}
