//! Binary detection and coarse file typing.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

/// Number of bytes sampled for binary detection.
const SNIFF_LEN: usize = 1024;

/// Fraction of non-printable bytes above which a file counts as binary.
const BINARY_RATIO: f64 = 0.30;

/// Coarse file type, assigned from extension/filename with a fixed precedence:
/// code first, then markup, data, config, script, web; anything unmatched is text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Code,
    Markup,
    Data,
    Config,
    Script,
    Web,
    Text,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Code => "code",
            FileType::Markup => "markup",
            FileType::Data => "data",
            FileType::Config => "config",
            FileType::Script => "script",
            FileType::Web => "web",
            FileType::Text => "text",
        }
    }
}

const CODE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "py", "rs", "go", "java", "c", "h", "cpp", "hpp",
    "cc", "cs", "rb", "php", "swift", "kt", "scala",
];

const MARKUP_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "adoc", "tex"];

const DATA_EXTENSIONS: &[&str] = &["json", "csv", "tsv", "ndjson", "xml", "sql"];

const CONFIG_EXTENSIONS: &[&str] = &[
    "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties",
];

const SCRIPT_EXTENSIONS: &[&str] = &["sh", "bash", "zsh", "fish", "ps1", "bat", "cmd"];

const WEB_EXTENSIONS: &[&str] = &["html", "htm", "css", "scss", "less", "vue", "svelte"];

/// Classify a path into a coarse [`FileType`] from its extension or filename.
pub fn classify(path: &Path) -> FileType {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            "Dockerfile" | "docker-compose.yml" => return FileType::Config,
            "Makefile" | "makefile" | "Justfile" => return FileType::Script,
            _ => {}
        }
    }

    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FileType::Text;
    };
    let ext = ext.to_lowercase();
    let ext = ext.as_str();

    if CODE_EXTENSIONS.contains(&ext) {
        FileType::Code
    } else if MARKUP_EXTENSIONS.contains(&ext) {
        FileType::Markup
    } else if DATA_EXTENSIONS.contains(&ext) {
        FileType::Data
    } else if CONFIG_EXTENSIONS.contains(&ext) {
        FileType::Config
    } else if SCRIPT_EXTENSIONS.contains(&ext) {
        FileType::Script
    } else if WEB_EXTENSIONS.contains(&ext) {
        FileType::Web
    } else {
        FileType::Text
    }
}

/// Check whether a file looks binary by sampling its first bytes.
///
/// A NUL byte, or more than 30% control characters (excluding tab/LF/CR) in
/// the sample, marks the file as binary. A file that cannot be opened is
/// conservatively treated as binary so the scan never aborts.
pub fn is_binary(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return true;
    };
    let mut buf = [0u8; SNIFF_LEN];
    let n = match file.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return true,
    };
    is_binary_bytes(&buf[..n])
}

pub(crate) fn is_binary_bytes(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let mut control = 0usize;
    for &b in sample {
        if b == 0 {
            return true;
        }
        if b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r' {
            control += 1;
        }
    }
    (control as f64 / sample.len() as f64) > BINARY_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify(Path::new("src/app.ts")), FileType::Code);
        assert_eq!(classify(Path::new("README.md")), FileType::Markup);
        assert_eq!(classify(Path::new("data.json")), FileType::Data);
        assert_eq!(classify(Path::new("settings.yaml")), FileType::Config);
        assert_eq!(classify(Path::new("deploy.sh")), FileType::Script);
        assert_eq!(classify(Path::new("index.html")), FileType::Web);
        assert_eq!(classify(Path::new("notes")), FileType::Text);
        assert_eq!(classify(Path::new("LICENSE.unknown")), FileType::Text);
    }

    #[test]
    fn test_classify_by_filename() {
        assert_eq!(classify(Path::new("Dockerfile")), FileType::Config);
        assert_eq!(classify(Path::new("Makefile")), FileType::Script);
    }

    #[test]
    fn test_binary_nul_byte() {
        assert!(is_binary_bytes(b"hello\0world"));
    }

    #[test]
    fn test_binary_control_ratio() {
        let mut sample = vec![0x01u8; 40];
        sample.extend_from_slice(&[b'a'; 60]);
        assert!(is_binary_bytes(&sample));

        let mut mostly_text = vec![0x01u8; 10];
        mostly_text.extend_from_slice(&[b'a'; 90]);
        assert!(!is_binary_bytes(&mostly_text));
    }

    #[test]
    fn test_text_with_tabs_and_newlines() {
        assert!(!is_binary_bytes(b"col1\tcol2\r\nval1\tval2\n"));
        assert!(!is_binary_bytes(b""));
    }

    #[test]
    fn test_is_binary_on_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0u8, 1, 2, 3]).unwrap();
        assert!(is_binary(f.path()));

        let mut t = tempfile::NamedTempFile::new().unwrap();
        t.write_all(b"plain text content").unwrap();
        assert!(!is_binary(t.path()));
    }

    #[test]
    fn test_unreadable_is_binary() {
        assert!(is_binary(Path::new("/nonexistent/definitely/missing.txt")));
    }
}
