//! Which files are worth sending to the model.

use std::fmt;
use std::path::Path;

/// Extensions (lowercase, with dot) of files that are transformed.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".tsx", ".jsx", ".html", ".css", ".java", ".cpp", ".c", ".h", ".rs",
    ".go", ".php", ".rb", ".json", ".yaml", ".yml", ".sql", ".md", ".txt",
];

/// Why a file was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// macOS resource fork or Finder metadata.
    Metadata,
    UnsupportedExtension,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => f.write_str("macOS metadata file"),
            Self::UnsupportedExtension => f.write_str("unsupported extension"),
        }
    }
}

/// Decide whether `path` should be transformed.
pub fn check(path: &Path) -> Result<(), SkipReason> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    if name.starts_with("._") || name == ".DS_Store" {
        return Err(SkipReason::Metadata);
    }

    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(SkipReason::UnsupportedExtension)
    }
}
