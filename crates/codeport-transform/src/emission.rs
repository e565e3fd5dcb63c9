//! Parsing model output into files.
//!
//! Two shapes are recognised. A multi-file emission is a sequence of
//! `### FILE: <path>` markers, each followed by that file's content. Anything
//! else is a single rewritten file. Either may wrap content in a markdown
//! fence, which is stripped.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

/// Marker opening one file of a multi-file emission.
pub const FILE_MARKER: &str = "### FILE:";

/// Text marking a refused request.
pub const REFUSAL_MARKER: &str = "I cannot assist";

static FILE_MARKER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"### FILE:[ \t]*([^\n]+)\n").ok());

/// One file of a multi-file emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Relative path as written by the model.
    pub path: String,
    pub content: String,
}

/// Split a multi-file emission.
///
/// Returns `None` when `raw` has no file markers. Unsafe paths are dropped
/// with a warning, so the result may be empty.
pub fn parse_multi_file(raw: &str) -> Option<Vec<EmittedFile>> {
    let re = FILE_MARKER_RE.as_ref()?;

    let markers: Vec<_> = re
        .captures_iter(raw)
        .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?.as_str().trim().to_string())))
        .collect();
    if markers.is_empty() {
        return None;
    }

    let mut files = Vec::with_capacity(markers.len());
    for (idx, (marker, path)) in markers.iter().enumerate() {
        let end = markers
            .get(idx + 1)
            .map_or(raw.len(), |(next, _)| next.start());
        let segment = &raw[marker.end()..end];
        // The newline before the next marker separates files
        let segment = if idx + 1 < markers.len() {
            segment
                .strip_suffix('\n')
                .map_or(segment, |s| s.strip_suffix('\r').unwrap_or(s))
        } else {
            segment
        };

        if !is_safe_path(path) {
            tracing::warn!(path = %path, "Skipping unsafe filename");
            continue;
        }

        files.push(EmittedFile {
            path: path.clone(),
            content: strip_fence(segment),
        });
    }
    Some(files)
}

/// Whether an emitted path stays inside the job directory.
///
/// Rejects `..` anywhere, absolute paths, drive prefixes and empty names.
pub fn is_safe_path(path: &str) -> bool {
    if path.is_empty() || path.contains("..") || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Remove a surrounding markdown fence, if the text starts with one.
///
/// The opening fence line (with any language tag) is dropped, and the last
/// line too when it is a closing fence. Text without a leading fence is
/// returned unchanged.
pub fn strip_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    lines.remove(0);
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}

/// Clean a single-file response.
///
/// Returns `None` when nothing usable is left: empty after fence stripping,
/// or containing the refusal marker.
pub fn clean_single(raw: &str) -> Option<String> {
    let cleaned = strip_fence(raw.trim());
    let cleaned = cleaned.trim_matches('\n');
    if cleaned.trim().is_empty() || cleaned.contains(REFUSAL_MARKER) {
        None
    } else {
        Some(cleaned.to_string())
    }
}
