//! Zip extraction into a job directory and repacking.
//!
//! Both directions are blocking; async callers run them on the blocking pool.

use std::fs::{self, File};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::TransformError;

/// Name of the archive handed back to callers.
pub const OUTPUT_ARCHIVE_NAME: &str = "converted_project.zip";

/// Extract `bytes` into `dest`, returning the number of files written.
///
/// Fails on the first entry whose path would escape `dest`.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<usize, TransformError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    fs::create_dir_all(dest).map_err(|e| TransformError::io(dest, e))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| TransformError::UnsafeEntry(entry.name().to_string()))?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| TransformError::io(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TransformError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| TransformError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| TransformError::io(&target, e))?;
        written += 1;
    }

    tracing::debug!(files = written, dest = %dest.display(), "Extracted archive");
    Ok(written)
}

/// Every regular file under `root`, sorted, as absolute paths.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, TransformError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| TransformError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `path` relative to `root`, with `/` separators.
pub fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pack every file under `root` into a deflated zip.
pub fn pack_dir(root: &Path) -> Result<Vec<u8>, TransformError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in list_files(root)? {
        let name = relative_name(root, &path);
        let content = fs::read(&path).map_err(|e| TransformError::io(&path, e))?;
        writer.start_file(name, options)?;
        writer
            .write_all(&content)
            .map_err(|e| TransformError::io(&path, e))?;
    }

    Ok(writer.finish()?.into_inner())
}
