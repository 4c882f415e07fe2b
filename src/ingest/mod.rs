//! Ingest pipeline: discover text files and split them into chunks for indexing.

mod chunker;

pub use chunker::TextChunker;

use crate::error::{Result, SvarError};
use std::path::{Path, PathBuf};

/// File extensions treated as ingestable text.
const TEXT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Collect ingestable text files from the given paths.
///
/// Files are returned as-is; directories are walked recursively. Hidden
/// entries are skipped. The result is sorted for a stable ingest order.
pub fn collect_text_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if !is_text_file(path) {
                return Err(SvarError::InvalidInput(format!(
                    "Unsupported file type: {} (expected one of: {})",
                    path.display(),
                    TEXT_EXTENSIONS.join(", ")
                )));
            }
            files.push(path.clone());
        } else if path.is_dir() {
            collect_from_dir(path, &mut files)?;
        } else {
            return Err(SvarError::InvalidInput(format!(
                "Path not found: {}",
                path.display()
            )));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_from_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let hidden = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        if path.is_dir() {
            collect_from_dir(&path, files)?;
        } else if is_text_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Source identifier for an ingested file: the path as given.
pub fn source_label(path: &Path) -> String {
    path.display().to_string()
}

/// Display title for an ingested file: the file stem.
pub fn source_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("untitled")
        .to_string()
}
