//! File input surface: `(path, content-accessor)` pairs.
//!
//! A selected directory tree is flattened into [`SourceFile`]s carrying a
//! relative, `/`-separated path. Content is read lazily, one file at a
//! time, when the ingestion pipeline reaches it.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::FileReadError;

/// A file selected for ingestion.
#[async_trait]
pub trait SourceFile: Send + Sync {
    /// Relative path inside the selected tree, `/`-separated.
    fn path(&self) -> &str;

    /// Read the full content as text.
    async fn read_content(&self) -> Result<String, FileReadError>;
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskFile {
    relative: String,
    absolute: PathBuf,
}

impl DiskFile {
    pub fn new(relative: impl Into<String>, absolute: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            absolute: absolute.into(),
        }
    }
}

#[async_trait]
impl SourceFile for DiskFile {
    fn path(&self) -> &str {
        &self.relative
    }

    async fn read_content(&self) -> Result<String, FileReadError> {
        // The handle is opened and closed inside tokio::fs::read
        let bytes = tokio::fs::read(&self.absolute)
            .await
            .map_err(|source| FileReadError {
                path: self.relative.clone(),
                source,
            })?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// A file whose content is already in memory.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    path: String,
    content: String,
}

impl MemoryFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
impl SourceFile for MemoryFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn read_content(&self) -> Result<String, FileReadError> {
        Ok(self.content.clone())
    }
}

/// Flatten a directory tree into source files, sorted by relative path.
///
/// Unreadable directory entries are skipped with a warning.
pub fn scan_directory(root: &Path, follow_symlinks: bool) -> Result<Vec<Box<dyn SourceFile>>> {
    if !root.is_dir() {
        bail!("Repository root is not a directory: {}", root.display());
    }

    let mut files: Vec<DiskFile> = Vec::new();

    for entry in WalkDir::new(root).follow_links(follow_symlinks) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(DiskFile::new(rel_str, path));
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files
        .into_iter()
        .map(|f| Box::new(f) as Box<dyn SourceFile>)
        .collect())
}

/// Display label for a selected root: its final path component.
pub fn root_label(root: &Path) -> String {
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| canonical.display().to_string())
}
