//! Local file system source matched by glob pattern.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::models::Document;
use crate::utils::file::{is_text_file, read_file_content};

/// Reads every text file matching a glob pattern (or under a directory).
#[derive(Debug, Clone)]
pub struct GlobSource {
    pattern: String,
    max_file_size: u64,
}

impl GlobSource {
    pub fn new(pattern: impl Into<String>, max_file_size: u64) -> Self {
        Self {
            pattern: pattern.into(),
            max_file_size,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Resolve the pattern to a sorted list of candidate files.
    ///
    /// A pattern naming an existing directory is walked recursively.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        let root = Path::new(&self.pattern);
        let mut paths = Vec::new();

        if root.is_dir() {
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = entry.map_err(|e| SourceError::InvalidPattern(e.to_string()))?;
                if entry.file_type().is_file() {
                    paths.push(entry.into_path());
                }
            }
        } else {
            let matches = glob::glob(&self.pattern)
                .map_err(|e| SourceError::InvalidPattern(format!("{}: {}", self.pattern, e)))?;
            for entry in matches {
                match entry {
                    Ok(path) if path.is_file() => paths.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "skipping unreadable match"),
                }
            }
        }

        paths.retain(|p| {
            let keep = is_text_file(p);
            if !keep {
                debug!(path = %p.display(), "skipping non-text file");
            }
            keep
        });
        paths.sort();
        Ok(paths)
    }

    /// Lazily read every matched file.
    ///
    /// Files that cannot be read as UTF-8 within the size limit are logged and
    /// skipped; they never become documents.
    pub fn documents(
        &self,
    ) -> Result<impl Iterator<Item = Document> + Send + 'static, SourceError> {
        let paths = self.collect_paths()?;
        let max_file_size = self.max_file_size;

        Ok(paths
            .into_iter()
            .filter_map(move |path| match read_document(&path, max_file_size) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(error = %e, "skipping input file");
                    None
                }
            }))
    }
}

fn read_document(path: &Path, max_file_size: u64) -> Result<Document, SourceError> {
    let text = read_file_content(path, max_file_size).map_err(|e| SourceError::ReadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Document::new(path.to_string_lossy(), text))
}
