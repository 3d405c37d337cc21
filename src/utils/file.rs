//! File helpers for the source reader.

use std::fs;
use std::io::Read;
use std::path::Path;

/// Check if a file is likely a text file.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if is_binary_extension(&ext) {
            return false;
        }
        if is_text_extension(&ext) {
            return true;
        }
    }

    // Unknown extension: sniff the first bytes for NULs
    if let Ok(file) = fs::File::open(path) {
        let mut buffer = [0u8; 512];
        let mut reader = std::io::BufReader::new(file);
        if let Ok(n) = reader.read(&mut buffer) {
            return !buffer[..n].contains(&0);
        }
    }

    false
}

/// Read a UTF-8 file, refusing anything larger than `max_size` bytes.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read_to_string(path)
}

fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "o"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "webp"
            | "mp3"
            | "mp4"
            | "wav"
            | "zip"
            | "tar"
            | "gz"
            | "7z"
            | "pdf"
            | "docx"
            | "xlsx"
            | "pptx"
            | "sqlite"
            | "bin"
            | "parquet"
    )
}

fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt" | "md" | "markdown" | "rst" | "adoc" | "org"
            | "html" | "htm" | "xml" | "json" | "jsonl" | "csv" | "tsv"
            | "yaml" | "yml" | "toml"
    )
}
