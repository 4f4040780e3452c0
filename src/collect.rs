//! Per-file statistics.
//!
//! Each admitted file is read once; size, line count, body and (optionally)
//! the SHA-256 digest all come from the same bytes. Failures never abort a
//! run: they are recorded on the [`FileRecord`] and rendered inline.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};

use crate::classify::Classifier;
use crate::walker::WalkEntry;

/// How many leading bytes are inspected for NUL when sniffing binary files.
const SNIFF_LEN: usize = 8192;

/// Contents of a file as far as the report is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    /// UTF-8 text, exactly as read.
    Text(String),
    /// Non-text content; only the size is reported.
    Binary,
    /// The file could not be read.
    Unreadable(String),
}

impl FileBody {
    pub fn is_readable(&self) -> bool {
        !matches!(self, FileBody::Unreadable(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FileBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Everything the report needs to know about one file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Full path on disk.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
    pub size: u64,
    /// `None` for binary and unreadable files.
    pub lines: Option<usize>,
    pub language: String,
    pub category: String,
    pub modified: Option<DateTime<Local>>,
    /// Lowercase hex SHA-256 of the raw bytes, when hashing is enabled and the read succeeded.
    pub hash: Option<String>,
    pub body: FileBody,
}

impl FileRecord {
    /// Relative path with `/` separators on every platform.
    pub fn display_path(&self) -> String {
        display_path(&self.relative)
    }

    pub fn is_readable(&self) -> bool {
        self.body.is_readable()
    }
}

/// Options for stat collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Compute a SHA-256 digest per file.
    pub include_hash: bool,
}

/// Build the record for one walked file.
pub fn collect_file(entry: &WalkEntry, classifier: &Classifier, options: CollectOptions) -> FileRecord {
    let class = classifier.classify(&entry.relative);
    let metadata = fs::metadata(&entry.path).ok();
    let modified = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Local>::from);

    let mut record = FileRecord {
        path: entry.path.clone(),
        relative: entry.relative.clone(),
        size: metadata.as_ref().map_or(0, |m| m.len()),
        lines: None,
        language: class.language.to_string(),
        category: class.category.to_string(),
        modified,
        hash: None,
        body: FileBody::Binary,
    };

    let bytes = match fs::read(&entry.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %entry.path.display(), "could not read file: {e}");
            record.body = FileBody::Unreadable(e.to_string());
            return record;
        }
    };

    record.size = bytes.len() as u64;
    if options.include_hash {
        record.hash = Some(sha256_hex(&bytes));
    }

    if is_binary(&bytes) {
        return record;
    }
    match String::from_utf8(bytes) {
        Ok(text) => {
            record.lines = Some(count_lines(text.as_bytes()));
            record.body = FileBody::Text(text);
        }
        Err(_) => {
            tracing::debug!(path = %entry.path.display(), "not valid UTF-8, treating as binary");
        }
    }

    record
}

/// Number of `\n` terminators, plus one for a non-empty unterminated last line.
pub fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytecount::count(bytes, b'\n');
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(SNIFF_LEN)].contains(&0)
}

/// Render a relative path with `/` separators.
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
