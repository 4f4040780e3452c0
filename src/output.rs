//! Markdown report rendering.
//!
//! The report has a fixed layout:
//!
//! 1. header (repository name, generation time, source directory)
//! 2. statistics (totals plus per-category and per-language tables)
//! 3. optional per-file metadata table
//! 4. table of contents linking to each file section
//! 5. one section per file with its contents in a fenced code block
//!
//! Files appear in the order they are given, which is walk order.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::collect::{FileBody, FileRecord};
use crate::stats::{GroupTotals, RunStatistics};

/// Errors that can occur while writing the report.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options controlling what to include in the report.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Include the per-file metadata table.
    pub include_metadata_table: bool,
    /// Include a SHA-256 line in each file section.
    pub include_hash: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            include_metadata_table: true,
            include_hash: false,
        }
    }
}

/// Identifies the scanned tree in the report header.
#[derive(Debug, Clone)]
pub struct ReportHeader {
    /// Base name of the scanned directory.
    pub name: String,
    /// Directory as shown to the reader.
    pub source_dir: PathBuf,
    pub generated_at: DateTime<Local>,
}

impl ReportHeader {
    /// Header for `dir`, stamped with the current time.
    pub fn for_dir(dir: &Path) -> Self {
        Self::at(dir, Local::now())
    }

    pub fn at(dir: &Path, generated_at: DateTime<Local>) -> Self {
        let name = dir.file_name().map_or_else(
            || dir.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        );
        Self {
            name,
            source_dir: dir.to_path_buf(),
            generated_at,
        }
    }
}

const STATISTICS_HEADING: &str = "📊 Statistics";
const BY_CATEGORY_HEADING: &str = "By Category";
const BY_LANGUAGE_HEADING: &str = "By Language";
const METADATA_HEADING: &str = "📋 File Metadata";
const TOC_HEADING: &str = "📑 Table of Contents";
const CONTENTS_HEADING: &str = "📄 File Contents";
const RULE: &str = "---\n\n";

/// Follows the closing fence of a file whose last line has no newline.
/// The line break before that fence is not part of the file.
pub const NO_NEWLINE_MARKER: &str = "_No newline at end of file._";

// ============================================================================
// Main Entry Point
// ============================================================================

/// Render the complete report.
pub fn render_report(
    header: &ReportHeader,
    records: &[FileRecord],
    stats: &RunStatistics,
    options: &OutputOptions,
) -> String {
    let capacity = records
        .iter()
        .filter_map(|r| r.body.text())
        .map(str::len)
        .sum::<usize>()
        + 8192;
    let mut output = String::with_capacity(capacity);

    let title = format!("📦 Code Summary: {}", header.name);
    let anchors = plan_anchors(&title, records, options);

    let _ = write!(output, "# {}\n\n", title);
    let _ = write!(
        output,
        "**Generated:** {}\n\n",
        header.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = write!(
        output,
        "**Source Directory:** `{}`\n\n",
        header.source_dir.display()
    );
    output.push_str(RULE);

    output.push_str(&format_statistics(stats));
    output.push('\n');
    output.push_str(RULE);

    if options.include_metadata_table {
        let _ = write!(output, "## {}\n\n", METADATA_HEADING);
        output.push_str(&format_metadata_table(records));
        output.push('\n');
        output.push_str(RULE);
    }

    let _ = write!(output, "## {}\n\n", TOC_HEADING);
    for (record, anchor) in records.iter().zip(&anchors) {
        let _ = writeln!(output, "- [{}](#{})", code_span(&record.display_path()), anchor);
    }
    output.push('\n');
    output.push_str(RULE);

    let _ = write!(output, "## {}\n\n", CONTENTS_HEADING);
    for record in records {
        output.push_str(&format_file_section(record, options));
        output.push_str(RULE);
    }

    output
}

/// Write `contents` to `path` without ever leaving a half-written file there.
///
/// The report is written to a temporary file next to `path` and renamed into
/// place, so an existing report survives a failed write.
pub fn write_report(path: &Path, contents: &str) -> Result<(), OutputError> {
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

// ============================================================================
// Sections
// ============================================================================

fn format_statistics(stats: &RunStatistics) -> String {
    let mut out = String::with_capacity(1024);

    let _ = write!(out, "## {}\n\n", STATISTICS_HEADING);
    let _ = writeln!(out, "- **Total Files:** {}", format_number(stats.total_files));
    let _ = writeln!(
        out,
        "- **Total Lines of Code:** {}",
        format_number(stats.total_lines)
    );
    let _ = writeln!(out, "- **Total Size:** {}", format_size(stats.total_size));
    if stats.unreadable > 0 {
        let _ = writeln!(out, "- **Unreadable Files:** {}", format_number(stats.unreadable));
    }
    out.push('\n');

    let _ = write!(out, "### {}\n\n", BY_CATEGORY_HEADING);
    out.push_str(&format_group_table("Category", &stats.categories_ranked()));
    out.push('\n');

    let _ = write!(out, "### {}\n\n", BY_LANGUAGE_HEADING);
    out.push_str(&format_group_table("Language", &stats.languages_ranked()));

    out
}

fn format_group_table(label: &str, rows: &[(&str, GroupTotals)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| {} | Files | Lines | Size |", label);
    out.push_str("|---|---:|---:|---:|\n");
    for (name, totals) in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            escape_cell(name),
            format_number(totals.files),
            format_number(totals.lines),
            format_size(totals.size)
        );
    }
    out
}

fn format_metadata_table(records: &[FileRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 96 + 128);
    out.push_str("| File | Size | Lines | Type | Category | Last Modified |\n");
    out.push_str("|------|------|-------|------|----------|---------------|\n");

    for record in records {
        let modified = record
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            escape_cell(&code_span(&record.display_path())),
            format_size(record.size),
            format_lines(record.lines),
            record.language,
            record.category,
            modified
        );
    }

    out
}

fn format_file_section(record: &FileRecord, options: &OutputOptions) -> String {
    let mut out = String::with_capacity(record.body.text().map_or(0, str::len) + 256);

    let _ = write!(out, "### {}\n\n", file_heading(record));
    let _ = write!(
        out,
        "**Language:** {} | **Size:** {} | **Lines:** {} | **Category:** {}\n\n",
        record.language,
        format_size(record.size),
        format_lines(record.lines),
        record.category
    );

    if options.include_hash {
        match &record.hash {
            Some(hash) => {
                let _ = write!(out, "**Hash (SHA-256):** `{}`\n\n", hash);
            }
            None => out.push_str("**Hash (SHA-256):** _unavailable_\n\n"),
        }
    }

    match &record.body {
        FileBody::Text(content) => {
            let fence = fence_for(content);
            let _ = writeln!(out, "{}{}", fence, record.language);
            out.push_str(content);
            let unterminated = !content.is_empty() && !content.ends_with('\n');
            if unterminated {
                out.push('\n');
            }
            let _ = write!(out, "{}\n\n", fence);
            if unterminated {
                let _ = write!(out, "{}\n\n", NO_NEWLINE_MARKER);
            }
        }
        FileBody::Binary => out.push_str("_Binary file: contents omitted._\n\n"),
        FileBody::Unreadable(reason) => {
            let _ = write!(out, "> ⚠ Could not read file: {}\n\n", reason);
        }
    }

    out
}

fn file_heading(record: &FileRecord) -> String {
    format!("File: {}", code_span(&record.display_path()))
}

// ============================================================================
// Anchors
// ============================================================================

/// Generates GitHub-style heading anchors, suffixing repeats with `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor for the next heading with this text.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecontexter::output::Slugger;
    ///
    /// let mut slugger = Slugger::new();
    /// assert_eq!(slugger.slug("File: `src/main.py`"), "file-srcmainpy");
    /// assert_eq!(slugger.slug("File: `srcmain.py`"), "file-srcmainpy-1");
    /// ```
    pub fn slug(&mut self, heading: &str) -> String {
        let base = slugify(heading);
        let mut slug = base.clone();
        while self.seen.contains_key(&slug) {
            let count = self.seen.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{}-{}", base, count);
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }
}

fn slugify(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Anchors for each file section, accounting for every heading that
/// precedes it in the document.
fn plan_anchors(title: &str, records: &[FileRecord], options: &OutputOptions) -> Vec<String> {
    let mut slugger = Slugger::new();
    slugger.slug(title);
    slugger.slug(STATISTICS_HEADING);
    slugger.slug(BY_CATEGORY_HEADING);
    slugger.slug(BY_LANGUAGE_HEADING);
    if options.include_metadata_table {
        slugger.slug(METADATA_HEADING);
    }
    slugger.slug(TOC_HEADING);
    slugger.slug(CONTENTS_HEADING);

    records
        .iter()
        .map(|r| slugger.slug(&file_heading(r)))
        .collect()
}

// ============================================================================
// Formatting helpers
// ============================================================================

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    "`".repeat((longest_backtick_run(content) + 1).max(3))
}

/// Inline code span that survives backticks in `text`.
fn code_span(text: &str) -> String {
    let ticks = "`".repeat(longest_backtick_run(text) + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn format_lines(lines: Option<usize>) -> String {
    lines.map_or_else(|| "-".to_string(), format_number)
}

/// Format a byte count with one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

/// Format number with thousands separators.
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
