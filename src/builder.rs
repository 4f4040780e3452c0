//! Fluent builder API for codecontexter.
//!
//! Wires the walker, classifier and collector together and produces a
//! [`Scan`] that can be rendered into a report.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::classify::Classifier;
use crate::collect::{collect_file, CollectOptions, FileRecord};
use crate::config::Config;
use crate::errors::ContexterError;
use crate::matcher::{find_project_root, Matcher};
use crate::output::{render_report, OutputOptions, ReportHeader};
use crate::progress::{PlainProgress, ProgressReporter};
use crate::stats::RunStatistics;
use crate::walker::{walk_with_options, WalkEntry, WalkOptions};

/// Builder for scanning a codebase.
///
/// # Examples
///
/// ```no_run
/// use codecontexter::builder::Contexter;
///
/// let scan = Contexter::new("./project")
///     .include_hash(true)
///     .build()
///     .unwrap();
///
/// println!("{} files, {} lines", scan.stats.total_files, scan.stats.total_lines);
/// ```
pub struct Contexter {
    root: PathBuf,
    config: Option<Config>,
    include_hash: bool,
    respect_gitignore: bool,
    jobs: Option<usize>,
    skip_paths: Vec<PathBuf>,
}

impl Contexter {
    /// Create a new builder for the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
            include_hash: false,
            respect_gitignore: true,
            jobs: None,
            skip_paths: Vec::new(),
        }
    }

    /// Use this configuration instead of the built-in one.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Compute a SHA-256 digest for each file.
    pub fn include_hash(mut self, include: bool) -> Self {
        self.include_hash = include;
        self
    }

    /// Honour `.gitignore` files and `.git/info/exclude` (default: true).
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Number of worker threads for stat collection.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Never include `path` in the scan (e.g. the report being written).
    pub fn skip(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    /// Scan without progress reporting.
    pub fn build(self) -> Result<Scan, ContexterError> {
        self.scan(&PlainProgress::silent())
    }

    /// Scan, notifying `progress` as files are collected.
    pub fn scan(self, progress: &dyn ProgressReporter) -> Result<Scan, ContexterError> {
        let root = resolve_root(&self.root)?;
        let config = match self.config {
            Some(config) => config,
            None => Config::builtin()?,
        };

        let project_root = find_project_root(&root).unwrap_or_else(|| {
            tracing::warn!(
                "no .git directory found above {}; using it as the project root",
                root.display()
            );
            root.clone()
        });
        tracing::debug!(root = %root.display(), project_root = %project_root.display(), "scanning");

        let matcher = Matcher::new(&root, &config.ignore.always)?;
        let classifier = Classifier::new(config.filetypes);
        let walk_options = WalkOptions {
            respect_gitignore: self.respect_gitignore,
            skip_paths: self.skip_paths.iter().map(|p| normalize(p)).collect(),
        };

        let mut entries: Vec<WalkEntry> = Vec::new();
        let mut walk_errors = 0;
        for item in walk_with_options(&root, matcher, walk_options) {
            match item {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", e.path().display(), e);
                    walk_errors += 1;
                }
            }
        }
        tracing::debug!(files = entries.len(), "walk complete");

        let options = CollectOptions {
            include_hash: self.include_hash,
        };
        progress.start(entries.len());
        let records = match self.jobs {
            Some(jobs) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .map_err(|e| ContexterError::Io(std::io::Error::other(e.to_string())))?;
                pool.install(|| collect_parallel(&entries, &classifier, options, progress))
            }
            None => collect_parallel(&entries, &classifier, options, progress),
        };
        progress.finish();

        let stats = RunStatistics::from_records(&records);
        Ok(Scan {
            root,
            project_root,
            records,
            stats,
            walk_errors,
        })
    }
}

/// Result of a scan.
#[derive(Debug)]
pub struct Scan {
    /// Canonical scan root.
    pub root: PathBuf,
    /// Directory whose `.git` anchors the ignore rules.
    pub project_root: PathBuf,
    /// One record per included file, in walk order.
    pub records: Vec<FileRecord>,
    pub stats: RunStatistics,
    /// Directories or entries skipped because of traversal errors.
    pub walk_errors: usize,
}

impl Scan {
    /// Render the report stamped with the current time.
    pub fn render(&self, options: &OutputOptions) -> String {
        self.render_with_header(&ReportHeader::for_dir(&self.root), options)
    }

    pub fn render_with_header(&self, header: &ReportHeader, options: &OutputOptions) -> String {
        render_report(header, &self.records, &self.stats, options)
    }

    /// Record for a path relative to the scan root.
    pub fn record(&self, relative: &Path) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.relative == relative)
    }
}

/// Collect records in parallel; the indexed iterator keeps walk order.
fn collect_parallel(
    entries: &[WalkEntry],
    classifier: &Classifier,
    options: CollectOptions,
    progress: &dyn ProgressReporter,
) -> Vec<FileRecord> {
    entries
        .par_iter()
        .map(|entry| {
            let record = collect_file(entry, classifier, options);
            progress.file_done(&record);
            record
        })
        .collect()
}

fn resolve_root(root: &Path) -> Result<PathBuf, ContexterError> {
    let canonical = root.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ContexterError::PathNotFound(root.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ContexterError::PermissionDenied(root.to_path_buf()),
        _ => ContexterError::Io(e),
    })?;
    if !canonical.is_dir() {
        return Err(ContexterError::NotADirectory(root.to_path_buf()));
    }
    Ok(canonical)
}

/// Canonical form of a path that may not exist yet.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}
