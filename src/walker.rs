//! Directory traversal with layered ignore rules.
//!
//! Traversal is delegated to `ignore::WalkBuilder`. The walk is depth-first
//! with the entries of each directory sorted by file name, so a given tree
//! always yields files in the same order. Every directory's `.gitignore` is
//! honoured for its subtree. Inside a git repository the `.gitignore` files
//! of directories above the root (up to the repository root) and the
//! repository's `.git/info/exclude` apply as well. The permanent patterns of
//! the [`Matcher`] are applied as an entry filter on top of those rules.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use thiserror::Error;

use crate::matcher::{find_project_root, Matcher};

/// Errors that can occur during directory walking.
///
/// Errors for the root are fatal; errors for anything below it are yielded
/// as items and the walk continues.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("broken symlink: {path}")]
    BrokenSymlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("traversal error at {path}: {source}")]
    Traverse {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

impl WalkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => WalkError::NotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => WalkError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => WalkError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    fn from_ignore(err: ignore::Error, root: &Path) -> Self {
        let path = error_path(&err).unwrap_or(root).to_path_buf();
        let kind = err.io_error().map(|e| e.kind());
        match kind {
            Some(std::io::ErrorKind::NotFound) => WalkError::NotFound { path },
            Some(std::io::ErrorKind::PermissionDenied) => WalkError::PermissionDenied { path },
            _ => WalkError::Traverse { path, source: err },
        }
    }

    /// Path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            WalkError::NotFound { path }
            | WalkError::NotADirectory { path }
            | WalkError::PermissionDenied { path }
            | WalkError::Io { path, .. }
            | WalkError::BrokenSymlink { path, .. }
            | WalkError::Traverse { path, .. } => path,
        }
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        ignore::Error::Loop { child, .. } => Some(child),
        _ => None,
    }
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Respect `.gitignore` files and `.git/info/exclude`.
    pub respect_gitignore: bool,
    /// Files that are never yielded (e.g. the report being written).
    pub skip_paths: Vec<PathBuf>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            skip_paths: Vec::new(),
        }
    }
}

impl WalkOptions {
    /// Never yield `path`.
    pub fn skip(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_paths.push(path.into());
        self
    }
}

/// A file admitted by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// Depth from root (files directly in the root have depth 1).
    pub depth: usize,
}

/// Lazy iterator over the files under a root. Created by [`walk_with_options`].
pub struct Walk {
    root: PathBuf,
    inner: Option<ignore::Walk>,
    skip_paths: Vec<PathBuf>,
    pending: Option<WalkError>,
}

/// Walk `root` with the default options.
pub fn walk(root: &Path, matcher: Matcher) -> Walk {
    walk_with_options(root, matcher, WalkOptions::default())
}

/// Walk `root`, skipping everything `matcher` ignores permanently.
pub fn walk_with_options(root: &Path, matcher: Matcher, options: WalkOptions) -> Walk {
    let mut walk = Walk {
        root: root.to_path_buf(),
        inner: None,
        skip_paths: Vec::new(),
        pending: None,
    };

    match fs::metadata(root) {
        Err(e) => walk.pending = Some(WalkError::io(root, e)),
        Ok(meta) if !meta.is_dir() => {
            walk.pending = Some(WalkError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Ok(_) => {
            walk.inner = Some(walk_builder(root, matcher, options.respect_gitignore).build());
            walk.skip_paths = options.skip_paths;
        }
    }

    walk
}

fn walk_builder(root: &Path, matcher: Matcher, respect_gitignore: bool) -> WalkBuilder {
    // Outside a repository only the root's own subtree has ignore files that count.
    let in_repo = find_project_root(root).is_some();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .git_global(false)
        .git_ignore(respect_gitignore)
        .git_exclude(respect_gitignore)
        .parents(respect_gitignore && in_repo)
        .require_git(in_repo)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let ignored = matcher.is_ignored_entry(entry.path(), is_dir(entry));
            if ignored {
                tracing::trace!(path = %entry.path().display(), "permanently ignored");
            }
            !ignored
        });
    builder
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
}

/// Symlinked files are read through; symlinked directories are never followed.
fn admit_symlink(path: &Path) -> Result<bool, WalkError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(meta) if meta.is_dir() => {
            tracing::debug!(path = %path.display(), "not following directory symlink");
            Ok(false)
        }
        Ok(_) => Ok(false),
        Err(source) => Err(WalkError::BrokenSymlink {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn walk_entry(root: &Path, entry: DirEntry) -> WalkEntry {
    let depth = entry.depth();
    let path = entry.into_path();
    let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
    WalkEntry {
        path,
        relative,
        depth,
    }
}

impl Iterator for Walk {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        let inner = self.inner.as_mut()?;

        loop {
            let entry = match inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(WalkError::from_ignore(e, &self.root))),
            };
            if let Some(err) = entry.error() {
                tracing::warn!("ignore file in {} only partly applied: {}", entry.path().display(), err);
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            let admitted = if file_type.is_file() {
                true
            } else if file_type.is_symlink() {
                match admit_symlink(entry.path()) {
                    Ok(admitted) => admitted,
                    Err(e) => return Some(Err(e)),
                }
            } else {
                false
            };
            if !admitted || self.skip_paths.iter().any(|p| p == entry.path()) {
                continue;
            }
            return Some(Ok(walk_entry(&self.root, entry)));
        }
    }
}
