//! Permanent ignore patterns.
//!
//! Repository rules (`.gitignore` files at every level, plus
//! `.git/info/exclude`) are applied by the walker through
//! `ignore::WalkBuilder`. The patterns held here come from configuration
//! (`.git/`, `node_modules/`, ...) and are applied on top of those rules as
//! an entry filter. They are final: no repository rule can re-include what
//! they exclude.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use thiserror::Error;

/// Errors that can occur while compiling ignore patterns.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("failed to compile ignore patterns for {path}: {source}")]
    Build {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Answers "is this path permanently ignored" for paths under a scan root.
#[derive(Debug, Clone)]
pub struct Matcher {
    root: PathBuf,
    permanent: Gitignore,
}

impl Matcher {
    /// Build a matcher for `root` with the given permanent patterns.
    pub fn new<I, S>(root: &Path, permanent: I) -> Result<Self, MatcherError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(root);
        for line in permanent {
            let line = line.as_ref();
            builder
                .add_line(None, line)
                .map_err(|source| MatcherError::Pattern {
                    pattern: line.to_string(),
                    source,
                })?;
        }
        let permanent = builder.build().map_err(|source| MatcherError::Build {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            permanent,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of permanent patterns.
    pub fn len(&self) -> usize {
        self.permanent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permanent.is_empty()
    }

    /// Whether `path` itself matches a permanent pattern, assuming every
    /// ancestor directory between the root and `path` has been admitted.
    ///
    /// This is the check the walker performs at each level.
    pub fn is_ignored_entry(&self, path: &Path, is_dir: bool) -> bool {
        path != self.root && self.permanent.matched(path, is_dir).is_ignore()
    }

    /// Whether `path` or any directory between the root and `path` matches a
    /// permanent pattern.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let mut dir = self.root.clone();
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            dir.push(component);
            let last = components.peek().is_none();
            let entry_is_dir = if last { is_dir } else { true };
            if self.is_ignored_entry(&dir, entry_is_dir) {
                return true;
            }
        }
        false
    }
}

/// Find the nearest ancestor of `start` (inclusive) that contains a `.git` directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn matcher(root: &Path) -> Matcher {
        Matcher::new(root, [".git/", "node_modules/", "*.pyc"]).unwrap()
    }

    #[test]
    fn test_permanent_patterns() {
        let m = matcher(Path::new("/repo"));
        assert_eq!(m.len(), 3);

        assert!(m.is_ignored(Path::new("/repo/.git/config"), false));
        assert!(m.is_ignored(Path::new("/repo/web/node_modules"), true));
        assert!(m.is_ignored(Path::new("/repo/web/node_modules/a/b.js"), false));
        assert!(m.is_ignored(Path::new("/repo/pkg/mod.pyc"), false));
        assert!(!m.is_ignored(Path::new("/repo/pkg/mod.py"), false));
    }

    #[test]
    fn test_directory_pattern_needs_directory() {
        let m = matcher(Path::new("/repo"));

        // `.git/` only matches directories; a file named `.git` (worktrees) is kept.
        assert!(!m.is_ignored_entry(Path::new("/repo/.git"), false));
        assert!(m.is_ignored_entry(Path::new("/repo/.git"), true));
    }

    #[test]
    fn test_root_is_never_ignored() {
        let m = Matcher::new(Path::new("/work/build"), ["build/"]).unwrap();
        assert!(!m.is_ignored_entry(Path::new("/work/build"), true));
        assert!(m.is_ignored(Path::new("/work/build/out/build/x.o"), false));
    }

    #[test]
    fn test_paths_outside_root() {
        let m = matcher(Path::new("/repo"));
        assert!(!m.is_ignored(Path::new("/elsewhere/node_modules/x.js"), false));
    }

    #[test]
    fn test_no_patterns() {
        let m = Matcher::new(Path::new("/repo"), Vec::<String>::new()).unwrap();
        assert!(m.is_empty());
        assert!(!m.is_ignored(Path::new("/repo/.git/config"), false));
    }

    #[test]
    fn test_invalid_permanent_pattern() {
        let err = Matcher::new(Path::new("/repo"), ["src/**[/"]).unwrap_err();
        assert!(matches!(err, MatcherError::Pattern { .. }));
    }

    #[test]
    fn test_find_project_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();

        assert_eq!(find_project_root(&root.join("a/b")).as_deref(), Some(root));
        assert_eq!(find_project_root(root).as_deref(), Some(root));

        // a `.git` file does not make a project root
        fs::write(root.join("a/.git"), "gitdir: elsewhere\n").unwrap();
        assert_eq!(find_project_root(&root.join("a/b")).as_deref(), Some(root));
    }
}
