//! File classification by name, extension and location.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path};

use crate::config::FileType;

/// Language assigned to files that match nothing in the table.
pub const FALLBACK_LANGUAGE: &str = "text";
/// Category assigned to files that match nothing in the table.
pub const FALLBACK_CATEGORY: &str = "other";

const SOURCE: &str = "source";
const TEST: &str = "test";
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec"];

/// Result of classifying a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub language: &'a str,
    pub category: &'a str,
}

/// Lookup table from file name or `.ext` to language and category.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: HashMap<String, FileType>,
}

impl Classifier {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, FileType)>,
    {
        Self {
            table: entries.into_iter().collect(),
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Classify a path relative to the scan root. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecontexter::classify::Classifier;
    /// use codecontexter::config::FileType;
    /// use std::path::Path;
    ///
    /// let classifier = Classifier::new([(".py".to_string(), FileType::new("python", "source"))]);
    /// let class = classifier.classify(Path::new("src/main.py"));
    /// assert_eq!(class.language, "python");
    /// assert_eq!(classifier.classify(Path::new("data.bin")).language, "text");
    /// ```
    pub fn classify(&self, path: &Path) -> Classification<'_> {
        let class = if let Some(ft) = self.by_name(path) {
            Classification::from(ft)
        } else if is_workflow_yaml(path) {
            Classification {
                language: "yaml",
                category: "ci_cd",
            }
        } else if let Some(ft) = self.by_extension(path) {
            Classification::from(ft)
        } else {
            Classification {
                language: FALLBACK_LANGUAGE,
                category: FALLBACK_CATEGORY,
            }
        };

        if class.category == SOURCE && looks_like_test(path) {
            return Classification {
                category: TEST,
                ..class
            };
        }
        class
    }

    fn by_name(&self, path: &Path) -> Option<&FileType> {
        let name = path.file_name()?.to_str()?;
        self.table
            .get(&name.to_lowercase())
            .or_else(|| self.table.get(name))
    }

    fn by_extension(&self, path: &Path) -> Option<&FileType> {
        let ext = path.extension()?.to_str()?;
        self.table.get(&format!(".{}", ext.to_lowercase()))
    }
}

impl<'a> From<&'a FileType> for Classification<'a> {
    fn from(ft: &'a FileType) -> Self {
        Self {
            language: &ft.language,
            category: &ft.category,
        }
    }
}

fn is_workflow_yaml(path: &Path) -> bool {
    let in_workflows = path
        .components()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| {
            w[0] == Component::Normal(OsStr::new(".github"))
                && w[1] == Component::Normal(OsStr::new("workflows"))
        });
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    );
    in_workflows && yaml
}

fn looks_like_test(path: &Path) -> bool {
    let in_test_dir = path
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .any(|c| match c {
            Component::Normal(dir) => dir.to_str().is_some_and(|d| TEST_DIRS.contains(&d)),
            _ => false,
        });
    if in_test_dir {
        return true;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let stem = name.split('.').next().unwrap_or(name);
    name.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
}
