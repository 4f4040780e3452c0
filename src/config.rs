//! Static configuration: the classification table and permanent ignore patterns.
//!
//! The built-in defaults are embedded from `defaults.toml`. A user file can be
//! layered on top with [`Config::merge`]; its file types replace entries with
//! the same key and its ignore patterns are appended.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const DEFAULTS: &str = include_str!("defaults.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Language and category assigned to a file name or extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileType {
    pub language: String,
    pub category: String,
}

impl FileType {
    pub fn new(language: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            category: category.into(),
        }
    }
}

/// Patterns that are ignored regardless of repository ignore files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    pub always: Vec<String>,
}

/// Full configuration for a run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ignore: IgnoreConfig,
    /// Keyed by exact file name (`Makefile`) or extension with a leading dot (`.py`).
    pub filetypes: BTreeMap<String, FileType>,
}

impl Config {
    /// The built-in configuration.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(DEFAULTS, "<builtin>")
    }

    /// Parse configuration from TOML text. `origin` names the source in errors.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Built-in defaults, extended by `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::builtin()?;
        if let Some(path) = path {
            config.merge(Self::from_file(path)?);
        }
        Ok(config)
    }

    /// Layer `other` over `self`.
    pub fn merge(&mut self, other: Config) {
        for pattern in other.ignore.always {
            if !self.ignore.always.contains(&pattern) {
                self.ignore.always.push(pattern);
            }
        }
        self.filetypes.extend(other.filetypes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_parses() {
        let config = Config::builtin().unwrap();
        assert!(config.ignore.always.iter().any(|p| p == ".git/"));
        assert_eq!(
            config.filetypes.get(".py"),
            Some(&FileType::new("python", "source"))
        );
        assert_eq!(
            config.filetypes.get("Makefile").or(config.filetypes.get("makefile")),
            Some(&FileType::new("makefile", "build"))
        );
    }

    #[test]
    fn test_merge_overrides_and_appends() {
        let mut config = Config::builtin().unwrap();
        let user = Config::parse(
            r#"
[ignore]
always = ["generated/", ".git/"]

[filetypes]
".py" = { language = "python3", category = "source" }
".zig" = { language = "zig", category = "source" }
"#,
            "user",
        )
        .unwrap();

        let before = config.ignore.always.len();
        config.merge(user);

        assert_eq!(config.ignore.always.len(), before + 1);
        assert_eq!(config.filetypes[".py"].language, "python3");
        assert_eq!(config.filetypes[".zig"], FileType::new("zig", "source"));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = Config::parse("", "empty").unwrap();
        assert!(config.ignore.always.is_empty());
        assert!(config.filetypes.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::parse("[filetypes]\n\".py\" = 3\n", "bad").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contexter.toml");
        fs::write(&path, "[filetypes]\n\".zig\" = { language = \"zig\", category = \"source\" }\n")
            .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.filetypes.contains_key(".zig"));
        assert!(config.filetypes.contains_key(".rs"));

        let missing = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
