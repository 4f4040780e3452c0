//! Error types for codecontexter.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::matcher::MatcherError;
use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type for codecontexter operations.
#[derive(Debug, thiserror::Error)]
pub enum ContexterError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("ignore rules: {0}")]
    Matcher(#[from] MatcherError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its exit code.
///
/// Exit code 2 is left to argument parsing.
pub fn exit_code(error: &ContexterError) -> i32 {
    match error {
        ContexterError::PathNotFound(_) => 3,
        ContexterError::NotADirectory(_) => 3,
        ContexterError::PermissionDenied(_) => 4,
        ContexterError::Io(_) => 1,
        ContexterError::Walk(WalkError::NotFound { .. } | WalkError::NotADirectory { .. }) => 3,
        ContexterError::Walk(WalkError::PermissionDenied { .. }) => 4,
        ContexterError::Walk(_) => 1,
        ContexterError::Matcher(_) => 1,
        ContexterError::Config(_) => 1,
        ContexterError::Output(_) => 1,
    }
}
