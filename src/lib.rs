//! codecontexter - Flatten a source tree into a single Markdown report.
//!
//! codecontexter walks a directory honouring layered `.gitignore` rules plus a
//! set of permanent exclusions, classifies every remaining file by language
//! and category, and renders statistics, a metadata table, a table of contents
//! and the full contents of each file into one document.
//!
//! # Quick Start
//!
//! ```no_run
//! use codecontexter::builder::Contexter;
//! use codecontexter::output::{write_report, OutputOptions};
//! use std::path::Path;
//!
//! let scan = Contexter::new("./my-project")
//!     .include_hash(true)
//!     .skip("./my-project/code_summary.md")
//!     .build()
//!     .unwrap();
//!
//! let options = OutputOptions {
//!     include_hash: true,
//!     ..Default::default()
//! };
//! write_report(Path::new("./my-project/code_summary.md"), &scan.render(&options)).unwrap();
//! println!("{} files, {} lines", scan.stats.total_files, scan.stats.total_lines);
//! ```
//!
//! # Modules
//!
//! - [`config`] - Built-in and user supplied tables
//! - [`classify`] - Language and category lookup
//! - [`matcher`] - Permanent ignore patterns and project-root discovery
//! - [`walker`] - Deterministic traversal with layered gitignore rules
//! - [`collect`] - Per-file statistics
//! - [`stats`] - Run totals
//! - [`output`] - Markdown rendering and report writing
//! - [`progress`] - Collection progress reporting
//! - [`builder`] - Fluent API tying it together

pub mod config;
pub mod classify;
pub mod errors;
pub mod matcher;
pub mod walker;
pub mod collect;
pub mod stats;
pub mod output;
pub mod progress;
pub mod builder;

// Re-export key types at crate root for convenience
pub use builder::{Contexter, Scan};
pub use classify::{Classification, Classifier};
pub use collect::{FileBody, FileRecord};
pub use config::{Config, ConfigError, FileType};
pub use errors::ContexterError;
pub use matcher::{Matcher, MatcherError};
pub use output::{OutputError, OutputOptions};
pub use stats::RunStatistics;
pub use walker::WalkError;
