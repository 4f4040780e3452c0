//! Progress reporting during stat collection.
//!
//! Reporters only observe: they are told how many files will be collected and
//! are notified as each record is produced. They never influence order.
//! Collection may run on several threads, so reporters must be `Sync`.

use indicatif::{ProgressBar, ProgressStyle};

use crate::collect::FileRecord;
use crate::output::format_size;

/// Observer of collection progress.
pub trait ProgressReporter: Sync {
    /// Called once before collection with the number of files to process.
    fn start(&self, _total: usize) {}

    /// Called after each file is collected.
    fn file_done(&self, _record: &FileRecord) {}

    /// Called once after collection.
    fn finish(&self) {}
}

/// One line describing a collected file.
pub fn describe(record: &FileRecord) -> String {
    let lines = record
        .lines
        .map_or_else(|| "binary".to_string(), |n| format!("{} lines", n));
    let marker = if record.is_readable() { "✓" } else { "⚠" };
    format!(
        "  {} {} ({}, {})",
        marker,
        record.display_path(),
        lines,
        format_size(record.size)
    )
}

/// Plain reporter: nothing, or one stderr line per file when verbose.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainProgress {
    verbose: bool,
}

impl PlainProgress {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Reporter that prints nothing.
    pub fn silent() -> Self {
        Self::default()
    }
}

impl ProgressReporter for PlainProgress {
    fn file_done(&self, record: &FileRecord) {
        if self.verbose {
            eprintln!("{}", describe(record));
        }
    }
}

/// Progress bar on stderr. Verbose per-file lines are printed above the bar.
pub struct BarProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl BarProgress {
    pub fn new(verbose: bool) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        Self { bar, verbose }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn file_done(&self, record: &FileRecord) {
        if self.verbose {
            self.bar.println(describe(record));
        }
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Pick a reporter once at startup: a bar when stderr is a terminal and bars
/// are allowed, the plain reporter otherwise.
pub fn reporter(verbose: bool, allow_bar: bool) -> Box<dyn ProgressReporter> {
    use std::io::IsTerminal;

    if allow_bar && std::io::stderr().is_terminal() {
        Box::new(BarProgress::new(verbose))
    } else {
        Box::new(PlainProgress::new(verbose))
    }
}
