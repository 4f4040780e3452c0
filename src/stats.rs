//! Aggregate statistics over collected files.

use std::collections::BTreeMap;

use crate::collect::FileRecord;

/// Totals for one category or language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTotals {
    pub files: usize,
    pub lines: usize,
    pub size: u64,
}

impl GroupTotals {
    fn add(&mut self, record: &FileRecord) {
        self.files += 1;
        self.lines += record.lines.unwrap_or(0);
        self.size += record.size;
    }
}

/// Totals for a run, derived from its records.
///
/// Only successfully read files count towards the totals and groups;
/// unreadable files are tallied separately in `unreadable`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_size: u64,
    pub unreadable: usize,
    pub by_category: BTreeMap<String, GroupTotals>,
    pub by_language: BTreeMap<String, GroupTotals>,
}

impl RunStatistics {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut stats = Self::default();

        for record in records {
            if !record.is_readable() {
                stats.unreadable += 1;
                continue;
            }
            stats.total_files += 1;
            stats.total_lines += record.lines.unwrap_or(0);
            stats.total_size += record.size;
            stats
                .by_category
                .entry(record.category.clone())
                .or_default()
                .add(record);
            stats
                .by_language
                .entry(record.language.clone())
                .or_default()
                .add(record);
        }

        stats
    }

    /// Categories ordered by file count (descending), then name.
    pub fn categories_ranked(&self) -> Vec<(&str, GroupTotals)> {
        ranked(&self.by_category)
    }

    /// Languages ordered by file count (descending), then name.
    pub fn languages_ranked(&self) -> Vec<(&str, GroupTotals)> {
        ranked(&self.by_language)
    }
}

fn ranked(groups: &BTreeMap<String, GroupTotals>) -> Vec<(&str, GroupTotals)> {
    let mut rows: Vec<_> = groups.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    // stable: ties keep BTreeMap (alphabetical) order
    rows.sort_by(|a, b| b.1.files.cmp(&a.1.files));
    rows
}
