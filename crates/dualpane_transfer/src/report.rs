//! Paste report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Counters and diagnostics for one successful paste.
#[derive(Debug, Default, Clone)]
pub struct ReportPaste {
    /// Where the entry landed (after collision renaming).
    pub path_destination: PathBuf,
    /// `true` when the requested destination was occupied.
    pub if_renamed: bool,
    /// Number of directories created.
    pub cnt_dirs: u64,
    /// Number of regular files copied.
    pub cnt_files: u64,
    /// Number of symbolic links recreated.
    pub cnt_symlinks: u64,
    /// Total bytes written for regular files.
    pub cnt_bytes: u64,
    /// Non-fatal notes collected while walking the source.
    pub warnings: Vec<String>,
}

impl ReportPaste {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs".to_string(), self.cnt_dirs);
        dict_counts.insert("cnt_files".to_string(), self.cnt_files);
        dict_counts.insert("cnt_symlinks".to_string(), self.cnt_symlinks);
        dict_counts.insert("cnt_bytes".to_string(), self.cnt_bytes);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dst={} renamed={} dirs={} files={} symlinks={} bytes={} warnings={}",
            self.path_destination.display(),
            self.if_renamed,
            self.cnt_dirs,
            self.cnt_files,
            self.cnt_symlinks,
            self.cnt_bytes,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportPaste {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[PASTE]"))
    }
}

/// Mutable accumulator for paste statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportPasteBuilder {
    cnt_dirs: u64,
    cnt_files: u64,
    cnt_symlinks: u64,
    cnt_bytes: u64,
    warnings: Vec<String>,
}

impl ReportPasteBuilder {
    /// Increment created-directory count by one.
    pub fn add_dir(&mut self) {
        self.cnt_dirs += 1;
    }

    /// Record one copied file of `n_bytes`.
    pub fn add_file(&mut self, n_bytes: u64) {
        self.cnt_files += 1;
        self.cnt_bytes += n_bytes;
    }

    /// Record a batch of copied files.
    pub fn add_files(&mut self, n_files: u64, n_bytes: u64) {
        self.cnt_files += n_files;
        self.cnt_bytes += n_bytes;
    }

    /// Increment recreated-symlink count by one.
    pub fn add_symlink(&mut self) {
        self.cnt_symlinks += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self, path_destination: PathBuf, if_renamed: bool) -> ReportPaste {
        ReportPaste {
            path_destination,
            if_renamed,
            cnt_dirs: self.cnt_dirs,
            cnt_files: self.cnt_files,
            cnt_symlinks: self.cnt_symlinks,
            cnt_bytes: self.cnt_bytes,
            warnings: self.warnings,
        }
    }
}
