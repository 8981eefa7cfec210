//! Native file dialog seam. The tool only needs a path back (or a cancel);
//! which toolkit draws the dialog is up to the front end.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Open,
    Save,
    OpenDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Parse `Name:ext1,ext2;Name2:ext3`. An entry without a name is keyed by
/// its extension list. Blank entries and blank extensions are skipped.
pub fn parse_filters(pattern: &str) -> Vec<FileFilter> {
    pattern.split(';')
        .filter_map(|entry| {
            let entry = entry.trim();
            let (name, exts) = match entry.split_once(':') {
                Some((name, exts)) => (name.trim(), exts),
                None => (entry, entry),
            };
            let extensions: Vec<String> = exts
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if extensions.is_empty() {
                return None;
            }
            Some(FileFilter { name: name.to_string(), extensions })
        })
        .collect()
}

pub trait FileDialog {
    /// An absolute path, or `None` when the user cancelled.
    fn pick(&mut self, action: DialogAction, start_dir: Option<&Path>, filters: &[FileFilter]) -> Option<PathBuf>;
}

/// Dialog for headless runs: every request is cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDialog;

impl FileDialog for NoDialog {
    fn pick(&mut self, _action: DialogAction, _start_dir: Option<&Path>, _filters: &[FileFilter]) -> Option<PathBuf> {
        None
    }
}
