//! Prefix snapshots, diffed around each source stage to learn what it installed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::record::RECORD_DIR;

/// Files and symlinks below `prefix`, relative to it. The record directory is left out.
pub fn snapshot(prefix: &Path) -> HashSet<PathBuf> {
    let record_dir = prefix.join(RECORD_DIR);
    WalkDir::new(prefix)
        .into_iter()
        .filter_entry(|e| e.path() != record_dir)
        .flatten()
        .filter(|e| !e.file_type().is_dir())
        .filter_map(|e| e.path().strip_prefix(prefix).ok().map(Path::to_path_buf))
        .collect()
}

/// Entries present in `after` but not in `before`, sorted.
pub fn new_files(before: &HashSet<PathBuf>, after: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut added: Vec<PathBuf> = after.difference(before).cloned().collect();
    added.sort();
    added
}
