//! Rename pre-existing unit directories aside instead of deleting them.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Collision-free sibling name for `dir`: `<name>.bak-<timestamp>`, then
/// `<name>.bak-<timestamp>-1`, `-2`, ... while taken.
pub fn backup_name(dir: &Path, stamp: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".to_string());
    let base = format!("{}.bak-{}", name, stamp);

    let mut candidate = dir.with_file_name(&base);
    let mut n = 1;
    while candidate.symlink_metadata().is_ok() {
        candidate = dir.with_file_name(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}

/// If `dir` exists, rename it aside and return the new location.
pub fn rename_aside(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    if dir.symlink_metadata().is_err() {
        return Ok(None);
    }
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let target = backup_name(dir, &stamp);
    std::fs::rename(dir, &target)?;
    Ok(Some(target))
}
