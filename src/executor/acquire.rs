//! Source acquisition: git checkouts and operator-supplied source directories.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::context::Stage;
use super::error::ExecuteError;

/// Marker file identifying the SNOPT source directory.
pub const SNOPT_MARKER: &str = "snoptc.f";
/// Conflicts with the copy pyOptSparse ships.
const SNOPT_EXCLUDED: &str = "snopth.f";

/// Only https://, http://, ssh:// and git@ URLs are supported.
pub fn validate_git_url(url: &str) -> Result<(), ExecuteError> {
    if url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("git@")
        || url.starts_with("ssh://")
    {
        Ok(())
    } else {
        Err(ExecuteError::CommandFailed {
            cmd: format!("git clone {}", url),
            code: None,
            stderr: "unsupported git URL scheme".to_string(),
        })
    }
}

/// Clone the stage's repository at its planned ref into `stage.src`.
pub fn clone(stage: &Stage<'_>, url: &str) -> Result<(), ExecuteError> {
    validate_git_url(url)?;
    let reference = &stage.step.reference;
    let dest = stage.src.display().to_string();

    let mut inv = stage.command_in("git", stage.work).args(["clone", "-q"]);
    if !reference.is_empty() {
        inv = inv.args(["-b", reference.as_str()]);
    }
    inv = inv.args([url, dest.as_str()]);

    stage.run(&format!("clone {} ({})", url, reference), inv)?;
    Ok(())
}

/// The directory below `root` that holds the SNOPT sources.
pub fn find_snopt_sources(root: &Path) -> Result<PathBuf, ExecuteError> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .flatten()
        .find(|e| e.file_type().is_file() && e.file_name() == SNOPT_MARKER)
        .and_then(|e| e.path().parent().map(Path::to_path_buf))
        .ok_or_else(|| ExecuteError::MissingSources {
            dir: root.to_path_buf(),
            marker: SNOPT_MARKER.to_string(),
        })
}

/// Copy every regular file next to `snoptc.f` (except `snopth.f`) into `dest`.
/// Subdirectories are not copied. Returns the copied file names, sorted.
pub fn copy_snopt_sources(root: &Path, dest: &Path) -> Result<Vec<String>, ExecuteError> {
    let source = find_snopt_sources(root)?;
    fs::create_dir_all(dest)?;

    let mut copied = Vec::new();
    for entry in fs::read_dir(&source)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.path().is_file() || name == SNOPT_EXCLUDED {
            continue;
        }
        fs::copy(entry.path(), dest.join(&name))?;
        copied.push(name);
    }
    copied.sort();
    Ok(copied)
}
