//! Native reading and unpacking of the operator's HSL source archive.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use super::error::ExecuteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    Tar,
}

/// Detect the format from the file name, falling back to magic bytes.
pub fn detect_format(path: &Path) -> Result<ArchiveFormat, ExecuteError> {
    let name = path.to_string_lossy().to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return Ok(ArchiveFormat::TarGz);
    }
    if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        return Ok(ArchiveFormat::TarXz);
    }
    if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        return Ok(ArchiveFormat::TarBz2);
    }
    if name.ends_with(".tar") {
        return Ok(ArchiveFormat::Tar);
    }

    let mut magic = [0u8; 6];
    let n = File::open(path)
        .and_then(|mut f| f.read(&mut magic))
        .map_err(|e| archive_err(path, e))?;
    match &magic[..n] {
        [0x1f, 0x8b, ..] => Ok(ArchiveFormat::TarGz),
        [0xfd, b'7', b'z', b'X', b'Z', 0x00] => Ok(ArchiveFormat::TarXz),
        [b'B', b'Z', b'h', ..] => Ok(ArchiveFormat::TarBz2),
        _ => Ok(ArchiveFormat::Tar),
    }
}

fn archive_err(path: &Path, reason: impl std::fmt::Display) -> ExecuteError {
    ExecuteError::Archive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open(path: &Path) -> Result<tar::Archive<Box<dyn Read>>, ExecuteError> {
    let format = detect_format(path)?;
    let file = File::open(path).map_err(|e| archive_err(path, e))?;
    let reader = BufReader::new(file);
    let stream: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(reader)),
        ArchiveFormat::TarXz => Box::new(xz2::read::XzDecoder::new(reader)),
        ArchiveFormat::TarBz2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        ArchiveFormat::Tar => Box::new(reader),
    };
    Ok(tar::Archive::new(stream))
}

/// Name of the directory the archive unpacks into (its first path component).
pub fn top_level_dir(path: &Path) -> Result<String, ExecuteError> {
    let mut archive = open(path)?;
    let entries = archive.entries().map_err(|e| archive_err(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| archive_err(path, e))?;
        let name = entry.path().map_err(|e| archive_err(path, e))?;
        let first = name.components().find_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
            _ => None,
        });
        if let Some(first) = first {
            return Ok(first);
        }
    }
    Err(archive_err(path, "archive is empty"))
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Unpack into `dest`, refusing entries or link targets that escape it.
pub fn unpack(path: &Path, dest: &Path) -> Result<(), ExecuteError> {
    let mut archive = open(path)?;
    let entries = archive.entries().map_err(|e| archive_err(path, e))?;
    let norm_dest = normalize_lexical(dest);

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_err(path, e))?;
        let name = entry
            .path()
            .map_err(|e| archive_err(path, e))?
            .into_owned();

        if name.is_absolute() || name.components().any(|c| c == Component::ParentDir) {
            return Err(archive_err(
                path,
                format!("unsafe entry path: {}", name.display()),
            ));
        }
        if name.as_os_str().is_empty() || name == Path::new(".") {
            continue;
        }
        let full = dest.join(&name);

        let kind = entry.header().entry_type();
        if kind == tar::EntryType::Symlink || kind == tar::EntryType::Link {
            let target = entry
                .link_name()
                .map_err(|e| archive_err(path, e))?
                .ok_or_else(|| {
                    archive_err(path, format!("link without target: {}", name.display()))
                })?;
            let parent = full.parent().unwrap_or(dest);
            let resolved = normalize_lexical(&parent.join(&target));
            if target.is_absolute() || !resolved.starts_with(&norm_dest) {
                return Err(archive_err(
                    path,
                    format!("link escapes destination: {} -> {}", name.display(), target.display()),
                ));
            }
        }

        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&full)
            .map_err(|e| archive_err(path, format!("{}: {}", name.display(), e)))?;
    }

    Ok(())
}
