//! Working root for source trees, removed when the run ends unless retained.
//!
//! Cleanup happens on drop so that a fatal error still honors the retention
//! setting.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

#[derive(Debug)]
pub struct WorkRoot {
    path: PathBuf,
    temp: Option<TempDir>,
    keep: bool,
    /// The fixed root did not exist before this run
    created_root: bool,
    /// Unit directories created below a fixed root
    entries: Vec<PathBuf>,
}

impl WorkRoot {
    /// A fresh temporary directory, or `fixed` when given.
    pub fn create(fixed: Option<&Path>, keep: bool) -> io::Result<Self> {
        match fixed {
            Some(path) => {
                let created_root = !path.exists();
                std::fs::create_dir_all(path)?;
                Ok(Self {
                    path: path.to_path_buf(),
                    temp: None,
                    keep,
                    created_root,
                    entries: Vec::new(),
                })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("build-pyoptsparse-")
                    .tempdir()?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                    keep,
                    created_root: true,
                    entries: Vec::new(),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory for a unit's sources.
    pub fn unit_dir(&self, unit: &str) -> PathBuf {
        self.path.join(unit)
    }

    /// Remember a directory this run created, for removal below a fixed root.
    pub fn track(&mut self, dir: impl Into<PathBuf>) {
        self.entries.push(dir.into());
    }

    pub fn is_retained(&self) -> bool {
        self.keep
    }
}

impl Drop for WorkRoot {
    fn drop(&mut self) {
        if self.keep {
            if let Some(temp) = self.temp.take() {
                let _ = temp.keep();
            }
            return;
        }
        if self.temp.is_some() {
            // TempDir removes itself
            return;
        }
        if self.created_root {
            let _ = std::fs::remove_dir_all(&self.path);
        } else {
            for entry in &self.entries {
                let _ = std::fs::remove_dir_all(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_removed_on_drop() {
        let root = WorkRoot::create(None, false).unwrap();
        let path = root.path().to_path_buf();
        std::fs::create_dir_all(root.unit_dir("metis")).unwrap();
        assert!(path.exists());
        drop(root);
        assert!(!path.exists());
    }

    #[test]
    fn test_temporary_retained() {
        let root = WorkRoot::create(None, true).unwrap();
        let path = root.path().to_path_buf();
        drop(root);
        assert!(path.exists());
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_fixed_root_keeps_foreign_entries() {
        let dir = TempDir::new().unwrap();
        let fixed = dir.path().join("work");
        std::fs::create_dir_all(fixed.join("unrelated")).unwrap();

        let mut root = WorkRoot::create(Some(&fixed), false).unwrap();
        let unit = root.unit_dir("ipopt");
        std::fs::create_dir_all(&unit).unwrap();
        root.track(&unit);
        drop(root);

        assert!(!unit.exists());
        assert!(fixed.join("unrelated").exists());
    }

    #[test]
    fn test_fixed_root_created_by_run_is_removed() {
        let dir = TempDir::new().unwrap();
        let fixed = dir.path().join("fresh");
        let root = WorkRoot::create(Some(&fixed), false).unwrap();
        assert!(fixed.exists());
        drop(root);
        assert!(!fixed.exists());
    }
}
