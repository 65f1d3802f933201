//! Uninstall: reverse what earlier runs put into a prefix.
//!
//! Safe to run against a prefix that never saw an install; that is a no-op.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::activation;
use super::context::InstallContext;
use super::output;
use super::record::{self, InstallRecord};
use super::registry::{self, PackageUnit};
use crate::executor::{CommandRunner, Invocation};

#[derive(Error, Debug)]
pub enum UninstallError {
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Record(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub record_found: bool,
    pub removed: Vec<PathBuf>,
    pub conda_packages: Vec<String>,
    pub pip_packages: Vec<String>,
}

impl UninstallReport {
    /// Nothing was installed, nothing was touched.
    pub fn is_noop(&self) -> bool {
        !self.record_found
            && self.removed.is_empty()
            && self.conda_packages.is_empty()
            && self.pip_packages.is_empty()
    }
}

pub struct Reconciler<'a> {
    runner: &'a dyn CommandRunner,
    ctx: &'a InstallContext,
}

impl<'a> Reconciler<'a> {
    pub fn new(runner: &'a dyn CommandRunner, ctx: &'a InstallContext) -> Self {
        Self { runner, ctx }
    }

    pub fn run(&self) -> Result<UninstallReport, UninstallError> {
        let prefix = &self.ctx.prefix;
        let mut report = UninstallReport::default();
        if !prefix.is_dir() {
            return Ok(report);
        }

        let record = InstallRecord::load(prefix)?;
        report.record_found = record.is_some();

        if let Some(record) = &record {
            report.conda_packages = self.remove_conda_packages(record);
            report.pip_packages = self.remove_pip_packages(record);

            for path in record.artifacts().into_keys() {
                remove_path(&path, &mut report.removed)?;
            }
        }

        for unit in registry::CATALOG {
            for path in known_locations(self.ctx, unit) {
                remove_path(&path, &mut report.removed)?;
            }
        }

        let (activate, deactivate) = activation::hook_paths(prefix);
        remove_path(&activate, &mut report.removed)?;
        remove_path(&deactivate, &mut report.removed)?;
        remove_path(&record::record_path(prefix), &mut report.removed)?;

        cleanup_empty_dirs(&report.removed, prefix);
        Ok(report)
    }

    /// Removal failures (already gone, helper missing) are not errors.
    fn remove_conda_packages(&self, record: &InstallRecord) -> Vec<String> {
        let packages = record.conda_packages();
        let Some(helper) = self.ctx.helper_program() else {
            if !packages.is_empty() {
                output::warning("conda packages were recorded but no conda environment is active");
            }
            return Vec::new();
        };
        if packages.is_empty() {
            return Vec::new();
        }

        output::sub_action(&format!("{} uninstall {}", helper, packages.join(" ")));
        let inv = Invocation::new(helper)
            .args(["uninstall", "-y"])
            .args(packages.iter().copied())
            .unchecked();
        if let Err(e) = self.runner.run(&inv) {
            output::warning(&format!("could not run {}: {}", helper, e));
        }
        packages.into_iter().map(String::from).collect()
    }

    fn remove_pip_packages(&self, record: &InstallRecord) -> Vec<String> {
        let Some((program, lead)) = self.ctx.pip.split_first() else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        for package in record.pip_packages() {
            output::sub_action(&format!("pip uninstall {}", package));
            let inv = Invocation::new(program)
                .args(lead.iter().cloned())
                .args(["uninstall", "-y", package])
                .unchecked();
            match self.runner.run(&inv) {
                Ok(_) => removed.push(package.to_string()),
                Err(e) => output::warning(&format!("could not run {}: {}", program, e)),
            }
        }
        removed
    }
}

/// Where a unit installs headers and libraries, as far as it currently exists.
pub fn known_locations(ctx: &InstallContext, unit: &PackageUnit) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let artifacts = &unit.artifacts;

    for coin in ["coin-or", "coin"] {
        let coin_dir = ctx.include_dir().join(coin);
        match artifacts.include_subdir {
            Some(".") => {
                for pattern in artifacts.include_globs {
                    found.extend(glob_paths(&coin_dir, pattern));
                }
            }
            Some(subdir) => {
                let dir = coin_dir.join(subdir);
                if dir.exists() {
                    found.push(dir);
                }
            }
            None => {}
        }
    }

    if let Some(pattern) = artifacts.lib_glob {
        found.extend(glob_paths(&ctx.lib_dir(), pattern));
    }
    found
}

fn glob_paths(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = dir.join(pattern);
    match glob::glob(&full.to_string_lossy()) {
        Ok(paths) => paths.flatten().collect(),
        Err(_) => Vec::new(),
    }
}

fn remove_path(path: &Path, removed: &mut Vec<PathBuf>) -> Result<(), UninstallError> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| UninstallError::Remove {
        path: path.to_path_buf(),
        source,
    })?;
    output::detail(&format!("removed {}", path.display()));
    removed.push(path.to_path_buf());
    Ok(())
}

/// Remove directories left empty by `removed`, deepest first, never the prefix itself.
pub fn cleanup_empty_dirs(removed: &[PathBuf], prefix: &Path) {
    let mut dirs: HashSet<PathBuf> = HashSet::new();
    for file in removed {
        let mut path = file.as_path();
        while let Some(parent) = path.parent() {
            if !parent.starts_with(prefix) || parent == prefix {
                break;
            }
            dirs.insert(parent.to_path_buf());
            path = parent;
        }
    }

    let mut dirs: Vec<_> = dirs.into_iter().collect();
    dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

    for dir in dirs {
        if dir.exists()
            && let Ok(mut entries) = fs::read_dir(&dir)
            && entries.next().is_none()
        {
            let _ = fs::remove_dir(&dir);
        }
    }
}
