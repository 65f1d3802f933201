//! Install record: what this tool put into a prefix, for uninstall.
//!
//! ## Format
//!
//! ```toml
//! # install-record.toml - Auto-generated by build-pyoptsparse, do not edit manually
//!
//! prefix = "/home/user/pyoptsparse"
//!
//! [units.metis]
//! reference = "releases/2.0.0"
//! mode = "source"
//! files = ["include/coin-or/metis/metis.h", "lib/libcoinmetis.so"]
//!
//! [units.ipopt]
//! reference = "releases/3.14.7"
//! mode = "binary"
//! conda_packages = ["ipopt"]
//!
//! [metadata]
//! updated = "2026-01-15T10:30:00+00:00"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Directory below the prefix holding the record.
pub const RECORD_DIR: &str = "share/build-pyoptsparse";
pub const RECORD_FILE: &str = "install-record.toml";

const HEADER: &str =
    "# install-record.toml - Auto-generated by build-pyoptsparse, do not edit manually\n\n";

pub fn record_path(prefix: &Path) -> PathBuf {
    prefix.join(RECORD_DIR).join(RECORD_FILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Source,
    Binary,
}

/// What one unit left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnitRecord {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub mode: InstallMode,
    /// Files created below the prefix, relative to it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conda_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pip_packages: Vec<String>,
    /// sha256 of an operator-supplied archive the unit was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordMetadata {
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub prefix: PathBuf,
    #[serde(default)]
    pub units: BTreeMap<String, UnitRecord>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

impl InstallRecord {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            units: BTreeMap::new(),
            metadata: RecordMetadata::default(),
        }
    }

    /// Read record from path
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read install record: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse install record: {}", path.display()))
    }

    /// The record for `prefix`, or `None` if nothing was ever installed there.
    pub fn load(prefix: &Path) -> Result<Option<Self>> {
        let path = record_path(prefix);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    /// The existing record for `prefix`, or a fresh one.
    pub fn load_or_new(prefix: &Path) -> Result<Self> {
        Ok(Self::load(prefix)?.unwrap_or_else(|| Self::new(prefix)))
    }

    /// Write record to path, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize install record")?;
        std::fs::write(path, format!("{}{}", HEADER, content))
            .with_context(|| format!("Failed to write install record: {}", path.display()))
    }

    /// Write to the record location of this record's prefix.
    pub fn save(&mut self) -> Result<()> {
        self.metadata.updated = Some(chrono::Local::now().to_rfc3339());
        self.write(&record_path(&self.prefix))
    }

    /// Merge a unit's record. Files and packages from earlier runs are kept.
    pub fn record_unit(&mut self, name: &str, unit: UnitRecord) {
        let entry = self.units.entry(name.to_string()).or_default();
        entry.reference = unit.reference;
        entry.mode = unit.mode;
        merge_unique(&mut entry.files, unit.files);
        merge_unique(&mut entry.conda_packages, unit.conda_packages);
        merge_unique(&mut entry.pip_packages, unit.pip_packages);
        if unit.archive_sha256.is_some() {
            entry.archive_sha256 = unit.archive_sha256;
        }
    }

    pub fn unit(&self, name: &str) -> Option<&UnitRecord> {
        self.units.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Installed artifact locations (absolute) mapped to their unit.
    pub fn artifacts(&self) -> BTreeMap<PathBuf, &str> {
        self.units
            .iter()
            .flat_map(|(name, unit)| {
                unit.files
                    .iter()
                    .map(move |f| (self.prefix.join(f), name.as_str()))
            })
            .collect()
    }

    pub fn owner_of(&self, path: &Path) -> Option<&str> {
        let relative = path.strip_prefix(&self.prefix).unwrap_or(path);
        self.units
            .iter()
            .find(|(_, unit)| unit.files.iter().any(|f| f == relative))
            .map(|(name, _)| name.as_str())
    }

    pub fn conda_packages(&self) -> Vec<&str> {
        self.collect_packages(|u| &u.conda_packages)
    }

    pub fn pip_packages(&self) -> Vec<&str> {
        self.collect_packages(|u| &u.pip_packages)
    }

    fn collect_packages<'a>(
        &'a self,
        pick: impl Fn(&'a UnitRecord) -> &'a Vec<String>,
    ) -> Vec<&'a str> {
        let set: BTreeSet<&str> = self
            .units
            .values()
            .flat_map(|u| pick(u).iter().map(String::as_str))
            .collect();
        set.into_iter().collect()
    }
}

fn merge_unique<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Hex sha256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::io::Read;

    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
