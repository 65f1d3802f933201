//! Environment detection: which kind of Python environment is active, where
//! artifacts go, and whether conda binaries can replace source builds.
//!
//! Detection only reads state. A snapshot of the variables is taken once
//! ([`EnvProbe`]) so that the rest of the run never consults the live process
//! environment again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::executor::{CommandRunner, Invocation};

/// Snapshot of the environment variables the orchestrator cares about.
#[derive(Debug, Clone, Default)]
pub struct EnvProbe {
    vars: HashMap<String, String>,
}

impl EnvProbe {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value of a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn conda_prefix(&self) -> Option<PathBuf> {
        self.get("CONDA_PREFIX").map(PathBuf::from)
    }

    pub fn virtual_env(&self) -> Option<PathBuf> {
        self.get("VIRTUAL_ENV").map(PathBuf::from)
    }

    /// Decide the environment mode. Conda wins over a virtualenv because it can
    /// also supply binary packages.
    pub fn detect_mode(&self, ignore_conda: bool) -> EnvMode {
        if !ignore_conda && let Some(root) = self.conda_prefix() {
            return EnvMode::PackageManager {
                root,
                name: self.get("CONDA_DEFAULT_ENV").map(String::from),
            };
        }
        if let Some(root) = self.virtual_env() {
            return EnvMode::VirtualEnv { root };
        }
        EnvMode::System
    }

    /// Variables worth showing before a build starts.
    pub fn relevant(&self) -> Vec<(&'static str, &str)> {
        ["CONDA_PREFIX", "VIRTUAL_ENV", "TMPDIR", "TMP_DIR", "TEMP_DIR"]
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
            .collect()
    }
}

/// Where the run installs to and which installer owns that location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvMode {
    /// No environment active; a configured or default prefix is used
    System,
    /// A Python virtual environment (`VIRTUAL_ENV`)
    VirtualEnv { root: PathBuf },
    /// A conda environment (`CONDA_PREFIX`)
    PackageManager { root: PathBuf, name: Option<String> },
}

impl EnvMode {
    pub fn root(&self) -> Option<&Path> {
        match self {
            Self::System => None,
            Self::VirtualEnv { root } | Self::PackageManager { root, .. } => Some(root),
        }
    }

    pub fn is_package_manager(&self) -> bool {
        matches!(self, Self::PackageManager { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::VirtualEnv { .. } => "virtualenv",
            Self::PackageManager { .. } => "conda",
        }
    }
}

/// Default prefix when no environment is active: `$HOME/pyoptsparse`.
pub fn default_prefix() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pyoptsparse")
}

/// An active environment's own directory takes precedence over the configured prefix.
pub fn select_prefix(mode: &EnvMode, configured: Option<&Path>) -> PathBuf {
    match mode.root() {
        Some(root) => root.to_path_buf(),
        None => configured
            .map(Path::to_path_buf)
            .unwrap_or_else(default_prefix),
    }
}

/// The conda-compatible command used for binary installs and removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryHelper {
    pub program: String,
    /// `mamba` was picked over `conda`
    pub accelerated: bool,
    /// conda-forge is configured, so binary installs can actually be used
    pub forge_available: bool,
}

/// Pick `--conda-cmd`, else `mamba` when present and not ignored, else `conda`.
pub fn select_helper_program(
    runner: &dyn CommandRunner,
    explicit: Option<&str>,
    ignore_mamba: bool,
) -> (String, bool) {
    if let Some(cmd) = explicit {
        return (cmd.to_string(), cmd == "mamba");
    }
    if !ignore_mamba && runner.locate("mamba").is_some() {
        return ("mamba".to_string(), true);
    }
    ("conda".to_string(), false)
}

/// Ask the helper whether the conda-forge channel is configured.
pub fn forge_available(runner: &dyn CommandRunner, program: &str) -> bool {
    let inv = Invocation::new(program).args(["info", "--unsafe-channels"]);
    match runner.run(&inv) {
        Ok(out) if out.succeeded() => mentions_forge(&out.stdout),
        _ => false,
    }
}

fn mentions_forge(channels: &str) -> bool {
    Regex::new(r"conda.*forge")
        .map(|re| re.is_match(channels))
        .unwrap_or(false)
}

/// Resolve the binary helper for a conda environment. `None` outside conda.
pub fn detect_helper(
    mode: &EnvMode,
    runner: &dyn CommandRunner,
    explicit: Option<&str>,
    ignore_mamba: bool,
    probe_channels: bool,
) -> Option<BinaryHelper> {
    if !mode.is_package_manager() {
        return None;
    }
    let (program, accelerated) = select_helper_program(runner, explicit, ignore_mamba);
    let forge = probe_channels && forge_available(runner, &program);
    Some(BinaryHelper {
        program,
        accelerated,
        forge_available: forge,
    })
}
