//! Source patches for the top-level package's build description.
//!
//! Patches are regex substitutions, selected by (linear solver, top-level ref).
//! Applying one twice leaves the file untouched the second time.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use semver::Version;
use thiserror::Error;

use super::options::LinearSolver;
use super::version;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("file to patch not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid patch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("patch does not apply to {}: pattern '{pattern}' not found", .file.display())]
    NoMatch { file: PathBuf, pattern: String },

    #[error("IO error while patching {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One text substitution applied to a file of the top-level package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRule {
    pub variant: LinearSolver,
    /// Only refs older than this (major, minor, patch) need the rule
    pub before: (u64, u64, u64),
    /// Path relative to the source root
    pub file: &'static str,
    pub pattern: &'static str,
    /// Link libraries of a prefix built entirely from source
    pub libraries: &'static [&'static str],
}

impl PatchRule {
    pub fn applies_to(&self, variant: LinearSolver, reference: &str) -> bool {
        let (major, minor, patch) = self.before;
        self.variant == variant
            && version::ref_older_than(reference, &Version::new(major, minor, patch))
    }

    /// The substituted text linking `libraries`.
    pub fn replacement(&self, libraries: &[&str]) -> String {
        let quoted: Vec<String> = libraries.iter().map(|l| format!("\"{}\"", l)).collect();
        format!("libraries=[{}],", quoted.join(", "))
    }
}

/// Link list when conda supplied the solver libraries under its own names.
pub const KERNEL_ONLY: &[&str] = &["ipopt"];

/// Before 2.6.3 the IPOPT extension hard-coded its link libraries.
pub const TOP_LEVEL_PATCHES: &[PatchRule] = &[
    PatchRule {
        variant: LinearSolver::Mumps,
        before: (2, 6, 3),
        file: "pyoptsparse/pyIPOPT/setup.py",
        pattern: r"libraries=.+,",
        libraries: &["ipopt", "coinmumps", "coinmetis"],
    },
    PatchRule {
        variant: LinearSolver::Hsl,
        before: (2, 6, 3),
        file: "pyoptsparse/pyIPOPT/setup.py",
        pattern: r"libraries=.+,",
        libraries: &["ipopt", "coinhsl", "coinmetis"],
    },
    PatchRule {
        variant: LinearSolver::Pardiso,
        before: (2, 6, 3),
        file: "pyoptsparse/pyIPOPT/setup.py",
        pattern: r"libraries=.+,",
        libraries: KERNEL_ONLY,
    },
];

/// The rule for this variant and ref, if any.
pub fn select(variant: LinearSolver, reference: &str) -> Option<&'static PatchRule> {
    TOP_LEVEL_PATCHES
        .iter()
        .find(|rule| rule.applies_to(variant, reference))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    AlreadyApplied,
}

/// Apply `rule` below `root`, linking `libraries`.
///
/// The first application saves the untouched file as `<file>.orig`.
pub fn apply(
    rule: &PatchRule,
    root: &Path,
    libraries: &[&str],
) -> Result<PatchOutcome, PatchError> {
    let path = root.join(rule.file);
    if !path.is_file() {
        return Err(PatchError::MissingFile(path));
    }

    let io_err = |source| PatchError::Io {
        file: path.clone(),
        source,
    };
    let text = fs::read_to_string(&path).map_err(io_err)?;

    let re = Regex::new(rule.pattern).map_err(|source| PatchError::Pattern {
        pattern: rule.pattern.to_string(),
        source,
    })?;

    let replacement = rule.replacement(libraries);
    if !re.is_match(&text) {
        if text.contains(&replacement) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        return Err(PatchError::NoMatch {
            file: path,
            pattern: rule.pattern.to_string(),
        });
    }

    let patched = re.replace_all(&text, regex::NoExpand(&replacement));
    if patched == text {
        return Ok(PatchOutcome::AlreadyApplied);
    }

    let mut orig = path.clone().into_os_string();
    orig.push(".orig");
    let orig = PathBuf::from(orig);
    if !orig.exists() {
        fs::write(&orig, &text).map_err(io_err)?;
    }
    fs::write(&path, patched.as_bytes()).map_err(io_err)?;

    Ok(PatchOutcome::Applied)
}
