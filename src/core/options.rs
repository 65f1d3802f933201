//! Operator-selected options, folded from the command line before any detection runs.

use std::fmt;
use std::path::PathBuf;

/// Sparse linear solver IPOPT is built against. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum LinearSolver {
    #[default]
    Mumps,
    Hsl,
    Pardiso,
}

impl LinearSolver {
    pub const ALL: [LinearSolver; 3] = [Self::Mumps, Self::Hsl, Self::Pardiso];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mumps => "mumps",
            Self::Hsl => "hsl",
            Self::Pardiso => "pardiso",
        }
    }
}

impl fmt::Display for LinearSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler family used for the numerical libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompilerSuite {
    #[default]
    Gnu,
    Intel,
}

impl CompilerSuite {
    /// Default (C, C++, Fortran) compiler commands when `CC`/`CXX`/`FC` are unset.
    pub fn default_compilers(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Gnu => ("gcc", "g++", "gfortran"),
            Self::Intel => ("icc", "icpc", "ifort"),
        }
    }
}

impl fmt::Display for CompilerSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gnu => f.write_str("GNU"),
            Self::Intel => f.write_str("Intel"),
        }
    }
}

/// Everything the operator can choose for one invocation.
#[derive(Debug, Clone)]
pub struct Options {
    pub linear_solver: LinearSolver,
    /// Explicit request for the Intel suite (PARDISO implies it regardless)
    pub intel: bool,
    /// Prefix used when no virtual or conda environment is active
    pub prefix: Option<PathBuf>,
    /// pyOptSparse branch or tag; detected from numpy when unset
    pub branch: Option<String>,
    pub paropt: bool,
    /// Directory holding the SNOPT sources
    pub snopt_dir: Option<PathBuf>,
    /// HSL source tarball, required with the HSL solver
    pub hsl_archive: Option<PathBuf>,
    /// Build everything except pyOptSparse itself
    pub no_install: bool,
    /// Leave IPOPT out; pyOptSparse is built without it
    pub no_ipopt: bool,
    pub force_build: bool,
    /// Build from source when a conda install fails
    pub fall_back: bool,
    pub sanity_check: bool,
    pub keep_build_dir: bool,
    /// Fixed working root instead of a fresh temporary directory
    pub build_dir: Option<PathBuf>,
    pub ignore_conda: bool,
    pub ignore_mamba: bool,
    pub conda_cmd: Option<String>,
    pub pip_cmd: String,
    pub jobs: Option<usize>,
    pub verbose: bool,
    /// Answer yes to interactive confirmations
    pub assume_yes: bool,
    pub uninstall: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            linear_solver: LinearSolver::Mumps,
            intel: false,
            prefix: None,
            branch: None,
            paropt: false,
            snopt_dir: None,
            hsl_archive: None,
            no_install: false,
            no_ipopt: false,
            force_build: false,
            fall_back: false,
            sanity_check: true,
            keep_build_dir: false,
            build_dir: None,
            ignore_conda: false,
            ignore_mamba: false,
            conda_cmd: None,
            pip_cmd: "pip".to_string(),
            jobs: None,
            verbose: false,
            assume_yes: false,
            uninstall: false,
        }
    }
}

impl Options {
    /// The suite implied by the selection. PARDISO needs MKL, so it always means Intel.
    pub fn compiler_suite(&self) -> CompilerSuite {
        if self.intel || self.linear_solver == LinearSolver::Pardiso {
            CompilerSuite::Intel
        } else {
            CompilerSuite::Gnu
        }
    }

    /// Split the packaging command into program and leading arguments (`uv pip` -> [uv, pip]).
    pub fn pip_command(&self) -> Vec<String> {
        let parts: Vec<String> = self.pip_cmd.split_whitespace().map(String::from).collect();
        if parts.is_empty() {
            vec!["pip".to_string()]
        } else {
            parts
        }
    }
}
