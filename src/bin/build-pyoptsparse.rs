//! build-pyoptsparse - build and install pyOptSparse with IPOPT
//!
//! Usage:
//!   build-pyoptsparse                      MUMPS, default prefix or active environment
//!   build-pyoptsparse -l hsl -t coinhsl.tar.gz
//!   build-pyoptsparse -l pardiso           Intel compilers and MKL
//!   build-pyoptsparse -n                   stop after IPOPT
//!   build-pyoptsparse -o                   pyOptSparse without IPOPT
//!   build-pyoptsparse -u                   undo a previous install

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use build_pyoptsparse::core::output;
use build_pyoptsparse::error::EXIT_INVALID_FLAGS;
use build_pyoptsparse::executor::SystemRunner;
use build_pyoptsparse::{Installer, LinearSolver, Options};
use clap::Parser;

#[derive(Parser)]
#[command(name = "build-pyoptsparse")]
#[command(about = "Build and install pyOptSparse with IPOPT and a sparse linear solver")]
#[command(version)]
struct Cli {
    /// Linear solver to build IPOPT against
    #[arg(short = 'l', long, value_enum, default_value_t = LinearSolver::Mumps)]
    linear_solver: LinearSolver,

    /// Use the Intel compiler suite (implied by pardiso)
    #[arg(short = 'i', long)]
    intel: bool,

    /// Install prefix when no virtual or conda environment is active
    #[arg(short = 'p', long, env = "PYOPTSPARSE_PREFIX")]
    prefix: Option<PathBuf>,

    /// pyOptSparse branch or tag (default depends on the installed numpy)
    #[arg(short = 'b', long)]
    branch: Option<String>,

    /// Also build ParOpt
    #[arg(short = 'a', long)]
    paropt: bool,

    /// Directory containing the SNOPT sources
    #[arg(short = 's', long)]
    snopt_dir: Option<PathBuf>,

    /// HSL source archive (required with -l hsl)
    #[arg(short = 't', long = "hsl-tar-file")]
    hsl_tar_file: Option<PathBuf>,

    /// Build the dependencies but not pyOptSparse itself
    #[arg(short = 'n', long)]
    no_install: bool,

    /// Do not install IPOPT
    #[arg(short = 'o', long)]
    no_ipopt: bool,

    /// Build from source even when installed or available as a binary
    #[arg(short = 'f', long)]
    force_build: bool,

    /// Build from source when a conda install fails
    #[arg(short = 'g', long)]
    fall_back: bool,

    /// Skip the compiler sanity checks
    #[arg(short = 'k', long)]
    no_sanity_check: bool,

    /// Keep the build directories
    #[arg(short = 'd', long)]
    no_delete: bool,

    /// Build directory (uses a temp dir if not specified)
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Do not install into the active conda environment
    #[arg(short = 'e', long)]
    ignore_conda: bool,

    /// Do not prefer mamba over conda
    #[arg(short = 'm', long)]
    ignore_mamba: bool,

    /// conda-compatible command for binary installs and removals
    #[arg(short = 'c', long)]
    conda_cmd: Option<String>,

    /// Python packaging command
    #[arg(long, default_value = "pip")]
    pip_cmd: String,

    /// Parallel make jobs (default: half the processors)
    #[arg(short = 'j', long, env = "PYOPTSPARSE_JOBS")]
    jobs: Option<usize>,

    /// Show commands and their output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Answer yes to confirmations
    #[arg(short = 'y', long)]
    yes: bool,

    /// Remove what earlier runs installed, then exit
    #[arg(short = 'u', long)]
    uninstall: bool,
}

impl Cli {
    fn into_options(self) -> Result<Options> {
        Ok(Options {
            linear_solver: self.linear_solver,
            intel: self.intel,
            prefix: absolute(self.prefix.as_deref(), "prefix")?,
            branch: self.branch,
            paropt: self.paropt,
            snopt_dir: absolute(self.snopt_dir.as_deref(), "SNOPT directory")?,
            hsl_archive: absolute(self.hsl_tar_file.as_deref(), "HSL archive")?,
            no_install: self.no_install,
            no_ipopt: self.no_ipopt,
            force_build: self.force_build,
            fall_back: self.fall_back,
            sanity_check: !self.no_sanity_check,
            keep_build_dir: self.no_delete,
            build_dir: absolute(self.build_dir.as_deref(), "build directory")?,
            ignore_conda: self.ignore_conda,
            ignore_mamba: self.ignore_mamba,
            conda_cmd: self.conda_cmd,
            pip_cmd: self.pip_cmd,
            jobs: self.jobs,
            verbose: self.verbose,
            assume_yes: self.yes,
            uninstall: self.uninstall,
        })
    }
}

/// Build tools run in other directories, so every operator path is made absolute up front.
fn absolute(path: Option<&Path>, what: &str) -> Result<Option<PathBuf>> {
    path.map(|p| {
        std::path::absolute(p).with_context(|| format!("Invalid {} path: {}", what, p.display()))
    })
    .transpose()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let opts = match cli.into_options() {
        Ok(opts) => opts,
        Err(e) => {
            output::failure_banner(&format!("{:#}", e), None);
            return ExitCode::from(EXIT_INVALID_FLAGS);
        }
    };

    let runner = SystemRunner::new(verbose);
    match Installer::new(opts, &runner).run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            output::failure_banner(&e.to_string(), e.tool_output());
            ExitCode::from(e.exit_code())
        }
    }
}
