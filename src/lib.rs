//! Build and install pyOptSparse with IPOPT and its linear solver stack.
//!
//! A run detects the environment (system prefix, virtualenv or conda), plans
//! the units the selected linear solver needs, checks that every external
//! tool the plan uses is present, then builds each unit in order:
//!
//! ```text
//! metis -> mumps | hsl | pardiso -> ipopt -> [paropt] [snopt] -> pyoptsparse
//! ```
//!
//! Units are fetched with `git`, built with their own `configure`/`make`, and
//! installed into the prefix. In a conda environment with conda-forge
//! available, METIS, MUMPS and IPOPT may come from binary packages instead.
//!
//! Everything a run places in the prefix is recorded in
//! `<prefix>/share/build-pyoptsparse/install-record.toml`, which
//! `build-pyoptsparse --uninstall` uses to undo it.
//!
//! # Exit codes
//!
//! - `0` success, including `--no-install`
//! - `1` a required command or capability is missing
//! - `2` invalid or incompatible options
//! - `3` a build step failed
//! - `4` a confirmation was declined

pub mod core;
pub mod error;
pub mod executor;
pub mod installer;

pub use crate::core::{output, InstallContext, LinearSolver, Options};
pub use error::Error;
pub use installer::{InstallSummary, Installer, RunOutcome};
