//! Per-stage execution context: one planned step with its directories and
//! the environment every tool of that step runs with.

use std::path::{Path, PathBuf};

use crate::core::context::InstallContext;
use crate::core::output::{self, ProgressGuard};
use crate::core::plan::{BuildPlan, PlanStep, ToolchainPolicy};
use crate::core::registry::PackageUnit;

use super::error::ExecuteError;
use super::runner::{self, CommandOutput, CommandRunner, Invocation};

pub struct Stage<'a> {
    pub ctx: &'a InstallContext,
    pub plan: &'a BuildPlan,
    pub step: &'a PlanStep,
    pub runner: &'a dyn CommandRunner,
    /// Working root shared by all stages
    pub work: &'a Path,
    /// This unit's source tree
    pub src: PathBuf,
    /// Planned units whose current install came from conda
    pub binary_units: Vec<&'static str>,
}

impl<'a> Stage<'a> {
    pub fn new(
        ctx: &'a InstallContext,
        plan: &'a BuildPlan,
        step: &'a PlanStep,
        runner: &'a dyn CommandRunner,
        work: &'a Path,
    ) -> Self {
        Self {
            ctx,
            plan,
            step,
            runner,
            work,
            src: work.join(step.name()),
            binary_units: Vec::new(),
        }
    }

    pub fn with_binary_units(mut self, units: Vec<&'static str>) -> Self {
        self.binary_units = units;
        self
    }

    /// `unit` is installed from a conda package rather than built here.
    pub fn is_binary(&self, unit: &str) -> bool {
        self.binary_units.contains(&unit)
    }

    pub fn unit(&self) -> &'static PackageUnit {
        self.step.unit
    }

    pub fn name(&self) -> &'static str {
        self.step.name()
    }

    pub fn prefix(&self) -> &Path {
        &self.ctx.prefix
    }

    /// Make parallelism for this unit.
    pub fn jobs(&self) -> usize {
        if self.unit().serial_build {
            1
        } else {
            self.ctx.jobs
        }
    }

    /// Variables every tool of this stage gets, in addition to the caller's environment.
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = match self.step.toolchain {
            ToolchainPolicy::Export(_) => self.ctx.toolchain.env(),
            ToolchainPolicy::Cleared => Vec::new(),
        };
        env.push(("MAKEFLAGS".to_string(), format!("-j {}", self.jobs())));
        env
    }

    /// A tool invocation in the unit's source tree with the stage environment.
    pub fn command(&self, program: impl Into<String>) -> Invocation {
        self.command_in(program, &self.src)
    }

    pub fn command_in(&self, program: impl Into<String>, dir: &Path) -> Invocation {
        let mut inv = Invocation::new(program).cwd(dir).envs(self.env());
        if self.step.toolchain == ToolchainPolicy::Cleared {
            for key in ["CC", "CXX", "FC"] {
                inv = inv.env_remove(key);
            }
        }
        inv
    }

    pub fn make(&self) -> Invocation {
        self.command(&self.ctx.make)
    }

    /// The packaging command (`pip`, `uv pip`, ...) followed by `args`.
    pub fn pip<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (program, lead) = match self.ctx.pip.split_first() {
            Some((program, lead)) => (program.as_str(), lead),
            None => ("pip", &[][..]),
        };
        self.command(program).args(lead.iter().cloned()).args(args)
    }

    /// Run one step of the recipe under a spinner. Verbose runs print the
    /// command line and stream output instead.
    pub fn run(
        &self,
        label: &str,
        invocation: Invocation,
    ) -> Result<CommandOutput, ExecuteError> {
        output::sub_action(label);
        let _guard = ProgressGuard::start(label, self.ctx.verbose);
        runner::run_checked(self.runner, &invocation)
    }
}
