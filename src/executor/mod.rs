//! Stage executor - runs a build plan one unit at a time, in plan order.
//!
//! Each unit is either already present in the prefix, installed as conda
//! binaries, or built from source in its own directory below the working
//! root. Files a source build adds to the prefix are recorded for uninstall.

mod acquire;
mod backup;
mod binary;
mod build;
mod cleanup;
mod context;
mod error;
mod extract;
mod runner;
mod snapshot;

pub use acquire::{SNOPT_MARKER, copy_snopt_sources, find_snopt_sources, validate_git_url};
pub use backup::{backup_name, rename_aside};
pub use build::{CYIPOPT_FROM, RecipeOutput, marker_header};
pub use cleanup::WorkRoot;
pub use context::Stage;
pub use error::ExecuteError;
pub use extract::{ArchiveFormat, detect_format, top_level_dir, unpack};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner, run_checked, shell_quote};

use std::path::{Path, PathBuf};

use crate::core::context::InstallContext;
use crate::core::output;
use crate::core::plan::{AcquireMode, BuildPlan, PlanStep};
use crate::core::record::{InstallMode, InstallRecord, UnitRecord};
use crate::core::registry::RecipeId;

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded,
    /// Nothing to do: the unit is present or provided by the environment
    AlreadySatisfied,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub unit: &'static str,
    pub outcome: StageOutcome,
    /// Where an earlier directory of the same name was moved
    pub backup: Option<PathBuf>,
}

/// Runs the steps of a [`BuildPlan`] against one prefix.
pub struct StageExecutor<'a> {
    runner: &'a dyn CommandRunner,
    ctx: &'a InstallContext,
    work: WorkRoot,
    record: InstallRecord,
    results: Vec<StageResult>,
}

impl<'a> StageExecutor<'a> {
    /// Loads the prefix's install record, if any, so that new results merge into it.
    pub fn new(
        runner: &'a dyn CommandRunner,
        ctx: &'a InstallContext,
        work: WorkRoot,
    ) -> Result<Self, ExecuteError> {
        Ok(Self {
            runner,
            ctx,
            work,
            record: InstallRecord::load_or_new(&ctx.prefix)?,
            results: Vec::new(),
        })
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub fn record(&self) -> &InstallRecord {
        &self.record
    }

    pub fn work_dir(&self) -> &Path {
        self.work.path()
    }

    pub fn retains_work_dir(&self) -> bool {
        self.work.is_retained()
    }

    /// Run every step. Stops at the first failing stage; the results so far,
    /// including the failed one, stay available.
    pub fn execute(&mut self, plan: &BuildPlan) -> Result<(), ExecuteError> {
        let total = plan.steps.len();
        for (i, step) in plan.steps.iter().enumerate() {
            output::action_numbered(i + 1, total, step.name());
            if plan.clear_toolchain_before == Some(step.name()) {
                output::info("clearing CC, CXX and FC for this stage");
            }

            match self.execute_step(plan, step) {
                Ok(result) => self.results.push(result),
                Err(source) => {
                    self.results.push(StageResult {
                        unit: step.name(),
                        outcome: StageOutcome::Failed,
                        backup: None,
                    });
                    return Err(ExecuteError::Stage {
                        unit: step.name().to_string(),
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(())
    }

    /// Planned units the record lists as conda installs, from this run or an earlier one.
    fn binary_units(&self, plan: &BuildPlan) -> Vec<&'static str> {
        plan.steps
            .iter()
            .map(PlanStep::name)
            .filter(|name| {
                self.record
                    .unit(name)
                    .is_some_and(|u| u.mode == InstallMode::Binary)
            })
            .collect()
    }

    fn execute_step(
        &mut self,
        plan: &BuildPlan,
        step: &PlanStep,
    ) -> Result<StageResult, ExecuteError> {
        let unit = step.unit;
        let satisfied = StageResult {
            unit: unit.name,
            outcome: StageOutcome::AlreadySatisfied,
            backup: None,
        };

        if unit.recipe == RecipeId::MklProvided {
            if self.ctx.mkl_root.is_none() {
                output::warning("MKLROOT is not set; IPOPT may not find PARDISO");
            }
            output::skip("provided by Intel MKL");
            return Ok(satisfied);
        }

        if !self.ctx.force_build
            && let Some(header) = build::marker_header(self.ctx, unit)
        {
            output::skip(&format!("already installed ({})", header.display()));
            return Ok(satisfied);
        }

        if let AcquireMode::Binary { packages, fall_back } = step.mode {
            match binary::install_packages(self.runner, self.ctx, packages) {
                Ok(installed) => {
                    self.record.record_unit(
                        unit.name,
                        UnitRecord {
                            reference: String::new(),
                            mode: InstallMode::Binary,
                            conda_packages: installed,
                            ..Default::default()
                        },
                    );
                    self.record.save()?;
                    output::success(&format!("{} installed from conda-forge", unit.name));
                    return Ok(StageResult {
                        unit: unit.name,
                        outcome: StageOutcome::Succeeded,
                        backup: None,
                    });
                }
                Err(e) if fall_back => {
                    output::warning(&format!("{}; building {} from source", e, unit.name));
                }
                Err(e) => return Err(e),
            }
        }

        self.build_from_source(plan, step)
    }

    fn build_from_source(
        &mut self,
        plan: &BuildPlan,
        step: &PlanStep,
    ) -> Result<StageResult, ExecuteError> {
        let unit = step.unit;
        let dir = self.work.unit_dir(unit.name);
        let backup = backup::rename_aside(&dir)?;
        if let Some(moved) = &backup {
            output::detail(&format!("moved existing {} to {}", dir.display(), moved.display()));
        }
        self.work.track(dir);

        let before = snapshot::snapshot(&self.ctx.prefix);
        let produced = {
            let stage = Stage::new(self.ctx, plan, step, self.runner, self.work.path())
                .with_binary_units(self.binary_units(plan));
            build::run(&stage)?
        };
        let files = snapshot::new_files(&before, &snapshot::snapshot(&self.ctx.prefix));

        if unit.recipe != RecipeId::SnoptSources {
            self.record.record_unit(
                unit.name,
                UnitRecord {
                    reference: step.reference.clone(),
                    mode: InstallMode::Source,
                    files,
                    conda_packages: produced.conda_packages,
                    pip_packages: produced.pip_packages,
                    archive_sha256: produced.archive_sha256,
                },
            );
            self.record.save()?;
        }

        output::success(&format!("{} done", unit.name));
        Ok(StageResult {
            unit: unit.name,
            outcome: StageOutcome::Succeeded,
            backup,
        })
    }
}
