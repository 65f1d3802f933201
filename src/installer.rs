//! One run of the orchestrator: detect, plan, check, build, then tell the
//! operator what to export. Uninstall runs take a separate path and never plan.

use std::path::PathBuf;

use inquire::Confirm;

use crate::core::activation;
use crate::core::check::{self, CapabilityChecker, Writability};
use crate::core::context::InstallContext;
use crate::core::env::EnvProbe;
use crate::core::options::{LinearSolver, Options};
use crate::core::output;
use crate::core::plan::{self, BuildPlan, Guidance, Selection};
use crate::core::uninstall::{Reconciler, UninstallReport};
use crate::error::Error;
use crate::executor::{CommandRunner, StageExecutor, StageResult, WorkRoot};

/// What a finished build run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    pub prefix: PathBuf,
    pub plan: Vec<&'static str>,
    pub results: Vec<StageResult>,
    /// Lines the operator should run before using the installation
    pub guidance: Vec<String>,
    /// Set when the working root was kept
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(InstallSummary),
    /// `--no-install`: everything up to the kernel is in place
    StoppedEarly(InstallSummary),
    Uninstalled(UninstallReport),
}

pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    opts: Options,
    probe: EnvProbe,
}

impl<'a> Installer<'a> {
    pub fn new(opts: Options, runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            opts,
            probe: EnvProbe::from_process(),
        }
    }

    /// Use `probe` instead of the process environment.
    pub fn with_probe(mut self, probe: EnvProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn run(&self) -> Result<RunOutcome, Error> {
        self.validate()?;
        let ctx = InstallContext::resolve(&self.opts, &self.probe, self.runner);

        if self.opts.uninstall {
            return self.uninstall(&ctx);
        }

        self.show_environment(&ctx);

        let plan = plan::plan(&Selection::from_options(&self.opts), &ctx)?;
        output::key_value("Plan", &plan.unit_names().join(" -> "));

        let report = CapabilityChecker::new(self.runner, &ctx)
            .sanity(self.opts.sanity_check)
            .check(&plan)?;
        for warning in &report.warnings {
            output::warning(warning);
        }

        if plan.builds_top_level() {
            self.confirm_interpreter(&ctx)?;
        }

        self.build(&ctx, &plan)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.opts.jobs == Some(0) {
            return Err(Error::InvalidFlags("--jobs must be at least 1".to_string()));
        }
        if self.opts.hsl_archive.is_some() && self.opts.linear_solver != LinearSolver::Hsl {
            output::warning("--hsl-tar-file is only used with --linear-solver hsl");
        }
        if self.opts.no_install && self.opts.snopt_dir.is_some() {
            output::warning(
                "--snopt-dir has no effect with --no-install; copy the SNOPT sources into \
                 pyoptsparse/pySNOPT/source before building pyOptSparse",
            );
        }
        Ok(())
    }

    fn uninstall(&self, ctx: &InstallContext) -> Result<RunOutcome, Error> {
        output::action(&format!("Uninstalling from {}", ctx.prefix.display()));
        let report = Reconciler::new(self.runner, ctx).run()?;
        if report.is_noop() {
            output::skip("nothing installed by build-pyoptsparse in this prefix");
        } else {
            output::success(&format!(
                "removed {} files, {} conda and {} pip packages",
                report.removed.len(),
                report.conda_packages.len(),
                report.pip_packages.len()
            ));
        }
        Ok(RunOutcome::Uninstalled(report))
    }

    fn show_environment(&self, ctx: &InstallContext) {
        output::action("Environment");
        output::key_value("Mode", ctx.mode.label());
        output::key_value("Prefix", &ctx.prefix.display().to_string());
        output::key_value("Linear solver", self.opts.linear_solver.as_str());
        output::key_value("Compilers", &ctx.toolchain.suite.to_string());
        output::key_value("pyOptSparse", &ctx.top_level_ref);
        output::key_value("Jobs", &ctx.jobs.to_string());
        for (key, value) in self.probe.relevant() {
            output::key_value(key, value);
        }
        if let Some(helper) = &ctx.helper {
            output::key_value("Package helper", &helper.program);
            if !helper.forge_available && !ctx.force_build {
                output::warning(
                    "conda-forge is not configured; everything will be built from source",
                );
            }
        }
    }

    fn confirm_interpreter(&self, ctx: &InstallContext) -> Result<(), Error> {
        let Writability::NotWritable(dir) = check::interpreter_writability(ctx.python.as_deref())
        else {
            return Ok(());
        };
        let message = format!(
            "{} is not writable; the Python packages would go into a shared location",
            dir.display()
        );
        output::warning(&message);
        if self.opts.assume_yes {
            return Ok(());
        }

        let proceed = Confirm::new("Continue anyway?")
            .with_default(false)
            .with_help_message("Activate a virtual or conda environment to avoid this")
            .prompt()
            .map_err(|e| Error::Declined(format!("cannot read confirmation: {e}")))?;
        if proceed {
            Ok(())
        } else {
            Err(Error::Declined(message))
        }
    }

    fn build(&self, ctx: &InstallContext, plan: &BuildPlan) -> Result<RunOutcome, Error> {
        let work = WorkRoot::create(self.opts.build_dir.as_deref(), ctx.keep_build_dir)?;
        let mut executor = StageExecutor::new(self.runner, ctx, work)?;
        let kept = executor
            .retains_work_dir()
            .then(|| executor.work_dir().to_path_buf());

        if let Err(e) = executor.execute(plan) {
            if let Some(dir) = &kept {
                output::info(&format!("build directories kept in {}", dir.display()));
            }
            return Err(e.into());
        }

        if ctx.conda_forge_usable() {
            for hook in activation::write_hooks(&ctx.prefix, ctx.host)? {
                output::detail(&format!("wrote {}", hook.display()));
            }
        }

        let summary = InstallSummary {
            prefix: ctx.prefix.clone(),
            plan: plan.unit_names(),
            results: executor.results().to_vec(),
            guidance: guidance_lines(ctx, plan),
            work_dir: kept,
        };
        drop(executor);

        match plan.guidance {
            Guidance::LibraryPath => output::success("pyOptSparse is installed"),
            Guidance::ManualTopLevel => {
                output::success("dependencies are installed; pyOptSparse was not built")
            }
        }
        if !summary.guidance.is_empty() {
            output::info("Before using the installation, run:");
        }
        for line in &summary.guidance {
            output::command_hint(line);
        }
        if let Some(dir) = &summary.work_dir {
            output::info(&format!("build directories kept in {}", dir.display()));
        }

        Ok(match plan.guidance {
            Guidance::LibraryPath => RunOutcome::Completed(summary),
            Guidance::ManualTopLevel => RunOutcome::StoppedEarly(summary),
        })
    }
}

/// The export lines closing a run. Without IPOPT there is nothing to export.
pub fn guidance_lines(ctx: &InstallContext, plan: &BuildPlan) -> Vec<String> {
    let mut lines = Vec::new();
    if !plan.includes_kernel() {
        return lines;
    }
    if plan.guidance == Guidance::ManualTopLevel {
        lines.push(format!(
            "export IPOPT_INC={}",
            ctx.coin_include_dir_or_default().display()
        ));
        lines.push(format!("export IPOPT_LIB={}", ctx.lib_dir().display()));
    }
    lines.push(ctx.library_path_export());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::HostOs;

    fn plan_for(selection: Selection, ctx: &InstallContext) -> BuildPlan {
        plan::plan(&selection, ctx).unwrap()
    }

    #[test]
    fn test_library_path_guidance() {
        let ctx = InstallContext::with_prefix("/opt/pos").host(HostOs::Linux);
        let plan = plan_for(Selection::default(), &ctx);
        assert_eq!(
            guidance_lines(&ctx, &plan),
            vec!["export LD_LIBRARY_PATH=/opt/pos/lib"]
        );
    }

    #[test]
    fn test_no_guidance_without_ipopt() {
        let ctx = InstallContext::with_prefix("/opt/pos").host(HostOs::Linux);
        let selection = Selection {
            no_ipopt: true,
            ..Default::default()
        };
        assert!(guidance_lines(&ctx, &plan_for(selection.clone(), &ctx)).is_empty());

        let prepare_only = Selection {
            no_install: true,
            ..selection
        };
        assert!(guidance_lines(&ctx, &plan_for(prepare_only, &ctx)).is_empty());
    }

    #[test]
    fn test_manual_top_level_guidance() {
        let ctx = InstallContext::with_prefix("/opt/pos").host(HostOs::MacOs);
        let selection = Selection {
            no_install: true,
            ..Default::default()
        };
        let lines = guidance_lines(&ctx, &plan_for(selection, &ctx));
        assert_eq!(lines[0], "export IPOPT_INC=/opt/pos/include/coin-or");
        assert_eq!(lines[1], "export IPOPT_LIB=/opt/pos/lib");
        assert_eq!(lines[2], "export DYLD_LIBRARY_PATH=/opt/pos/lib");
    }
}
