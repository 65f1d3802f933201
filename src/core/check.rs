//! Capability checks run before anything is fetched or built.
//!
//! All problems are collected and reported together.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use super::context::InstallContext;
use super::plan::{AcquireMode, BuildPlan};
use super::registry::RecipeId;
use crate::executor;
use crate::executor::{CommandRunner, Invocation};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("missing or non-functional capabilities:\n  {}", .0.join("\n  "))]
    Missing(Vec<String>),

    #[error("cannot create sanity-check directory: {0}")]
    Scratch(#[source] std::io::Error),
}

/// Non-fatal findings of a successful check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub warnings: Vec<String>,
    /// Commands that were resolved, with their locations
    pub found: Vec<(String, PathBuf)>,
}

/// Whether the interpreter's installation directory accepts new files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Writability {
    Writable,
    NotWritable(PathBuf),
    /// No interpreter was found, nothing to check
    Unknown,
}

const HELLO_C: &str = "#include <stdio.h>\nint main(void) { printf(\"hello\\n\"); return 0; }\n";
const HELLO_CXX: &str = concat!(
    "#include <iostream>\n",
    "int main() { std::cout << \"hello\" << std::endl; return 0; }\n",
);
const HELLO_F90: &str = "program hello\n  print *, 'hello'\nend program hello\n";
const LINK_C: &str = "int main(void) { return 0; }\n";

pub struct CapabilityChecker<'a> {
    runner: &'a dyn CommandRunner,
    ctx: &'a InstallContext,
    sanity: bool,
}

impl<'a> CapabilityChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, ctx: &'a InstallContext) -> Self {
        Self {
            runner,
            ctx,
            sanity: true,
        }
    }

    /// Skip the compile-and-run checks.
    pub fn sanity(mut self, sanity: bool) -> Self {
        self.sanity = sanity;
        self
    }

    /// Commands the plan needs on `PATH`, each with what it is for.
    pub fn required_commands(&self, plan: &BuildPlan) -> Vec<(String, &'static str)> {
        let mut commands: Vec<(String, &'static str)> = Vec::new();
        let source = plan.needs_source_build();

        if source {
            commands.push((self.ctx.make.clone(), "build tool"));
            commands.push(("git".to_string(), "source download"));
            let tc = &self.ctx.toolchain;
            commands.push((tc.cc.clone(), "C compiler"));
            commands.push((tc.cxx.clone(), "C++ compiler"));
            commands.push((tc.fc.clone(), "Fortran compiler"));
        }

        let binary = plan
            .steps
            .iter()
            .any(|s| matches!(s.mode, AcquireMode::Binary { .. }));
        if binary && let Some(helper) = self.ctx.helper_program() {
            commands.push((helper.to_string(), "binary package installs"));
        }

        if plan.includes("paropt") {
            commands.push(("mpicxx".to_string(), "ParOpt MPI compiler"));
        }
        if plan.builds_top_level() {
            if let Some(pip) = self.ctx.pip.first() {
                commands.push((pip.clone(), "Python package installs"));
            }
            commands.push(("swig".to_string(), "pyOptSparse wrappers"));
        }

        let mut seen = std::collections::HashSet::new();
        commands.retain(|(cmd, _)| seen.insert(cmd.clone()));
        commands
    }

    /// Verify everything `plan` relies on.
    pub fn check(&self, plan: &BuildPlan) -> Result<CheckReport, CheckError> {
        let mut report = CheckReport::default();
        let mut missing = Vec::new();

        for (cmd, purpose) in self.required_commands(plan) {
            match self.runner.locate(&cmd) {
                Some(path) => report.found.push((cmd, path)),
                None => missing.push(format!("{} ({}) not found on PATH", cmd, purpose)),
            }
        }

        if plan.needs_source_build() && self.runner.locate(&self.ctx.make).is_some() {
            let out = self
                .runner
                .run(&Invocation::new(&self.ctx.make).arg("--version").unchecked());
            let gnu = out.map(|o| o.stdout.contains("GNU Make")).unwrap_or(false);
            if !gnu {
                report.warnings.push(format!(
                    "{} does not look like GNU Make; builds may fail",
                    self.ctx.make
                ));
            }
        }

        // checked even when no planned step copies the sources
        if let Some(dir) = &plan.snopt_dir
            && !dir.is_dir()
        {
            missing.push(format!(
                "SNOPT source directory {} does not exist",
                dir.display()
            ));
        }

        if let Some(step) = plan.steps.iter().find(|s| s.unit.recipe == RecipeId::CoinHsl)
            && let Some(archive) = &step.local
            && let Err(e) = executor::top_level_dir(archive)
        {
            missing.push(format!("HSL archive is not usable: {}", e));
        }

        if let Some(root) = self.ctx.mode.root()
            && root.to_string_lossy().contains("intelpython")
        {
            report.warnings.push(format!(
                "{} looks like an Intel Python distribution, which is known to break these builds",
                root.display()
            ));
        }

        // compile checks only make sense once every compiler was found
        if self.sanity && plan.needs_source_build() && missing.is_empty() {
            let scratch = TempDir::new().map_err(CheckError::Scratch)?;
            missing.extend(self.sanity_compile(scratch.path(), plan.includes("paropt")));
            if missing.is_empty() {
                let (fatal, warnings) = self.link_checks(scratch.path(), plan.builds_top_level());
                missing.extend(fatal);
                report.warnings.extend(warnings);
            }
        }

        if missing.is_empty() {
            Ok(report)
        } else {
            Err(CheckError::Missing(missing))
        }
    }

    /// Build and run a hello-world per language. Returns a problem per failure.
    fn sanity_compile(&self, dir: &Path, mpi: bool) -> Vec<String> {
        let tc = &self.ctx.toolchain;
        let mut programs = vec![
            ("C", tc.cc.as_str(), "hello.c", HELLO_C),
            ("C++", tc.cxx.as_str(), "hello.cc", HELLO_CXX),
            ("Fortran", tc.fc.as_str(), "hello.f90", HELLO_F90),
        ];
        if mpi {
            programs.push(("MPI C++", "mpicxx", "hello_mpi.cc", HELLO_CXX));
        }

        let mut problems = Vec::new();
        for (lang, compiler, file, source) in programs {
            if let Err(reason) = self.compile_and_run(dir, compiler, file, source, &[]) {
                problems.push(format!(
                    "{} compiler {} is not functional: {}",
                    lang, compiler, reason
                ));
            }
        }
        problems
    }

    /// Link against the math libraries. lapack and blas are required,
    /// openblas only matters to pyOptSparse.
    fn link_checks(&self, dir: &Path, top_level: bool) -> (Vec<String>, Vec<String>) {
        let mut fatal = Vec::new();
        let mut warnings = Vec::new();
        let cc = self.ctx.toolchain.cc.as_str();

        for lib in ["lapack", "blas"] {
            let flag = format!("-l{}", lib);
            let file = format!("link_{}.c", lib);
            if let Err(reason) = self.compile_and_run(dir, cc, &file, LINK_C, &[&flag]) {
                fatal.push(format!("library {} cannot be linked: {}", lib, reason));
            }
        }
        if top_level
            && self
                .compile_and_run(dir, cc, "link_openblas.c", LINK_C, &["-lopenblas"])
                .is_err()
        {
            warnings.push(
                "openblas was not found; pyOptSparse may fall back to a slower BLAS".to_string(),
            );
        }

        (fatal, warnings)
    }

    fn compile_and_run(
        &self,
        dir: &Path,
        compiler: &str,
        file: &str,
        source: &str,
        libs: &[&str],
    ) -> Result<(), String> {
        let src = dir.join(file);
        fs::write(&src, source).map_err(|e| e.to_string())?;
        let exe = dir.join(format!("{}.out", file.replace('.', "_")));

        let compile = Invocation::new(compiler)
            .arg(src.display().to_string())
            .arg("-o")
            .arg(exe.display().to_string())
            .args(libs.iter().copied())
            .cwd(dir);
        let out = self.runner.run(&compile).map_err(|e| e.to_string())?;
        if !compile.accepts(out.code) {
            return Err(first_line(&out.stderr, "compilation failed"));
        }

        let run = Invocation::new(exe.display().to_string()).cwd(dir);
        let out = self.runner.run(&run).map_err(|e| e.to_string())?;
        if !run.accepts(out.code) {
            return Err(first_line(&out.stderr, "program did not run"));
        }
        Ok(())
    }
}

fn first_line(stderr: &str, fallback: &str) -> String {
    stderr
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Probe whether new files can be created next to `python`.
pub fn interpreter_writability(python: Option<&Path>) -> Writability {
    let Some(dir) = python.and_then(Path::parent) else {
        return Writability::Unknown;
    };
    match tempfile::tempfile_in(dir) {
        Ok(_) => Writability::Writable,
        Err(_) => Writability::NotWritable(dir.to_path_buf()),
    }
}
