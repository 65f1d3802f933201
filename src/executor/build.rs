//! Build recipes: what each unit runs once its stage has a working directory.

use std::fs;
use std::path::PathBuf;

use semver::Version;

use crate::core::context::{HostOs, InstallContext};
use crate::core::options::LinearSolver;
use crate::core::output;
use crate::core::patch::{self, PatchOutcome};
use crate::core::record;
use crate::core::registry::{PackageUnit, RecipeId, Role};
use crate::core::version;

use super::acquire;
use super::backup;
use super::binary;
use super::context::Stage;
use super::error::ExecuteError;
use super::extract;

/// Top-level refs from here on need cyipopt installed separately.
pub const CYIPOPT_FROM: (u64, u64, u64) = (2, 14, 0);

/// Side products of a recipe worth recording for uninstall.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeOutput {
    pub pip_packages: Vec<String>,
    pub conda_packages: Vec<String>,
    pub archive_sha256: Option<String>,
}

/// Run the unit's recipe from acquisition through installation.
pub fn run(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    match stage.unit().recipe {
        RecipeId::CoinThirdParty { fetch_script } => coin_third_party(stage, fetch_script),
        RecipeId::CoinHsl => coin_hsl(stage),
        RecipeId::MklProvided => Ok(RecipeOutput::default()),
        RecipeId::Ipopt => ipopt(stage),
        RecipeId::ParOpt => paropt(stage),
        RecipeId::SnoptSources => snopt(stage),
        RecipeId::PyOptSparse => pyoptsparse(stage),
    }
}

fn clone(stage: &Stage<'_>) -> Result<(), ExecuteError> {
    let url = stage
        .unit()
        .git_url()
        .ok_or_else(|| ExecuteError::MissingSources {
            dir: stage.src.clone(),
            marker: "repository".to_string(),
        })?;
    acquire::clone(stage, url)
}

fn configure(
    stage: &Stage<'_>,
    args: Vec<String>,
    env: &[(&str, String)],
) -> Result<(), ExecuteError> {
    let inv = stage
        .command(stage.src.join("configure").display().to_string())
        .args(args)
        .envs(env.iter().map(|(k, v)| (*k, v.clone())));
    stage.run("configure", inv)?;
    Ok(())
}

fn make_install(stage: &Stage<'_>) -> Result<(), ExecuteError> {
    stage.run("make", stage.make())?;
    stage.run("make install", stage.make().arg("install"))?;
    Ok(())
}

fn prefix_arg(stage: &Stage<'_>) -> String {
    format!("--prefix={}", stage.prefix().display())
}

/// Python builds of ParOpt and pyOptSparse both need Cython first.
fn install_cython(stage: &Stage<'_>) -> Result<(), ExecuteError> {
    stage.run("pip install Cython", stage.pip(["install", "Cython"]))?;
    Ok(())
}

/// configure arguments shared by the MUMPS and HSL ThirdParty builds.
pub fn solver_configure_args(stage: &Stage<'_>) -> Vec<String> {
    let ctx = stage.ctx;
    let coin = ctx.coin_include_dir_or_default();
    let cflags = format!(
        "-w -I{}/include -I{} -I{}/metis",
        ctx.prefix.display(),
        coin.display(),
        coin.display()
    );
    let mut fcflags = cflags.clone();
    if ctx.toolchain.gnu_major.is_some_and(|m| m >= 10) {
        fcflags.push_str(" -fallow-argument-mismatch");
    }

    let mut metis_lflags = format!("-L{} -l{}", ctx.lib_dir().display(), ctx.lib_name("metis"));
    if ctx.host == HostOs::Linux {
        metis_lflags.push_str(" -lm");
    }

    let mut args = vec![
        "--with-metis".to_string(),
        format!("--with-metis-lflags={}", metis_lflags),
        format!("--with-metis-cflags={}", cflags),
        prefix_arg(stage),
        format!("CFLAGS={}", cflags),
        format!("FCFLAGS={}", fcflags),
    ];
    if ctx.toolchain.apple_clang {
        args.push("--disable-openmp".to_string());
    }
    args
}

fn coin_third_party(stage: &Stage<'_>, fetch_script: &str) -> Result<RecipeOutput, ExecuteError> {
    clone(stage)?;
    let script = stage.src.join(fetch_script);
    stage.run(fetch_script, stage.command(script.display().to_string()))?;

    if stage.unit().role == Role::Partitioning {
        configure(
            stage,
            vec![prefix_arg(stage)],
            &[("CFLAGS", "-Wno-implicit-function-declaration".to_string())],
        )?;
    } else {
        configure(stage, solver_configure_args(stage), &[])?;
    }
    make_install(stage)?;
    Ok(RecipeOutput::default())
}

fn coin_hsl(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    let archive = stage
        .step
        .local
        .as_deref()
        .ok_or_else(|| ExecuteError::MissingSources {
            dir: stage.src.clone(),
            marker: "HSL archive".to_string(),
        })?;

    clone(stage)?;

    output::sub_action(&format!("unpack {}", archive.display()));
    let top = extract::top_level_dir(archive)?;
    extract::unpack(archive, &stage.src)?;
    let target = stage.src.join("coinhsl");
    if top != "coinhsl" {
        if let Some(moved) = backup::rename_aside(&target)? {
            output::detail(&format!("moved existing coinhsl to {}", moved.display()));
        }
        fs::rename(stage.src.join(&top), &target)?;
    }

    configure(stage, solver_configure_args(stage), &[])?;
    make_install(stage)?;

    Ok(RecipeOutput {
        archive_sha256: Some(record::sha256_file(archive)?),
        ..Default::default()
    })
}

/// IPOPT configure arguments for the active linear solver.
pub fn ipopt_configure_args(stage: &Stage<'_>) -> Vec<String> {
    let ctx = stage.ctx;
    let coin = ctx.coin_include_dir_or_default();
    let lib = ctx.lib_dir();
    let mut args = vec![prefix_arg(stage), "--disable-java".to_string()];

    match stage.plan.variant {
        LinearSolver::Mumps => {
            args.push("--disable-pardisomkl".to_string());
            args.push("--with-mumps".to_string());
            args.push(format!(
                "--with-mumps-lflags=-L{} -l{}",
                lib.display(),
                ctx.lib_name("mumps")
            ));
            args.push(format!("--with-mumps-cflags=-I{}/mumps", coin.display()));
            args.push("--without-asl".to_string());
            args.push("--without-hsl".to_string());
        }
        LinearSolver::Hsl => {
            args.push("--disable-pardisomkl".to_string());
            args.push("--with-hsl".to_string());
            args.push(format!(
                "--with-hsl-lflags=-L{} -lcoinhsl -l{}",
                lib.display(),
                ctx.lib_name("metis")
            ));
            args.push(format!("--with-hsl-cflags=-I{}/hsl", coin.display()));
            args.push("--disable-linear-solver-loader".to_string());
        }
        LinearSolver::Pardiso => {}
    }
    args
}

fn ipopt(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    clone(stage)?;
    configure(stage, ipopt_configure_args(stage), &[])?;
    make_install(stage)?;
    Ok(RecipeOutput::default())
}

/// make variables for ParOpt's own Makefile.
pub fn paropt_make_vars(stage: &Stage<'_>) -> Vec<String> {
    let ctx = stage.ctx;
    let so_link = match ctx.host {
        HostOs::MacOs => "-fPIC -dynamiclib -undefined dynamic_lookup",
        _ => "-fPIC -shared",
    };
    vec![
        format!("PAROPT_DIR={}", stage.src.display()),
        format!("SO_EXT={}", ctx.host.shared_lib_ext()),
        format!("SO_LINK_FLAGS={}", so_link),
        format!(
            "METIS_INCLUDE=-I{}/metis",
            ctx.coin_include_dir_or_default().display()
        ),
        format!(
            "METIS_LIB=-L{} -l{}",
            ctx.lib_dir().display(),
            ctx.lib_name("metis")
        ),
    ]
}

fn paropt(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    clone(stage)?;
    fs::rename(
        stage.src.join("Makefile.in.info"),
        stage.src.join("Makefile.in"),
    )?;
    stage.run("make", stage.make().args(paropt_make_vars(stage)))?;
    install_cython(stage)?;
    stage.run("pip install paropt", stage.pip(["install", "./"]))?;

    let lib_dest = stage.ctx.lib_dir();
    fs::create_dir_all(&lib_dest)?;
    let pattern = stage.src.join("lib").join("libparopt*");
    let mut copied = 0;
    for lib in glob::glob(&pattern.to_string_lossy())
        .map_err(|e| ExecuteError::MissingSources {
            dir: stage.src.join("lib"),
            marker: e.to_string(),
        })?
        .flatten()
    {
        if let Some(name) = lib.file_name() {
            fs::copy(&lib, lib_dest.join(name))?;
            copied += 1;
        }
    }
    output::detail(&format!("copied {} ParOpt libraries to {}", copied, lib_dest.display()));

    Ok(RecipeOutput {
        pip_packages: vec!["paropt".to_string()],
        ..Default::default()
    })
}

fn snopt(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    let root = stage
        .step
        .local
        .as_deref()
        .ok_or_else(|| ExecuteError::MissingSources {
            dir: stage.src.clone(),
            marker: acquire::SNOPT_MARKER.to_string(),
        })?;
    output::sub_action(&format!("collect SNOPT sources from {}", root.display()));
    let copied = acquire::copy_snopt_sources(root, &stage.src)?;
    output::detail(&format!("{} source files", copied.len()));
    Ok(RecipeOutput::default())
}

/// Variables pyOptSparse's build reads to find IPOPT.
pub fn ipopt_locations(stage: &Stage<'_>) -> Vec<(String, String)> {
    let ctx = stage.ctx;
    vec![
        (
            "IPOPT_INC".to_string(),
            ctx.coin_include_dir_or_default().display().to_string(),
        ),
        ("IPOPT_LIB".to_string(), ctx.lib_dir().display().to_string()),
        ("IPOPT_DIR".to_string(), ctx.prefix.display().to_string()),
    ]
}

fn pyoptsparse(stage: &Stage<'_>) -> Result<RecipeOutput, ExecuteError> {
    let ctx = stage.ctx;
    let mut out = RecipeOutput::default();

    clone(stage)?;

    if let Some(rule) = stage.plan.patch {
        output::sub_action(&format!("patch {}", rule.file));
        // conda names the solver libraries differently; IPOPT alone pulls them in
        let libraries = if ["metis", "mumps", "ipopt"].iter().any(|u| stage.is_binary(u)) {
            patch::KERNEL_ONLY
        } else {
            rule.libraries
        };
        match patch::apply(rule, &stage.src, libraries)? {
            PatchOutcome::Applied => output::detail("applied"),
            PatchOutcome::AlreadyApplied => output::detail("already applied"),
        }
    }

    if stage.plan.includes("snopt") {
        let dest = stage.src.join("pyoptsparse").join("pySNOPT").join("source");
        output::sub_action(&format!("copy SNOPT sources to {}", dest.display()));
        acquire::copy_snopt_sources(&stage.work.join("snopt"), &dest)?;
    }

    // the ParOpt stage already installed it
    if !stage.plan.includes("paropt") {
        install_cython(stage)?;
    }

    let (major, minor, patch) = CYIPOPT_FROM;
    let kernel = stage.plan.includes_kernel();
    if kernel && version::ref_at_least(&stage.step.reference, &Version::new(major, minor, patch)) {
        // a conda cyipopt pulls in conda's IPOPT, so only pair it with one
        if stage.is_binary("ipopt") {
            out.conda_packages
                .extend(binary::install_packages(stage.runner, ctx, &["cyipopt"])?);
        } else {
            let inv = stage
                .pip(["install", "cyipopt", "--use-pep517"])
                .env("PKG_CONFIG_PATH", ctx.pkg_config_path_with_prefix());
            stage.run("pip install cyipopt", inv)?;
            out.pip_packages.push("cyipopt".to_string());
        }
    }

    let mut inv = stage
        .pip(["install", "--no-cache-dir", "./"])
        .env("CFLAGS", "-Wno-implicit-function-declaration -std=c99");
    if kernel {
        inv = inv.envs(ipopt_locations(stage));
    }
    stage.run("pip install pyoptsparse", inv)?;
    out.pip_packages.push("pyoptsparse".to_string());

    Ok(out)
}

/// Header marking the unit as installed, if present in the prefix.
pub fn marker_header(ctx: &InstallContext, unit: &PackageUnit) -> Option<PathBuf> {
    let (subdir, file) = (unit.artifacts.include_subdir?, unit.artifacts.include_file?);
    let coin = ctx.coin_include_dir()?;
    let path = match subdir {
        "." => coin.join(file),
        dir => coin.join(dir).join(file),
    };
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Toolchain;
    use crate::core::env::{BinaryHelper, EnvMode};
    use crate::core::options::CompilerSuite;
    use crate::core::plan::{self, BuildPlan, Selection};
    use crate::executor::{CommandOutput, CommandRunner, Invocation};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Invocation>>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(CommandOutput::success())
        }
    }

    fn linux_ctx(prefix: &std::path::Path) -> InstallContext {
        let mut toolchain = Toolchain::defaults(CompilerSuite::Gnu);
        toolchain.gnu_major = Some(11);
        InstallContext::with_prefix(prefix)
            .host(HostOs::Linux)
            .toolchain(toolchain)
    }

    fn plan_for(selection: &Selection, ctx: &InstallContext) -> BuildPlan {
        plan::plan(selection, ctx).unwrap()
    }

    #[test]
    fn test_solver_flags_for_gfortran_10() {
        let dir = TempDir::new().unwrap();
        let ctx = linux_ctx(dir.path());
        let plan = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("mumps").unwrap(), &runner, dir.path());

        let args = solver_configure_args(&stage);
        let fcflags = args.iter().find(|a| a.starts_with("FCFLAGS=")).unwrap();
        assert!(fcflags.ends_with("-fallow-argument-mismatch"));
        let cflags = args.iter().find(|a| a.starts_with("CFLAGS=")).unwrap();
        assert!(!cflags.contains("-fallow-argument-mismatch"));
        assert!(
            args.iter()
                .any(|a| a.starts_with("--with-metis-lflags=") && a.ends_with("-lcoinmetis -lm"))
        );
        assert!(!args.contains(&"--disable-openmp".to_string()));
    }

    #[test]
    fn test_solver_flags_for_apple_clang() {
        let dir = TempDir::new().unwrap();
        let mut toolchain = Toolchain::defaults(CompilerSuite::Gnu);
        toolchain.apple_clang = true;
        let ctx = InstallContext::with_prefix(dir.path())
            .host(HostOs::MacOs)
            .toolchain(toolchain);
        let plan = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("mumps").unwrap(), &runner, dir.path());

        let args = solver_configure_args(&stage);
        assert!(args.contains(&"--disable-openmp".to_string()));
        assert!(!args.iter().any(|a| a.contains("-fallow-argument-mismatch")));
        assert!(!args.iter().any(|a| a.ends_with("-lm")));
    }

    #[test]
    fn test_ipopt_flags_per_variant() {
        let dir = TempDir::new().unwrap();
        let runner = Recorder::default();

        let ctx = linux_ctx(dir.path());
        let mumps = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let stage = Stage::new(&ctx, &mumps, mumps.step("ipopt").unwrap(), &runner, dir.path());
        let args = ipopt_configure_args(&stage);
        assert!(args.contains(&"--with-mumps".to_string()));
        assert!(args.contains(&"--without-hsl".to_string()));
        assert!(args.contains(&"--disable-pardisomkl".to_string()));

        let archive = dir.path().join("coinhsl.tar.gz");
        std::fs::write(&archive, "").unwrap();
        let selection = Selection {
            hsl_archive: Some(archive),
            ..Selection::with_variant(LinearSolver::Hsl)
        };
        let hsl = plan_for(&selection, &ctx);
        let stage = Stage::new(&ctx, &hsl, hsl.step("ipopt").unwrap(), &runner, dir.path());
        let args = ipopt_configure_args(&stage);
        assert!(args.contains(&"--with-hsl".to_string()));
        assert!(args.contains(&"--disable-linear-solver-loader".to_string()));
        assert!(!args.contains(&"--with-mumps".to_string()));

        let intel = InstallContext::with_prefix(dir.path())
            .toolchain(Toolchain::defaults(CompilerSuite::Intel));
        let pardiso = plan_for(&Selection::with_variant(LinearSolver::Pardiso), &intel);
        let step = pardiso.step("ipopt").unwrap();
        let stage = Stage::new(&intel, &pardiso, step, &runner, dir.path());
        let args = ipopt_configure_args(&stage);
        assert_eq!(args.len(), 2);
        assert!(args.contains(&"--disable-java".to_string()));
    }

    #[test]
    fn test_paropt_make_vars_on_macos() {
        let dir = TempDir::new().unwrap();
        let ctx = InstallContext::with_prefix(dir.path()).host(HostOs::MacOs);
        let selection = Selection {
            paropt: true,
            ..Selection::with_variant(LinearSolver::Mumps)
        };
        let plan = plan_for(&selection, &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("paropt").unwrap(), &runner, dir.path());

        let vars = paropt_make_vars(&stage);
        assert!(vars.contains(&"SO_EXT=dylib".to_string()));
        let link = "SO_LINK_FLAGS=-fPIC -dynamiclib -undefined dynamic_lookup";
        assert!(vars.contains(&link.to_string()));
        assert!(vars[0].starts_with("PAROPT_DIR="));
    }

    #[test]
    fn test_top_level_recipe_with_cyipopt_from_pip() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("prefix");
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let ctx = linux_ctx(&prefix).top_level_ref("v2.14.1");
        let plan = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("pyoptsparse").unwrap(), &runner, &work);

        let out = run(&stage).unwrap();
        assert_eq!(out.pip_packages, vec!["cyipopt", "pyoptsparse"]);
        assert!(out.conda_packages.is_empty());

        let calls = runner.calls.borrow();
        let lines: Vec<String> = calls.iter().map(Invocation::command_line).collect();
        assert!(lines[0].starts_with("git clone -q -b v2.14.1 "));
        assert_eq!(lines[1], "pip install Cython");
        assert_eq!(lines[2], "pip install cyipopt --use-pep517");
        assert_eq!(lines[3], "pip install --no-cache-dir ./");

        let pkg_config = calls[2].env_value("PKG_CONFIG_PATH").unwrap();
        assert!(pkg_config.ends_with("prefix/lib/pkgconfig"));
        let install = &calls[3];
        assert_eq!(
            install.env_value("IPOPT_LIB"),
            Some(prefix.join("lib").display().to_string().as_str())
        );
        assert!(install.env_value("IPOPT_INC").unwrap().ends_with("coin-or"));
        assert_eq!(install.cwd.as_deref(), Some(work.join("pyoptsparse").as_path()));
    }

    #[test]
    fn test_top_level_recipe_skips_cyipopt_before_2_14() {
        let dir = TempDir::new().unwrap();
        let ctx = linux_ctx(dir.path());
        let plan = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("pyoptsparse").unwrap(), &runner, dir.path());

        let out = run(&stage).unwrap();
        assert_eq!(out.pip_packages, vec!["pyoptsparse"]);
        assert!(!runner
            .calls
            .borrow()
            .iter()
            .any(|c| c.args.iter().any(|a| a == "cyipopt")));
    }

    #[test]
    fn test_cyipopt_follows_ipopt_install_mode() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("prefix");
        let ctx = linux_ctx(&prefix)
            .top_level_ref("v2.14.1")
            .mode(EnvMode::PackageManager {
                root: prefix.clone(),
                name: None,
            })
            .helper(Some(BinaryHelper {
                program: "conda".to_string(),
                accelerated: false,
                forge_available: true,
            }));
        let plan = plan_for(&Selection::with_variant(LinearSolver::Mumps), &ctx);
        let step = plan.step("pyoptsparse").unwrap();

        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, step, &runner, dir.path())
            .with_binary_units(vec!["metis", "mumps", "ipopt"]);
        let out = run(&stage).unwrap();
        assert_eq!(out.conda_packages, vec!["cyipopt"]);
        assert_eq!(out.pip_packages, vec!["pyoptsparse"]);
        let lines: Vec<String> =
            runner.calls.borrow().iter().map(Invocation::command_line).collect();
        assert!(lines.contains(&"conda install -q -y cyipopt".to_string()));

        // IPOPT built here even though conda-forge could have supplied it
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, step, &runner, dir.path())
            .with_binary_units(vec!["metis", "mumps"]);
        let out = run(&stage).unwrap();
        assert!(out.conda_packages.is_empty());
        assert_eq!(out.pip_packages, vec!["cyipopt", "pyoptsparse"]);
        let lines: Vec<String> =
            runner.calls.borrow().iter().map(Invocation::command_line).collect();
        assert!(lines.contains(&"pip install cyipopt --use-pep517".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("conda ")));
    }

    #[test]
    fn test_top_level_recipe_without_ipopt() {
        let dir = TempDir::new().unwrap();
        let ctx = linux_ctx(dir.path()).top_level_ref("v2.14.1");
        let selection = Selection {
            no_ipopt: true,
            paropt: true,
            ..Selection::with_variant(LinearSolver::Mumps)
        };
        let plan = plan_for(&selection, &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("pyoptsparse").unwrap(), &runner, dir.path());

        let out = run(&stage).unwrap();
        assert_eq!(out.pip_packages, vec!["pyoptsparse"]);
        let calls = runner.calls.borrow();
        let lines: Vec<String> = calls.iter().map(Invocation::command_line).collect();
        assert_eq!(lines[1..], ["pip install --no-cache-dir ./".to_string()]);
        assert!(calls[1].env_value("IPOPT_INC").is_none());
        assert!(calls[1].env_value("CFLAGS").is_some());
    }

    #[test]
    fn test_snopt_recipe_collects_sources() {
        let dir = TempDir::new().unwrap();
        let snopt = dir.path().join("snopt7");
        std::fs::create_dir_all(snopt.join("src")).unwrap();
        std::fs::write(snopt.join("src/snoptc.f"), "").unwrap();
        std::fs::write(snopt.join("src/sn10mach.f"), "").unwrap();

        let work = dir.path().join("work");
        let ctx = linux_ctx(&dir.path().join("prefix"));
        let selection = Selection {
            snopt_dir: Some(snopt),
            ..Selection::with_variant(LinearSolver::Mumps)
        };
        let plan = plan_for(&selection, &ctx);
        let runner = Recorder::default();
        let stage = Stage::new(&ctx, &plan, plan.step("snopt").unwrap(), &runner, &work);

        run(&stage).unwrap();
        assert!(work.join("snopt/snoptc.f").is_file());
        assert!(work.join("snopt/sn10mach.f").is_file());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_marker_header() {
        let dir = TempDir::new().unwrap();
        let ctx = InstallContext::with_prefix(dir.path());
        let metis = crate::core::registry::unit("metis").unwrap();
        assert!(marker_header(&ctx, metis).is_none());

        let header = dir.path().join("include/coin-or/metis/metis.h");
        std::fs::create_dir_all(header.parent().unwrap()).unwrap();
        std::fs::write(&header, "").unwrap();
        assert_eq!(marker_header(&ctx, metis), Some(header));

        let snopt = crate::core::registry::unit("snopt").unwrap();
        assert!(marker_header(&ctx, snopt).is_none());
    }
}
