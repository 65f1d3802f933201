//! Scripted command runner for end-to-end tests.
//!
//! Every external tool resolves to a path below a scratch `bin/` directory and
//! succeeds unless told otherwise. `git clone` creates the destination, and
//! `make install` in a unit's source tree drops that unit's marker header and
//! library into the prefix, so the executor sees what a real build leaves.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use build_pyoptsparse::core::env::EnvProbe;
use build_pyoptsparse::executor::{CommandOutput, CommandRunner, Invocation};
use build_pyoptsparse::{Installer, Options, RunOutcome};
use tempfile::TempDir;

pub struct ScriptedRunner {
    pub prefix: PathBuf,
    bin: PathBuf,
    missing: HashSet<String>,
    /// Command-line substring that fails, with its exit status and stderr
    fail_on: Option<(String, i32, String)>,
    forge: bool,
    pub calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new(prefix: impl Into<PathBuf>, bin: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            bin: bin.into(),
            missing: HashSet::new(),
            fail_on: None,
            forge: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn without(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    pub fn fail_on(mut self, needle: &str, code: i32, stderr: &str) -> Self {
        self.fail_on = Some((needle.to_string(), code, stderr.to_string()));
        self
    }

    /// `conda info --unsafe-channels` reports conda-forge.
    pub fn with_forge(mut self) -> Self {
        self.forge = true;
        self
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::command_line).collect()
    }

    /// Invocations whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }

    fn install_unit(&self, unit: &str) {
        let (header, lib) = match unit {
            "metis" => (Some("metis/metis.h"), "libcoinmetis.so"),
            "mumps" => (Some("mumps/mumps_c_types.h"), "libcoinmumps.so"),
            "hsl" => (Some("hsl/CoinHslConfig.h"), "libcoinhsl.so"),
            "ipopt" => (Some("IpoptConfig.h"), "libipopt.so"),
            _ => (None, "libother.so"),
        };
        let coin = self.prefix.join("include/coin-or");
        if let Some(header) = header {
            let path = coin.join(header);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        if unit == "ipopt" {
            fs::write(coin.join("IpIpoptApplication.hpp"), "").unwrap();
        }
        fs::create_dir_all(self.prefix.join("lib")).unwrap();
        fs::write(self.prefix.join("lib").join(lib), "").unwrap();
    }

    fn simulate(&self, invocation: &Invocation) {
        let args = &invocation.args;
        if invocation.program == "git" && args.first().map(String::as_str) == Some("clone") {
            let dest = PathBuf::from(args.last().unwrap());
            fs::create_dir_all(&dest).unwrap();
            match dest.file_name().and_then(|n| n.to_str()) {
                Some("paropt") => {
                    fs::write(dest.join("Makefile.in.info"), "").unwrap();
                    fs::create_dir_all(dest.join("lib")).unwrap();
                    fs::write(dest.join("lib/libparopt.so"), "").unwrap();
                }
                Some("pyoptsparse") => {
                    let setup = dest.join("pyoptsparse/pyIPOPT/setup.py");
                    fs::create_dir_all(setup.parent().unwrap()).unwrap();
                    let body = concat!(
                        "config.add_extension(\"pyipoptcore\",\n",
                        "    libraries=[\"ipopt\", \"coinblas\", \"coinlapack\"],\n",
                        ")\n",
                    );
                    fs::write(setup, body).unwrap();
                }
                _ => {}
            }
        }
        if args.iter().any(|a| a == "install")
            && invocation.program == "make"
            && let Some(unit) = invocation
                .cwd
                .as_deref()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
        {
            self.install_unit(unit);
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        let line = invocation.command_line();

        if let Some((needle, code, stderr)) = &self.fail_on
            && line.contains(needle.as_str())
        {
            return Ok(CommandOutput::failure(*code, stderr.clone()));
        }

        let program = Path::new(&invocation.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let first = invocation.args.first().map(String::as_str);
        let stdout = match (program, first) {
            ("gcc", Some("-dumpversion")) => "12.2.0\n",
            ("gcc", Some("--version")) => "gcc (GCC) 12.2.0\n",
            ("make", Some("--version")) => "GNU Make 4.3\n",
            ("python", Some("-c")) => "2.1.0\n",
            ("conda", Some("info")) if self.forge => {
                "channels:\n  https://conda.anaconda.org/conda-forge\n"
            }
            _ => "",
        };

        self.simulate(invocation);
        Ok(CommandOutput::success().with_stdout(stdout))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        (!self.missing.contains(program)).then(|| self.bin.join(program))
    }
}

/// Scratch layout for one run: prefix, fixed working root, tool directory.
pub struct Sandbox {
    pub dir: TempDir,
    pub prefix: PathBuf,
    pub work: PathBuf,
    pub bin: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        Self {
            prefix: dir.path().join("prefix"),
            work: dir.path().join("work"),
            bin,
            dir,
        }
    }

    /// Plain `make` and `conda`: no `gmake`, no `mamba`.
    pub fn runner(&self) -> ScriptedRunner {
        ScriptedRunner::new(&self.prefix, &self.bin)
            .without("gmake")
            .without("mamba")
    }

    /// Options for a non-interactive run into this sandbox.
    pub fn options(&self) -> Options {
        Options {
            prefix: Some(self.prefix.clone()),
            build_dir: Some(self.work.clone()),
            assume_yes: true,
            jobs: Some(4),
            ..Default::default()
        }
    }
}

pub fn empty_env() -> EnvProbe {
    EnvProbe::from_vars(Vec::<(String, String)>::new())
}

pub fn run(opts: Options, runner: &ScriptedRunner) -> Result<RunOutcome, build_pyoptsparse::Error> {
    Installer::new(opts, runner).with_probe(empty_env()).run()
}
