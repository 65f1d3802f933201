//! The immutable install context shared by every component of a run.

use std::path::{Path, PathBuf};

use semver::Version;

use super::env::{self, BinaryHelper, EnvMode, EnvProbe};
use super::options::{CompilerSuite, Options};
use super::version;
use crate::executor::{CommandRunner, Invocation};

/// pyOptSparse release used with numpy 2.x (and when numpy is absent).
pub const DEFAULT_TOP_LEVEL_REF: &str = "v2.13.1";
/// Last pyOptSparse release that builds against numpy 1.x.
pub const NUMPY1_TOP_LEVEL_REF: &str = "v2.10.1";

/// Operating system family, for shared-library conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }

    /// Dynamic linker search-path variable.
    pub fn library_path_var(self) -> &'static str {
        match self {
            Self::MacOs => "DYLD_LIBRARY_PATH",
            _ => "LD_LIBRARY_PATH",
        }
    }

    pub fn shared_lib_ext(self) -> &'static str {
        match self {
            Self::MacOs => "dylib",
            _ => "so",
        }
    }
}

/// Resolved compiler commands for the selected suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub suite: CompilerSuite,
    pub cc: String,
    pub cxx: String,
    pub fc: String,
    /// Major version of `gcc`, when the GNU suite is used
    pub gnu_major: Option<u32>,
    /// `gcc` is really Apple clang (no OpenMP)
    pub apple_clang: bool,
}

impl Toolchain {
    /// Suite defaults without any probing.
    pub fn defaults(suite: CompilerSuite) -> Self {
        let (cc, cxx, fc) = suite.default_compilers();
        Self {
            suite,
            cc: cc.to_string(),
            cxx: cxx.to_string(),
            fc: fc.to_string(),
            gnu_major: None,
            apple_clang: false,
        }
    }

    /// Honor `CC`/`CXX`/`FC` overrides and, for GNU, ask `gcc` about itself.
    pub fn resolve(suite: CompilerSuite, probe: &EnvProbe, runner: &dyn CommandRunner) -> Self {
        let (cc, cxx, fc) = suite.default_compilers();
        let mut toolchain = Self {
            suite,
            cc: probe.get("CC").unwrap_or(cc).to_string(),
            cxx: probe.get("CXX").unwrap_or(cxx).to_string(),
            fc: probe.get("FC").unwrap_or(fc).to_string(),
            gnu_major: None,
            apple_clang: false,
        };

        if suite == CompilerSuite::Gnu {
            let dump = Invocation::new("gcc").arg("-dumpversion");
            if let Ok(out) = runner.run(&dump)
                && out.succeeded()
            {
                toolchain.gnu_major = out
                    .stdout
                    .trim()
                    .split('.')
                    .next()
                    .and_then(|m| m.parse().ok());
            }
            let banner = Invocation::new("gcc").arg("--version");
            if let Ok(out) = runner.run(&banner) {
                toolchain.apple_clang = out.stdout.contains("Apple clang");
            }
        }

        toolchain
    }

    /// Variables exported to every stage that builds with this suite.
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("CC".to_string(), self.cc.clone()),
            ("CXX".to_string(), self.cxx.clone()),
            ("FC".to_string(), self.fc.clone()),
        ]
    }

    pub fn commands(&self) -> [&str; 3] {
        [&self.cc, &self.cxx, &self.fc]
    }
}

/// Everything downstream components need to know about where and how to build.
///
/// Created once, then only read.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub prefix: PathBuf,
    pub mode: EnvMode,
    pub toolchain: Toolchain,
    /// Parallelism hint handed to make
    pub jobs: usize,
    pub verbose: bool,
    pub make: String,
    /// Packaging command split into words (`["uv", "pip"]`)
    pub pip: Vec<String>,
    pub python: Option<PathBuf>,
    /// conda/mamba, only in a conda environment
    pub helper: Option<BinaryHelper>,
    pub host: HostOs,
    /// pyOptSparse branch or tag
    pub top_level_ref: String,
    pub force_build: bool,
    pub fall_back: bool,
    pub keep_build_dir: bool,
    /// `PKG_CONFIG_PATH` inherited from the caller
    pub pkg_config_path: Option<String>,
    pub mkl_root: Option<PathBuf>,
}

impl InstallContext {
    /// A context for `prefix` with GNU defaults and no environment. Mostly for tests
    /// and embedding; the CLI goes through [`InstallContext::resolve`].
    pub fn with_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            mode: EnvMode::System,
            toolchain: Toolchain::defaults(CompilerSuite::Gnu),
            jobs: 1,
            verbose: false,
            make: "make".to_string(),
            pip: vec!["pip".to_string()],
            python: None,
            helper: None,
            host: HostOs::current(),
            top_level_ref: DEFAULT_TOP_LEVEL_REF.to_string(),
            force_build: false,
            fall_back: false,
            keep_build_dir: false,
            pkg_config_path: None,
            mkl_root: None,
        }
    }

    pub fn mode(mut self, mode: EnvMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn helper(mut self, helper: Option<BinaryHelper>) -> Self {
        self.helper = helper;
        self
    }

    pub fn host(mut self, host: HostOs) -> Self {
        self.host = host;
        self
    }

    pub fn top_level_ref(mut self, reference: impl Into<String>) -> Self {
        self.top_level_ref = reference.into();
        self
    }

    pub fn python(mut self, python: Option<PathBuf>) -> Self {
        self.python = python;
        self
    }

    pub fn force_build(mut self, force: bool) -> Self {
        self.force_build = force;
        self
    }

    pub fn fall_back(mut self, fall_back: bool) -> Self {
        self.fall_back = fall_back;
        self
    }

    pub fn keep_build_dir(mut self, keep: bool) -> Self {
        self.keep_build_dir = keep;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Detect the environment and toolchain for `opts`.
    ///
    /// Never fails: a missing environment just means the system prefix, and
    /// missing tools are reported later by the capability checker.
    pub fn resolve(opts: &Options, probe: &EnvProbe, runner: &dyn CommandRunner) -> Self {
        let mode = probe.detect_mode(opts.ignore_conda);
        let prefix = env::select_prefix(&mode, opts.prefix.as_deref());
        let helper = env::detect_helper(
            &mode,
            runner,
            opts.conda_cmd.as_deref(),
            opts.ignore_mamba,
            !opts.uninstall,
        );

        let make = match probe.get("MAKE") {
            Some(make) => make.to_string(),
            None if runner.locate("gmake").is_some() => "gmake".to_string(),
            None => "make".to_string(),
        };

        let python = runner
            .locate("python")
            .or_else(|| runner.locate("python3"));
        let top_level_ref = opts
            .branch
            .clone()
            .unwrap_or_else(|| default_top_level_ref(runner, python.as_deref()));

        Self {
            prefix,
            mode,
            toolchain: Toolchain::resolve(opts.compiler_suite(), probe, runner),
            jobs: opts.jobs.unwrap_or_else(default_jobs).max(1),
            verbose: opts.verbose,
            make,
            pip: opts.pip_command(),
            python,
            helper,
            host: HostOs::current(),
            top_level_ref,
            force_build: opts.force_build,
            fall_back: opts.fall_back,
            keep_build_dir: opts.keep_build_dir,
            pkg_config_path: probe.get("PKG_CONFIG_PATH").map(String::from),
            mkl_root: probe.get("MKLROOT").map(PathBuf::from),
        }
    }

    /// An active conda environment with conda-forge configured.
    pub fn conda_forge_usable(&self) -> bool {
        self.mode.is_package_manager() && self.helper.as_ref().is_some_and(|h| h.forge_available)
    }

    /// conda binaries may replace source builds.
    pub fn binary_installs_allowed(&self) -> bool {
        !self.force_build && self.conda_forge_usable()
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.prefix.join("include")
    }

    /// The COIN-OR include directory (`coin-or`, or the older `coin`) if it exists.
    pub fn coin_include_dir(&self) -> Option<PathBuf> {
        ["coin-or", "coin"]
            .into_iter()
            .map(|d| self.include_dir().join(d))
            .find(|p| p.is_dir())
    }

    /// COIN-OR include directory, falling back to where it will be created.
    pub fn coin_include_dir_or_default(&self) -> PathBuf {
        self.coin_include_dir()
            .unwrap_or_else(|| self.include_dir().join("coin-or"))
    }

    /// Library name as installed: `coin<pkg>` for COIN-OR ThirdParty builds,
    /// plain `<pkg>` for conda packages.
    pub fn installed_lib_name(&self, pkg: &str) -> Option<String> {
        for stem in [format!("coin{pkg}"), pkg.to_string()] {
            let pattern = self.lib_dir().join(format!("lib{stem}*"));
            let found = glob::glob(&pattern.to_string_lossy())
                .map(|paths| paths.flatten().next().is_some())
                .unwrap_or(false);
            if found {
                return Some(stem);
            }
        }
        None
    }

    /// Library name to link against, assuming the ThirdParty name when nothing is installed yet.
    pub fn lib_name(&self, pkg: &str) -> String {
        self.installed_lib_name(pkg)
            .unwrap_or_else(|| format!("coin{pkg}"))
    }

    /// The line the operator must run before using the installation.
    pub fn library_path_export(&self) -> String {
        format!(
            "export {}={}",
            self.host.library_path_var(),
            self.lib_dir().display()
        )
    }

    /// `PKG_CONFIG_PATH` extended with the prefix's pkgconfig directory.
    pub fn pkg_config_path_with_prefix(&self) -> String {
        let own = self.lib_dir().join("pkgconfig");
        match &self.pkg_config_path {
            Some(existing) => format!("{}:{}", existing, own.display()),
            None => own.display().to_string(),
        }
    }

    pub fn top_level_version(&self) -> Option<Version> {
        version::parse_ref(&self.top_level_ref)
    }

    /// Location of the install record for this prefix.
    pub fn record_path(&self) -> PathBuf {
        super::record::record_path(&self.prefix)
    }

    /// The helper command for removals, preferring the detected accelerated one.
    pub fn helper_program(&self) -> Option<&str> {
        self.helper.as_ref().map(|h| h.program.as_str())
    }

    pub fn prefix_is(&self, path: &Path) -> bool {
        self.prefix == path
    }
}

/// Half of the detected processors, at least one.
pub fn default_jobs() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// pyOptSparse ref matching the numpy found next to `python`.
pub fn default_top_level_ref(runner: &dyn CommandRunner, python: Option<&Path>) -> String {
    let Some(python) = python else {
        return DEFAULT_TOP_LEVEL_REF.to_string();
    };
    let inv = Invocation::new(python.display().to_string())
        .args(["-c", "import numpy; print(numpy.__version__)"]);
    match runner.run(&inv) {
        Ok(out) if out.succeeded() => {
            match version::parse_ref(out.stdout.trim()) {
                Some(v) if v.major < 2 => NUMPY1_TOP_LEVEL_REF.to_string(),
                _ => DEFAULT_TOP_LEVEL_REF.to_string(),
            }
        }
        _ => DEFAULT_TOP_LEVEL_REF.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandOutput;
    use tempfile::TempDir;

    struct Scripted {
        stdout: &'static str,
    }

    impl CommandRunner for Scripted {
        fn run(&self, _invocation: &Invocation) -> std::io::Result<CommandOutput> {
            Ok(CommandOutput::success().with_stdout(self.stdout))
        }

        fn locate(&self, _program: &str) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_toolchain_overrides() {
        let probe = EnvProbe::from_vars([("CC", "clang"), ("FC", "flang")]);
        let tc = Toolchain::resolve(CompilerSuite::Gnu, &probe, &Scripted { stdout: "12.2.0" });
        assert_eq!(tc.cc, "clang");
        assert_eq!(tc.cxx, "g++");
        assert_eq!(tc.fc, "flang");
        assert_eq!(tc.gnu_major, Some(12));
    }

    #[test]
    fn test_intel_defaults() {
        let tc = Toolchain::resolve(
            CompilerSuite::Intel,
            &EnvProbe::default(),
            &Scripted { stdout: "" },
        );
        assert_eq!(tc.commands(), ["icc", "icpc", "ifort"]);
        assert_eq!(tc.gnu_major, None);
    }

    #[test]
    fn test_numpy1_selects_older_release() {
        let python = PathBuf::from("/usr/bin/python");
        assert_eq!(
            default_top_level_ref(&Scripted { stdout: "1.26.4\n" }, Some(&python)),
            NUMPY1_TOP_LEVEL_REF
        );
        assert_eq!(
            default_top_level_ref(&Scripted { stdout: "2.1.0\n" }, Some(&python)),
            DEFAULT_TOP_LEVEL_REF
        );
        assert_eq!(
            default_top_level_ref(&Scripted { stdout: "" }, None),
            DEFAULT_TOP_LEVEL_REF
        );
    }

    #[test]
    fn test_resolve_uses_conda_prefix() {
        let probe = EnvProbe::from_vars([("CONDA_PREFIX", "/opt/conda/envs/x")]);
        let opts = Options {
            prefix: Some(PathBuf::from("/ignored")),
            jobs: Some(0),
            ..Default::default()
        };
        let ctx = InstallContext::resolve(&opts, &probe, &Scripted { stdout: "" });
        assert_eq!(ctx.prefix, PathBuf::from("/opt/conda/envs/x"));
        assert_eq!(ctx.jobs, 1);
        assert!(ctx.mode.is_package_manager());
        // channel listing without conda-forge
        assert!(!ctx.binary_installs_allowed());
    }

    #[test]
    fn test_lib_name_detection() {
        let dir = TempDir::new().unwrap();
        let ctx = InstallContext::with_prefix(dir.path());
        assert_eq!(ctx.lib_name("metis"), "coinmetis");

        std::fs::create_dir_all(ctx.lib_dir()).unwrap();
        std::fs::write(ctx.lib_dir().join("libmetis.so"), "").unwrap();
        assert_eq!(ctx.installed_lib_name("metis").as_deref(), Some("metis"));

        std::fs::write(ctx.lib_dir().join("libcoinmetis.so.2"), "").unwrap();
        assert_eq!(ctx.lib_name("metis"), "coinmetis");
    }

    #[test]
    fn test_library_path_export() {
        let ctx = InstallContext::with_prefix("/opt/pos").host(HostOs::Linux);
        assert_eq!(
            ctx.library_path_export(),
            "export LD_LIBRARY_PATH=/opt/pos/lib"
        );
        let mac = InstallContext::with_prefix("/opt/pos").host(HostOs::MacOs);
        assert!(mac.library_path_export().starts_with("export DYLD_LIBRARY_PATH="));
    }

    #[test]
    fn test_pkg_config_path_appends() {
        let mut ctx = InstallContext::with_prefix("/p");
        assert_eq!(ctx.pkg_config_path_with_prefix(), "/p/lib/pkgconfig");
        ctx.pkg_config_path = Some("/usr/lib/pkgconfig".to_string());
        assert_eq!(
            ctx.pkg_config_path_with_prefix(),
            "/usr/lib/pkgconfig:/p/lib/pkgconfig"
        );
    }
}
