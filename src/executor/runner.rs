//! Process seam: every external tool (git, tar, configure, make, pip, conda,
//! compilers) is started through a [`CommandRunner`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::error::ExecuteError;

/// One external command with its working directory and explicit environment.
///
/// The orchestrator never mutates its own process environment; whatever a tool
/// needs is attached here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub env_remove: Vec<String>,
    /// When false, any exit status is accepted
    pub checked: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            checked: true,
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn unchecked(mut self) -> Self {
        self.checked = false;
        self
    }

    /// Value of an attached environment variable (last assignment wins).
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Printable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `code` counts as success for this invocation.
    pub fn accepts(&self, code: Option<i32>) -> bool {
        !self.checked || code == Some(0)
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

/// Starts external tools and resolves commands on the search path.
pub trait CommandRunner {
    /// Run the command to completion. Only failures to start are errors here;
    /// exit statuses are judged by [`run_checked`].
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;

    /// Resolve a command name on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Run and turn a rejected exit status into [`ExecuteError::CommandFailed`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput, ExecuteError> {
    let output = runner
        .run(invocation)
        .map_err(|source| ExecuteError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

    if !invocation.accepts(output.code) {
        return Err(ExecuteError::CommandFailed {
            cmd: invocation.command_line(),
            code: output.code,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Echo command lines and stream tool output
    pub verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        if self.verbose {
            eprintln!("[exec] {}", invocation.command_line());
        }

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        for key in &invocation.env_remove {
            cmd.env_remove(key);
        }
        cmd.envs(invocation.env.iter().map(|(k, v)| (k, v)));

        let output = cmd.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if self.verbose {
            if !stdout.is_empty() {
                print!("{}", stdout);
            }
            if !stderr.is_empty() {
                eprint!("{}", stderr);
            }
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout,
            stderr,
        })
    }
}

/// Shell-quote a value for display.
pub fn shell_quote(s: impl std::fmt::Display) -> String {
    let s = s.to_string();
    if !s.is_empty()
        && s.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':' | ',' | '+')
        })
    {
        s
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(CommandOutput);

    impl CommandRunner for Canned {
        fn run(&self, _invocation: &Invocation) -> std::io::Result<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("simple"), "simple");
        assert_eq!(shell_quote("--prefix=/opt/x"), "--prefix=/opt/x");
        assert_eq!(shell_quote("has space"), "'has space'");
        assert_eq!(shell_quote("has'quote"), "'has'\"'\"'quote'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("make").arg("install").arg("CFLAGS=-w -O2");
        assert_eq!(inv.command_line(), "make install 'CFLAGS=-w -O2'");
    }

    #[test]
    fn test_accepts_only_zero_unless_unchecked() {
        let inv = Invocation::new("tool");
        assert!(inv.accepts(Some(0)));
        assert!(!inv.accepts(Some(3)));
        assert!(!inv.accepts(None));
        assert!(Invocation::new("tool").unchecked().accepts(Some(1)));
        assert!(Invocation::new("tool").unchecked().accepts(None));
    }

    #[test]
    fn test_run_checked_reports_status() {
        let runner = Canned(CommandOutput::failure(2, "boom"));
        let err = run_checked(&runner, &Invocation::new("make")).unwrap_err();
        assert_eq!(err.tool_status(), Some(2));
        assert_eq!(err.tool_stderr(), Some("boom"));
        assert!(err.to_string().contains("exit status: 2"));
    }

    #[test]
    fn test_env_value_last_wins() {
        let inv = Invocation::new("x").env("A", "1").env("A", "2");
        assert_eq!(inv.env_value("A"), Some("2"));
        assert_eq!(inv.env_value("B"), None);
    }
}
