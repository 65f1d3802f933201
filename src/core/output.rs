//! Colored output and progress reporting.
//!
//! Uses owo-colors for terminal colors and indicatif for spinners.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Print an action header (blue, bold)
/// Example: "==> Building IPOPT"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print an action with a step counter
/// Example: "(2/4) mumps"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message.bold()
    );
}

/// Print a sub-action (cyan arrow)
/// Example: "  -> configure"
pub fn sub_action(phase: &str) {
    println!("  {} {}", "->".cyan(), phase);
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print a skip message (dimmed)
/// Example: "==> metis already installed, skipping"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Print a `NAME: value` pair, used for the environment summary
pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", format!("{}:", key).cyan(), value);
}

/// Print a line the operator is expected to copy (bold, not dimmed)
pub fn command_hint(line: &str) {
    println!("     {}", line.bold());
}

const BANNER_RULE: &str =
    "------------------------------------------------------------------------";

/// Delimited failure banner for orchestrator-level errors.
///
/// `tool_output` is the captured stderr of a failing external tool, printed
/// below the banner so it cannot be mistaken for our own message.
pub fn failure_banner(message: &str, tool_output: Option<&str>) {
    eprintln!("{}", BANNER_RULE.red());
    eprintln!("{} {}", "error:".red().bold(), message.red().bold());
    eprintln!("{}", BANNER_RULE.red());
    if let Some(out) = tool_output {
        eprintln!("{}", "tool output:".dimmed());
        for line in out.trim_end().lines() {
            eprintln!("  {}", line);
        }
        eprintln!("{}", BANNER_RULE.dimmed());
    }
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

/// Create a spinner for a long-running external step
pub fn build_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style("  {spinner:.cyan} {msg}"));
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Clears its spinner when dropped, including on early returns via `?`.
pub struct ProgressGuard(Option<ProgressBar>);

impl ProgressGuard {
    /// A spinner unless `quiet`; verbose runs stream tool output instead.
    pub fn start(message: &str, quiet: bool) -> Self {
        if quiet {
            Self(None)
        } else {
            Self(Some(build_spinner(message)))
        }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(pb) = self.0.take() {
            pb.finish_and_clear();
        }
    }
}
