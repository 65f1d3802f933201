//! Binary installs through the conda-compatible package helper.

use crate::core::context::InstallContext;
use crate::core::output::{self, ProgressGuard};

use super::error::ExecuteError;
use super::runner::{self, CommandRunner, Invocation};

/// `<helper> install -q -y <pkg>` for each package, stopping at the first failure.
/// Returns the packages installed.
pub fn install_packages(
    runner: &dyn CommandRunner,
    ctx: &InstallContext,
    packages: &[&str],
) -> Result<Vec<String>, ExecuteError> {
    let helper = ctx
        .helper_program()
        .ok_or_else(|| ExecuteError::NoPackageHelper(packages.join(" ")))?;

    let mut installed = Vec::new();
    for package in packages {
        let label = format!("{} install {}", helper, package);
        output::sub_action(&label);
        let _guard = ProgressGuard::start(&label, ctx.verbose);
        let inv = Invocation::new(helper).args(["install", "-q", "-y", *package]);
        runner::run_checked(runner, &inv)?;
        installed.push(package.to_string());
    }
    Ok(installed)
}
