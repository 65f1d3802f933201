//! Build planning: from a linear-solver variant and add-on flags to an ordered
//! list of steps.
//!
//! Everything that can be decided without touching the filesystem or network is
//! decided here. A returned [`BuildPlan`] is only ever read afterwards.

use std::path::PathBuf;

use semver::Version;
use thiserror::Error;

use super::context::InstallContext;
use super::deps::{DepGraph, GraphError};
use super::options::{CompilerSuite, LinearSolver, Options};
use super::patch::{self, PatchRule};
use super::registry::{self, AddOn, PackageUnit, Requirement, Role};
use super::version;

/// Oldest top-level ref that knows about ParOpt.
pub const PAROPT_MIN_TOP_LEVEL: (u64, u64, u64) = (2, 1, 2);

const KERNEL: &str = "ipopt";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("the HSL linear solver needs the HSL source archive (--hsl-tar-file)")]
    HslArchiveRequired,

    #[error("HSL source archive not found: {}", .0.display())]
    HslArchiveNotFound(PathBuf),

    #[error(
        "the {variant} linear solver requires the {expected} compiler suite, \
         but {found} is selected"
    )]
    SuiteMismatch {
        variant: LinearSolver,
        expected: CompilerSuite,
        found: CompilerSuite,
    },

    #[error("ParOpt needs pyOptSparse 2.1.2 or newer, but '{0}' was requested")]
    ParOptUnsupported(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// What the operator asked for, as far as planning is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub variant: LinearSolver,
    /// The Intel suite was explicitly requested
    pub intel: bool,
    pub paropt: bool,
    pub snopt_dir: Option<PathBuf>,
    pub hsl_archive: Option<PathBuf>,
    pub no_install: bool,
    /// Leave the kernel out of the plan
    pub no_ipopt: bool,
}

impl Selection {
    pub fn from_options(opts: &Options) -> Self {
        Self {
            variant: opts.linear_solver,
            intel: opts.intel,
            paropt: opts.paropt,
            snopt_dir: opts.snopt_dir.clone(),
            hsl_archive: opts.hsl_archive.clone(),
            no_install: opts.no_install,
            no_ipopt: opts.no_ipopt,
        }
    }

    pub fn with_variant(variant: LinearSolver) -> Self {
        Self {
            variant,
            ..Default::default()
        }
    }

    /// The suite this selection forces.
    pub fn required_suite(&self) -> CompilerSuite {
        if self.variant == LinearSolver::Pardiso || self.intel {
            CompilerSuite::Intel
        } else {
            CompilerSuite::Gnu
        }
    }

    /// Unit the top-level package links against: the kernel, or the
    /// linear solver when the kernel is left out.
    fn kernel_unit(&self) -> &'static str {
        if self.no_ipopt {
            registry::linear_solver_unit(self.variant).name
        } else {
            KERNEL
        }
    }

    fn add_on_selected(&self, add_on: AddOn) -> bool {
        match add_on {
            AddOn::ParOpt => self.paropt,
            AddOn::Snopt => self.snopt_dir.is_some(),
        }
    }
}

/// How a step obtains its unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireMode {
    Source,
    /// Install conda packages; optionally build from source if that fails
    Binary {
        packages: &'static [&'static str],
        fall_back: bool,
    },
}

/// Compiler environment a step runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPolicy {
    Export(CompilerSuite),
    /// `CC`/`CXX`/`FC` removed from the tool environment
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub unit: &'static PackageUnit,
    /// Branch or tag to check out (empty for units without a repository)
    pub reference: String,
    /// Operator-supplied local input (HSL archive, SNOPT directory)
    pub local: Option<PathBuf>,
    pub mode: AcquireMode,
    pub toolchain: ToolchainPolicy,
}

impl PlanStep {
    pub fn name(&self) -> &'static str {
        self.unit.name
    }
}

/// The closing message of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    /// Export the library search path
    LibraryPath,
    /// Library search path plus how to build the top-level package by hand
    ManualTopLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub variant: LinearSolver,
    pub suite: CompilerSuite,
    pub steps: Vec<PlanStep>,
    /// Substitution for the top-level package's build description
    pub patch: Option<&'static PatchRule>,
    /// Unit before which the compiler-suite environment is cleared
    pub clear_toolchain_before: Option<&'static str>,
    pub guidance: Guidance,
    /// Operator's SNOPT directory, kept even when no planned step uses it
    pub snopt_dir: Option<PathBuf>,
}

impl BuildPlan {
    pub fn unit_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(PlanStep::name).collect()
    }

    pub fn step(&self, name: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name() == name)
    }

    pub fn includes(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Any step builds from source (compilers and git are needed).
    pub fn needs_source_build(&self) -> bool {
        self.steps.iter().any(|s| match &s.mode {
            AcquireMode::Source => s.unit.role != Role::SecondarySolver
                && s.unit.recipe != registry::RecipeId::MklProvided,
            AcquireMode::Binary { fall_back, .. } => *fall_back,
        })
    }

    pub fn builds_top_level(&self) -> bool {
        self.includes("pyoptsparse")
    }

    /// IPOPT is part of this plan.
    pub fn includes_kernel(&self) -> bool {
        self.includes(KERNEL)
    }
}

/// Dependencies of `unit` under this selection. Unselected add-ons drop out.
fn resolve_requirements(unit: &PackageUnit, selection: &Selection) -> Vec<String> {
    unit.requires
        .iter()
        .filter_map(|req| match req {
            Requirement::Unit(KERNEL) => Some(selection.kernel_unit().to_string()),
            Requirement::Unit(name) => Some(name.to_string()),
            Requirement::ActiveLinearSolver => {
                Some(registry::linear_solver_unit(selection.variant).name.to_string())
            }
            Requirement::AddOn(add_on) => selection
                .add_on_selected(*add_on)
                .then(|| registry::add_on_unit(*add_on).to_string()),
        })
        .collect()
}

/// Units that take part in this selection.
fn selected_units(selection: &Selection) -> impl Iterator<Item = &'static PackageUnit> + '_ {
    registry::CATALOG.iter().filter(move |u| match u.role {
        Role::LinearSolver(v) => v == selection.variant,
        Role::ParOpt => selection.paropt,
        Role::SecondarySolver => selection.snopt_dir.is_some(),
        Role::Kernel => !selection.no_ipopt,
        Role::Partitioning | Role::TopLevel => true,
    })
}

/// Compute the ordered plan.
///
/// Precondition failures are reported before any filesystem or network
/// activity, so a failed plan leaves no trace.
pub fn plan(selection: &Selection, ctx: &InstallContext) -> Result<BuildPlan, PlanError> {
    if selection.variant == LinearSolver::Hsl {
        match &selection.hsl_archive {
            None => return Err(PlanError::HslArchiveRequired),
            Some(path) if !path.is_file() => {
                return Err(PlanError::HslArchiveNotFound(path.clone()));
            }
            Some(_) => {}
        }
    }

    let expected = selection.required_suite();
    if ctx.toolchain.suite != expected {
        return Err(PlanError::SuiteMismatch {
            variant: selection.variant,
            expected,
            found: ctx.toolchain.suite,
        });
    }

    if selection.paropt {
        let (major, minor, patch) = PAROPT_MIN_TOP_LEVEL;
        if version::ref_older_than(&ctx.top_level_ref, &Version::new(major, minor, patch)) {
            return Err(PlanError::ParOptUnsupported(ctx.top_level_ref.clone()));
        }
    }

    let mut graph = DepGraph::new();
    for unit in selected_units(selection) {
        graph.add_unit(unit.name, resolve_requirements(unit, selection));
    }

    let mut targets = Vec::new();
    if selection.no_install {
        targets.push(selection.kernel_unit());
        if selection.paropt {
            targets.push("paropt");
        }
    } else {
        targets.push("pyoptsparse");
    }
    let order = graph.topological_sort(&targets)?;

    let clears_toolchain = selection.variant == LinearSolver::Pardiso;
    let binaries = ctx.binary_installs_allowed();

    let mut steps = Vec::with_capacity(order.len());
    for name in &order {
        let unit = registry::unit(name).ok_or_else(|| GraphError::NotFound(name.clone()))?;

        let reference = match unit.role {
            Role::TopLevel => ctx.top_level_ref.clone(),
            _ => unit.git_ref().unwrap_or_default().to_string(),
        };
        let local = match unit.role {
            Role::LinearSolver(LinearSolver::Hsl) => selection.hsl_archive.clone(),
            Role::SecondarySolver => selection.snopt_dir.clone(),
            _ => None,
        };
        let mode = match unit.binary {
            Some(alt) if binaries && alt.usable_with(selection.variant) => AcquireMode::Binary {
                packages: alt.packages,
                fall_back: ctx.fall_back,
            },
            _ => AcquireMode::Source,
        };
        let toolchain = if clears_toolchain && unit.role == Role::TopLevel {
            ToolchainPolicy::Cleared
        } else {
            ToolchainPolicy::Export(expected)
        };

        steps.push(PlanStep {
            unit,
            reference,
            local,
            mode,
            toolchain,
        });
    }

    let builds_top_level = !selection.no_install;
    Ok(BuildPlan {
        variant: selection.variant,
        suite: expected,
        patch: builds_top_level
            .then(|| patch::select(selection.variant, &ctx.top_level_ref))
            .flatten(),
        clear_toolchain_before: (clears_toolchain && builds_top_level).then_some("pyoptsparse"),
        guidance: if builds_top_level {
            Guidance::LibraryPath
        } else {
            Guidance::ManualTopLevel
        },
        snopt_dir: selection.snopt_dir.clone(),
        steps,
    })
}
