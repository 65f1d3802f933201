//! The fixed catalog of installable units.
//!
//! Nothing here is user-extensible. Variant selection only picks which of the
//! three linear-solver units ends up in a plan.

use super::options::LinearSolver;

/// What a unit is for in the dependency skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Partitioning,
    LinearSolver(LinearSolver),
    Kernel,
    ParOpt,
    SecondarySolver,
    TopLevel,
}

/// Where a unit's sources come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRef {
    Git {
        url: &'static str,
        reference: &'static str,
    },
    /// Operator-supplied local directory (SNOPT)
    LocalDirectory,
    /// Shipped with the compiler suite; nothing to fetch
    Provided,
}

/// Build recipe each unit runs once its sources are in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeId {
    /// `get.<Name>` download script, configure, make install
    CoinThirdParty { fetch_script: &'static str },
    /// Clone the ThirdParty wrapper, unpack the HSL archive into it, configure
    CoinHsl,
    /// MKL's PARDISO comes with the Intel suite
    MklProvided,
    Ipopt,
    ParOpt,
    SnoptSources,
    PyOptSparse,
}

/// A dependency edge, resolved against the active selection at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Unit(&'static str),
    /// Whichever linear-solver unit the variant selects
    ActiveLinearSolver,
    /// Only when the add-on is selected
    AddOn(AddOn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddOn {
    ParOpt,
    Snopt,
}

/// conda packages that may replace a source build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryAlt {
    pub packages: &'static [&'static str],
    /// Only usable with this linear solver
    pub only_with: Option<LinearSolver>,
}

impl BinaryAlt {
    pub fn usable_with(&self, variant: LinearSolver) -> bool {
        self.only_with.is_none_or(|v| v == variant)
    }
}

/// Where a unit's files land below the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Artifacts {
    /// Below `include/{coin-or,coin}`; "." for the directory itself
    pub include_subdir: Option<&'static str>,
    /// Header whose presence means "already installed"
    pub include_file: Option<&'static str>,
    /// Headers installed loose into the include directory
    pub include_globs: &'static [&'static str],
    /// Below `lib/`
    pub lib_glob: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageUnit {
    pub name: &'static str,
    pub role: Role,
    pub source: SourceRef,
    pub recipe: RecipeId,
    pub requires: &'static [Requirement],
    pub binary: Option<BinaryAlt>,
    pub artifacts: Artifacts,
    /// The unit carries variant patches (see `core::patch`)
    pub patched: bool,
    /// Its build breaks under parallel make
    pub serial_build: bool,
}

impl PackageUnit {
    pub fn git_ref(&self) -> Option<&'static str> {
        match self.source {
            SourceRef::Git { reference, .. } => Some(reference),
            _ => None,
        }
    }

    pub fn git_url(&self) -> Option<&'static str> {
        match self.source {
            SourceRef::Git { url, .. } => Some(url),
            _ => None,
        }
    }
}

pub const CATALOG: &[PackageUnit] = &[
    PackageUnit {
        name: "metis",
        role: Role::Partitioning,
        source: SourceRef::Git {
            url: "https://github.com/coin-or-tools/ThirdParty-Metis.git",
            reference: "releases/2.0.0",
        },
        recipe: RecipeId::CoinThirdParty {
            fetch_script: "get.Metis",
        },
        requires: &[],
        binary: Some(BinaryAlt {
            packages: &["metis"],
            only_with: None,
        }),
        artifacts: Artifacts {
            include_subdir: Some("metis"),
            include_file: Some("metis.h"),
            include_globs: &[],
            lib_glob: Some("libcoinmetis*"),
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "mumps",
        role: Role::LinearSolver(LinearSolver::Mumps),
        source: SourceRef::Git {
            url: "https://github.com/coin-or-tools/ThirdParty-Mumps.git",
            reference: "releases/3.0.2",
        },
        recipe: RecipeId::CoinThirdParty {
            fetch_script: "get.Mumps",
        },
        requires: &[Requirement::Unit("metis")],
        binary: Some(BinaryAlt {
            packages: &["mumps-include", "mumps-seq", "mumps-mpi"],
            only_with: None,
        }),
        artifacts: Artifacts {
            include_subdir: Some("mumps"),
            include_file: Some("mumps_c_types.h"),
            include_globs: &[],
            lib_glob: Some("libcoinmumps*"),
        },
        patched: false,
        serial_build: true,
    },
    PackageUnit {
        name: "hsl",
        role: Role::LinearSolver(LinearSolver::Hsl),
        source: SourceRef::Git {
            url: "https://github.com/coin-or-tools/ThirdParty-HSL",
            reference: "releases/2.2.1",
        },
        recipe: RecipeId::CoinHsl,
        requires: &[Requirement::Unit("metis")],
        binary: None,
        artifacts: Artifacts {
            include_subdir: Some("hsl"),
            include_file: Some("CoinHslConfig.h"),
            include_globs: &[],
            lib_glob: Some("libcoinhsl*"),
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "pardiso",
        role: Role::LinearSolver(LinearSolver::Pardiso),
        source: SourceRef::Provided,
        recipe: RecipeId::MklProvided,
        requires: &[Requirement::Unit("metis")],
        binary: None,
        artifacts: Artifacts {
            include_subdir: None,
            include_file: None,
            include_globs: &[],
            lib_glob: None,
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "ipopt",
        role: Role::Kernel,
        source: SourceRef::Git {
            url: "https://github.com/coin-or/Ipopt.git",
            reference: "releases/3.14.7",
        },
        recipe: RecipeId::Ipopt,
        requires: &[Requirement::ActiveLinearSolver],
        binary: Some(BinaryAlt {
            packages: &["ipopt"],
            only_with: Some(LinearSolver::Mumps),
        }),
        artifacts: Artifacts {
            include_subdir: Some("."),
            include_file: Some("IpoptConfig.h"),
            include_globs: &["Ip*.hpp", "Sens*.hpp", "Ip*.h", "Ip*.inc"],
            lib_glob: Some("lib*ipopt*"),
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "paropt",
        role: Role::ParOpt,
        source: SourceRef::Git {
            url: "https://github.com/smdogroup/paropt.git",
            reference: "v2.1.4",
        },
        recipe: RecipeId::ParOpt,
        requires: &[Requirement::Unit("metis")],
        binary: None,
        artifacts: Artifacts {
            include_subdir: None,
            include_file: None,
            include_globs: &[],
            lib_glob: Some("libparopt*"),
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "snopt",
        role: Role::SecondarySolver,
        source: SourceRef::LocalDirectory,
        recipe: RecipeId::SnoptSources,
        requires: &[],
        binary: None,
        artifacts: Artifacts {
            include_subdir: None,
            include_file: None,
            include_globs: &[],
            lib_glob: None,
        },
        patched: false,
        serial_build: false,
    },
    PackageUnit {
        name: "pyoptsparse",
        role: Role::TopLevel,
        source: SourceRef::Git {
            url: "https://github.com/mdolab/pyoptsparse.git",
            reference: "v2.13.1",
        },
        recipe: RecipeId::PyOptSparse,
        requires: &[
            Requirement::Unit("ipopt"),
            Requirement::AddOn(AddOn::ParOpt),
            Requirement::AddOn(AddOn::Snopt),
        ],
        binary: None,
        artifacts: Artifacts {
            include_subdir: None,
            include_file: None,
            include_globs: &[],
            lib_glob: None,
        },
        patched: true,
        serial_build: false,
    },
];

/// Look up a unit by name.
pub fn unit(name: &str) -> Option<&'static PackageUnit> {
    CATALOG.iter().find(|u| u.name == name)
}

/// The linear-solver unit for a variant.
pub fn linear_solver_unit(variant: LinearSolver) -> &'static PackageUnit {
    CATALOG
        .iter()
        .find(|u| u.role == Role::LinearSolver(variant))
        .unwrap_or_else(|| unreachable!("catalog has a unit for every linear solver"))
}

/// Unit name of the add-on.
pub fn add_on_unit(add_on: AddOn) -> &'static str {
    match add_on {
        AddOn::ParOpt => "paropt",
        AddOn::Snopt => "snopt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_unique() {
        let names: HashSet<_> = CATALOG.iter().map(|u| u.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_unit_requirements_exist() {
        for u in CATALOG {
            for req in u.requires {
                if let Requirement::Unit(dep) = req {
                    assert!(unit(dep).is_some(), "{} requires unknown {}", u.name, dep);
                }
            }
        }
    }

    #[test]
    fn test_every_variant_has_a_unit() {
        for variant in LinearSolver::ALL {
            assert_eq!(
                linear_solver_unit(variant).role,
                Role::LinearSolver(variant)
            );
        }
        assert_eq!(linear_solver_unit(LinearSolver::Mumps).name, "mumps");
    }

    #[test]
    fn test_kernel_binary_only_with_mumps() {
        let ipopt = unit("ipopt").unwrap();
        let binary = ipopt.binary.unwrap();
        assert!(binary.usable_with(LinearSolver::Mumps));
        assert!(!binary.usable_with(LinearSolver::Hsl));
        assert!(unit("metis").unwrap().binary.unwrap().usable_with(LinearSolver::Pardiso));
    }

    #[test]
    fn test_only_mumps_builds_serially() {
        let serial: Vec<_> = CATALOG.iter().filter(|u| u.serial_build).map(|u| u.name).collect();
        assert_eq!(serial, vec!["mumps"]);
    }

    #[test]
    fn test_only_top_level_is_patched() {
        let patched: Vec<_> = CATALOG.iter().filter(|u| u.patched).map(|u| u.name).collect();
        assert_eq!(patched, vec!["pyoptsparse"]);
    }
}
