//! Core model: options, environment detection, the unit catalog, planning,
//! capability checks, and the install record.

pub mod activation;
pub mod check;
pub mod context;
pub mod deps;
pub mod env;
pub mod options;
pub mod output;
pub mod patch;
pub mod plan;
pub mod record;
pub mod registry;
pub mod uninstall;
pub mod version;

pub use context::InstallContext;
pub use options::{CompilerSuite, LinearSolver, Options};
pub use plan::{BuildPlan, PlanError, Selection};
