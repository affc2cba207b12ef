//! Trajectory optimization problem: variables, constraints, builder,
//! solver boundary, and the solved trajectory type.

pub mod builder;
pub mod constraints;
pub mod solver;
pub mod state;
pub mod variables;

pub use builder::{BuilderConfig, Objective, TrajectoryProblem, TrajectoryProblemBuilder};
pub use constraints::{max_violation, Constraint, ConstraintClass, ConstraintKind};
pub use solver::{
    decode_trajectory, ProfileSolver, Solution, SolverConfig, SolverDiagnostics, TrajectorySolver,
};
pub use state::{Trajectory, TrajectorySample};
pub use variables::{ModuleVariables, ProblemVariables};
