//! swerve_nav: 2-D field navigation and trajectory generation for a
//! swerve-drive robot.
//!
//! The pipeline runs obstacle inflation, visibility-mesh construction,
//! A* search, trajectory problem assembly, and a pluggable solver:
//!
//! ```text
//! obstacles -> inflation -> visibility mesh -> A* guide path
//!           -> trajectory problem -> solver -> Trajectory
//! ```
//!
//! [`planner::Planner`] wires the whole pipeline; each stage is also
//! usable on its own.

pub mod common;
pub mod drivetrain;
pub mod geometry;
pub mod meshing;
pub mod pathfinding;
pub mod planner;
pub mod trajectory;

pub use common::{GeometryError, NavError, NavResult, Path2D, Point2D, Pose2D, Rect};
pub use geometry::Polygon;
pub use planner::{PlanRequest, Planner, PlannerConfig};
pub use trajectory::{Trajectory, TrajectorySample};
