//! Pipeline facade
//!
//! `Planner` wires the full pipeline for one request: obstacle
//! inflation, visibility mesh, A* search, trajectory problem assembly,
//! and the solver. Multi-agent spacing takes already-planned
//! trajectories as read-only snapshots; sequencing between agents is
//! the caller's responsibility.

use std::sync::Arc;

use log::debug;

use crate::common::{wrap_angle, NavError, NavResult, Pose2D, Rect};
use crate::drivetrain::DrivetrainProfile;
use crate::geometry::Polygon;
use crate::meshing::{build_visibility_mesh, MeshConfig};
use crate::pathfinding::{AStar, Pathfinder};
use crate::trajectory::{
    decode_trajectory, BuilderConfig, Objective, ProfileSolver, SolverConfig, Trajectory,
    TrajectoryProblemBuilder, TrajectorySample, TrajectorySolver,
};

/// Below this start-goal distance a request is treated as zero-length.
const ZERO_LENGTH_EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub drivetrain: DrivetrainProfile,
    pub robot_radius: f64,
    pub safety_margin: f64,
    /// Optional field bounds; mesh nodes outside are discarded.
    pub bounds: Option<Rect>,
    pub resolution: f64,
    pub objective: Objective,
    pub solver: SolverConfig,
    /// Center-to-center clearance kept from other agents' trajectories.
    pub min_separation: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            drivetrain: DrivetrainProfile::default(),
            robot_radius: 0.45,
            safety_margin: 0.05,
            bounds: None,
            resolution: 0.10,
            objective: Objective::MinimizeTime,
            solver: SolverConfig::default(),
            min_separation: 1.0,
        }
    }
}

/// One planning request: endpoints, the obstacle field, and the
/// trajectories of agents already planned this cycle.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub start: Pose2D,
    pub goal: Pose2D,
    pub obstacles: Vec<Polygon>,
    pub others: Vec<Arc<Trajectory>>,
}

pub struct Planner {
    config: PlannerConfig,
    solver: Box<dyn TrajectorySolver>,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        let solver = ProfileSolver::new(config.solver.clone());
        Self {
            config,
            solver: Box::new(solver),
        }
    }

    /// Swap in a different solver behind the same pipeline.
    pub fn with_solver(config: PlannerConfig, solver: Box<dyn TrajectorySolver>) -> Self {
        Self { config, solver }
    }

    pub fn plan(&self, request: &PlanRequest) -> NavResult<Trajectory> {
        self.config.drivetrain.validate()?;
        if let Some(bounds) = self.config.bounds {
            for (name, pose) in [("start", request.start), ("goal", request.goal)] {
                if !bounds.contains(pose.position()) {
                    return Err(NavError::InvalidParameter(format!(
                        "{name} pose ({:.3}, {:.3}) is outside the field bounds",
                        pose.x, pose.y
                    )));
                }
            }
        }

        // A zero-length request cannot be time-scaled along a path;
        // answer it directly so the trajectory invariants stay intact.
        if request.start.position().distance(&request.goal.position()) <= ZERO_LENGTH_EPS {
            if wrap_angle(request.goal.heading - request.start.heading).abs() > ZERO_LENGTH_EPS {
                return Err(NavError::InvalidParameter(
                    "zero-length request with a heading change is not supported".into(),
                ));
            }
            return Ok(Trajectory::new(vec![TrajectorySample {
                t: 0.0,
                x: request.start.x,
                y: request.start.y,
                heading: request.start.heading,
                vx: 0.0,
                vy: 0.0,
                omega: 0.0,
            }]));
        }

        let mesh_config = MeshConfig {
            robot_radius: self.config.robot_radius,
            safety_margin: self.config.safety_margin,
            bounds: self.config.bounds,
            ..MeshConfig::default()
        };
        let mesh = build_visibility_mesh(
            &request.obstacles,
            request.start.position(),
            request.goal.position(),
            &mesh_config,
        )?;
        let guide = AStar::new().find_path(&mesh.graph, mesh.start, mesh.goal)?;
        debug!(
            "guide path: {} waypoints, {:.3} m",
            guide.points.len(),
            guide.total_length()
        );

        let mut builder = TrajectoryProblemBuilder::new(self.config.drivetrain.clone())
            .config(BuilderConfig {
                resolution: self.config.resolution,
                ..BuilderConfig::default()
            })
            .objective(self.config.objective)
            .waypoint(request.start)
            .waypoint(request.goal)
            .guide_path(guide);
        for polygon in &mesh.inflated {
            builder = builder.keep_out(polygon.clone(), 0.0);
        }
        for other in &request.others {
            builder = builder.separation(Arc::clone(other), self.config.min_separation);
        }

        let problem = builder.build()?;
        let solution = self.solver.solve(&problem)?;
        Ok(decode_trajectory(&solution.variables))
    }
}
