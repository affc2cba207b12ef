//! Trajectory problem assembly
//!
//! Turns a geometric guide path plus a drivetrain profile into a
//! `TrajectoryProblem`: seeded decision variables, a constraint set,
//! and an objective. Builds are pure per request; a problem is never
//! reused across geometries.

use std::sync::Arc;

use log::debug;

use crate::common::{wrap_angle, NavError, NavResult, Path2D, Point2D, Pose2D};
use crate::drivetrain::{module_velocities, ChassisVelocity, DrivetrainProfile};
use crate::geometry::Polygon;
use crate::trajectory::constraints::Constraint;
use crate::trajectory::state::Trajectory;
use crate::trajectory::variables::ProblemVariables;

/// What the solver should minimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Objective {
    #[default]
    MinimizeTime,
    MinimizeEffort,
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Spacing between discretized timesteps along the guide path, meters.
    pub resolution: f64,
    /// Nominal speed used to seed velocities and durations, m/s.
    pub seed_speed: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            resolution: 0.10,
            seed_speed: 1.0,
        }
    }
}

/// A fully assembled problem, ready for a [`TrajectorySolver`].
///
/// [`TrajectorySolver`]: crate::trajectory::solver::TrajectorySolver
#[derive(Debug, Clone)]
pub struct TrajectoryProblem {
    pub variables: ProblemVariables,
    pub constraints: Vec<Constraint>,
    pub objective: Objective,
}

/// Builder for [`TrajectoryProblem`].
///
/// Waypoints pin the boundary states rest-to-rest; the guide path (from
/// the path search stage) shapes the initial guess. Without an explicit
/// guide path the waypoints are connected by straight segments.
#[derive(Debug, Clone)]
pub struct TrajectoryProblemBuilder {
    drivetrain: DrivetrainProfile,
    config: BuilderConfig,
    objective: Objective,
    waypoints: Vec<Pose2D>,
    guide_path: Option<Path2D>,
    keep_outs: Vec<(Polygon, f64)>,
    separations: Vec<(Arc<Trajectory>, f64)>,
}

impl TrajectoryProblemBuilder {
    pub fn new(drivetrain: DrivetrainProfile) -> Self {
        Self {
            drivetrain,
            config: BuilderConfig::default(),
            objective: Objective::default(),
            waypoints: Vec::new(),
            guide_path: None,
            keep_outs: Vec::new(),
            separations: Vec::new(),
        }
    }

    pub fn config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn waypoint(mut self, pose: Pose2D) -> Self {
        self.waypoints.push(pose);
        self
    }

    pub fn guide_path(mut self, path: Path2D) -> Self {
        self.guide_path = Some(path);
        self
    }

    pub fn keep_out(mut self, polygon: Polygon, margin: f64) -> Self {
        self.keep_outs.push((polygon, margin));
        self
    }

    pub fn separation(mut self, other: Arc<Trajectory>, min_distance: f64) -> Self {
        self.separations.push((other, min_distance));
        self
    }

    pub fn build(self) -> NavResult<TrajectoryProblem> {
        self.drivetrain.validate()?;
        if !(self.config.resolution > 0.0) {
            return Err(NavError::InvalidParameter(format!(
                "resolution must be positive, got {}",
                self.config.resolution
            )));
        }
        if !(self.config.seed_speed > 0.0) {
            return Err(NavError::InvalidParameter(format!(
                "seed_speed must be positive, got {}",
                self.config.seed_speed
            )));
        }
        if self.waypoints.len() < 2 {
            return Err(NavError::InvalidParameter(format!(
                "need at least two waypoints, got {}",
                self.waypoints.len()
            )));
        }

        let guide = match &self.guide_path {
            Some(path) if path.points.len() >= 2 => path.clone(),
            _ => Path2D::from_points(self.waypoints.iter().map(|w| w.position()).collect()),
        };
        let mut points = guide.dissected(self.config.resolution).points;
        // Coincident consecutive points would seed zero-length intervals
        // and break the strictly-increasing timestamp invariant downstream.
        points.dedup_by(|a, b| a.distance(b) <= 1e-12);
        let n = points.len();
        if n < 2 {
            return Err(NavError::InvalidParameter(
                "guide path collapses to a single point".into(),
            ));
        }

        let start = self.waypoints[0];
        let goal = self.waypoints[self.waypoints.len() - 1];
        let variables = seed_variables(
            &points,
            start.heading,
            goal.heading,
            self.config.seed_speed,
            &self.drivetrain.module_offsets,
        );

        let mut constraints = vec![
            Constraint::velocity_limit(self.drivetrain.max_linear_velocity),
            Constraint::acceleration_limit(self.drivetrain.max_linear_acceleration),
            Constraint::angular_velocity_limit(self.drivetrain.max_angular_velocity),
            Constraint::angular_acceleration_limit(self.drivetrain.max_angular_acceleration),
            Constraint::derivative_agreement(),
            Constraint::module_speed_limit(self.drivetrain.module_max_speed),
            Constraint::module_force_limit(self.drivetrain.module_max_force, self.drivetrain.mass),
            Constraint::steer_rate_limit(self.drivetrain.module_max_steer_rate),
            Constraint::chassis_coupling(),
            // Rest-to-rest boundary pinning
            Constraint::position_equals(0, start.x, start.y),
            Constraint::heading_equals(0, start.heading),
            Constraint::velocity_equals(0, 0.0, 0.0, 0.0),
            Constraint::position_equals(n - 1, goal.x, goal.y),
            Constraint::heading_equals(n - 1, goal.heading),
            Constraint::velocity_equals(n - 1, 0.0, 0.0, 0.0),
        ];
        for (polygon, margin) in self.keep_outs {
            constraints.push(Constraint::keep_out(polygon, margin));
        }
        for (other, min_distance) in self.separations {
            constraints.push(Constraint::separation(other, min_distance));
        }

        debug!(
            "trajectory problem: {} timesteps, {} constraints, objective {:?}",
            n,
            constraints.len(),
            self.objective
        );

        Ok(TrajectoryProblem {
            variables,
            constraints,
            objective: self.objective,
        })
    }
}

/// Seed every variable column from the discretized guide path. Headings
/// interpolate linearly in arc length along the shortest angular way.
fn seed_variables(
    points: &[Point2D],
    start_heading: f64,
    goal_heading: f64,
    seed_speed: f64,
    module_offsets: &[Point2D],
) -> ProblemVariables {
    let n = points.len();
    let mut vars = ProblemVariables::zeros(n, module_offsets);

    let mut arc = vec![0.0; n];
    for k in 1..n {
        arc[k] = arc[k - 1] + points[k - 1].distance(&points[k]);
    }
    let total = arc[n - 1];
    let sweep = wrap_angle(goal_heading - start_heading);

    for k in 0..n {
        vars.pos_x[k] = points[k].x;
        vars.pos_y[k] = points[k].y;
        let fraction = if total > 0.0 { arc[k] / total } else { 0.0 };
        vars.theta[k] = start_heading + sweep * fraction;
    }

    // Tangent-aligned velocity guesses at seed speed, at rest on both ends
    for k in 1..n - 1 {
        let dx = points[k + 1].x - points[k - 1].x;
        let dy = points[k + 1].y - points[k - 1].y;
        let len = dx.hypot(dy);
        if len > 0.0 {
            vars.vel_x[k] = seed_speed * dx / len;
            vars.vel_y[k] = seed_speed * dy / len;
        }
    }

    for k in 0..n - 1 {
        let ds = arc[k + 1] - arc[k];
        vars.dt[k] = ds / seed_speed;
        if vars.dt[k] > 0.0 {
            vars.accel_x[k] = (vars.vel_x[k + 1] - vars.vel_x[k]) / vars.dt[k];
            vars.accel_y[k] = (vars.vel_y[k + 1] - vars.vel_y[k]) / vars.dt[k];
            vars.omega[k] = wrap_angle(vars.theta[k + 1] - vars.theta[k]) / vars.dt[k];
        }
    }

    for k in 0..n {
        let chassis = ChassisVelocity::new(vars.vel_x[k], vars.vel_y[k], vars.omega[k]);
        for (module, velocity) in vars
            .modules
            .iter_mut()
            .zip(module_velocities(chassis, module_offsets))
        {
            module.vx[k] = velocity.x;
            module.vy[k] = velocity.y;
        }
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_builder() -> TrajectoryProblemBuilder {
        TrajectoryProblemBuilder::new(DrivetrainProfile::default())
            .waypoint(Pose2D::new(0.0, 0.0, 0.0))
            .waypoint(Pose2D::new(5.0, 0.0, 0.0))
    }

    #[test]
    fn test_build_discretizes_at_resolution() {
        let problem = straight_builder().build().unwrap();
        // 5 m at 0.10 m resolution gives 51 timesteps
        assert_eq!(problem.variables.len(), 51);
        assert_eq!(problem.variables.interval_count(), 50);
        assert_eq!(problem.objective, Objective::MinimizeTime);
    }

    #[test]
    fn test_boundary_states_seeded() {
        let problem = straight_builder().build().unwrap();
        let vars = &problem.variables;
        let n = vars.len();
        assert_eq!(vars.position(0), Point2D::new(0.0, 0.0));
        assert_eq!(vars.position(n - 1), Point2D::new(5.0, 0.0));
        assert_eq!(vars.vel_x[0], 0.0);
        assert_eq!(vars.vel_x[n - 1], 0.0);
    }

    #[test]
    fn test_heading_interpolates_shortest_way() {
        let problem = TrajectoryProblemBuilder::new(DrivetrainProfile::default())
            .waypoint(Pose2D::new(0.0, 0.0, 3.0))
            .waypoint(Pose2D::new(2.0, 0.0, -3.0))
            .build()
            .unwrap();
        // 3.0 to -3.0 rad goes through pi, not through zero
        let vars = &problem.variables;
        let mid = vars.theta[vars.len() / 2];
        assert!(mid > 3.0 || mid < -3.0);
    }

    #[test]
    fn test_duplicate_guide_points_collapse() {
        let guide = Path2D::from_points(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 0.0),
        ]);
        let problem = TrajectoryProblemBuilder::new(DrivetrainProfile::default())
            .waypoint(Pose2D::new(0.0, 0.0, 0.0))
            .waypoint(Pose2D::new(2.0, 0.0, 0.0))
            .guide_path(guide)
            .build()
            .unwrap();
        // Every seeded interval has a real length and a real duration
        for k in 0..problem.variables.interval_count() {
            assert!(problem.variables.dt[k] > 0.0);
            assert!(
                problem
                    .variables
                    .position(k)
                    .distance(&problem.variables.position(k + 1))
                    > 0.0
            );
        }
    }

    #[test]
    fn test_coincident_waypoints_rejected() {
        let result = TrajectoryProblemBuilder::new(DrivetrainProfile::default())
            .waypoint(Pose2D::new(1.0, 1.0, 0.0))
            .waypoint(Pose2D::new(1.0, 1.0, 0.0))
            .build();
        assert!(matches!(result, Err(NavError::InvalidParameter(_))));
    }

    #[test]
    fn test_too_few_waypoints() {
        let result = TrajectoryProblemBuilder::new(DrivetrainProfile::default())
            .waypoint(Pose2D::new(0.0, 0.0, 0.0))
            .build();
        assert!(matches!(result, Err(NavError::InvalidParameter(_))));
    }

    #[test]
    fn test_bad_resolution_rejected() {
        let result = straight_builder()
            .config(BuilderConfig {
                resolution: 0.0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(NavError::InvalidParameter(_))));
    }

    #[test]
    fn test_keep_out_and_separation_registered() {
        let polygon = Polygon::new(vec![
            Point2D::new(2.0, 1.0),
            Point2D::new(3.0, 1.0),
            Point2D::new(3.0, 2.0),
            Point2D::new(2.0, 2.0),
        ])
        .unwrap();
        let base = straight_builder().build().unwrap().constraints.len();
        let problem = straight_builder().keep_out(polygon, 0.0).build().unwrap();
        assert_eq!(problem.constraints.len(), base + 1);
    }
}
