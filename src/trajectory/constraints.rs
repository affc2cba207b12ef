//! Constraint library for the trajectory problem
//!
//! Each constraint is a tagged variant that evaluates to a violation
//! magnitude against a variable assignment: zero when satisfied, the
//! worst overshoot across all timesteps otherwise. A problem's
//! constraint set is a plain `Vec<Constraint>` with no order
//! dependence.

use std::sync::Arc;

use crate::common::{wrap_angle, Point2D};
use crate::drivetrain::module_velocity;
use crate::geometry::{distance_to_polygon, Polygon};
use crate::trajectory::state::Trajectory;
use crate::trajectory::variables::ProblemVariables;

/// Duration below which rate quantities are not meaningful.
const MIN_DT: f64 = 1e-9;
/// Module speed below which the steering direction is undefined.
const MIN_STEER_SPEED: f64 = 1e-6;

/// Coarse family a constraint belongs to, used to name the suspected
/// culprit when a problem is infeasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintClass {
    Kinematics,
    Avoidance,
    Spacing,
    Swerve,
    Boundary,
}

#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// Chassis speed at every timestep bounded by `max`.
    VelocityLimit { max: f64 },
    /// Chassis acceleration magnitude over every interval bounded by `max`.
    AccelerationLimit { max: f64 },
    AngularVelocityLimit { max: f64 },
    AngularAccelerationLimit { max: f64 },
    /// The discrete kinematic updates must hold: position advances by
    /// the midpoint velocity, velocity by the interval acceleration,
    /// heading by the midpoint omega, omega by the interval alpha.
    DerivativeAgreement,
    PositionEquals { step: usize, x: f64, y: f64 },
    VelocityEquals { step: usize, vx: f64, vy: f64, omega: f64 },
    HeadingEquals { step: usize, heading: f64 },
    /// Signed distance to the polygon must stay at or above `margin`
    /// at every timestep (negative distance means inside).
    KeepOut { polygon: Polygon, margin: f64 },
    /// Stay at least `min_distance` from another agent's trajectory
    /// over the overlapping time horizon.
    Separation {
        other: Arc<Trajectory>,
        min_distance: f64,
    },
    ModuleSpeedLimit { max: f64 },
    /// Per-module drive force bound; each module carries an equal share
    /// of the chassis mass.
    ModuleForceLimit { max: f64, mass: f64 },
    /// Steering direction change rate bound, rad/s.
    SteerRateLimit { max: f64 },
    /// Module velocity columns must agree with the chassis state:
    /// v_module = v_chassis + omega x offset.
    ChassisCoupling,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub class: ConstraintClass,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn velocity_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Kinematics,
            kind: ConstraintKind::VelocityLimit { max },
        }
    }

    pub fn acceleration_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Kinematics,
            kind: ConstraintKind::AccelerationLimit { max },
        }
    }

    pub fn angular_velocity_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Kinematics,
            kind: ConstraintKind::AngularVelocityLimit { max },
        }
    }

    pub fn angular_acceleration_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Kinematics,
            kind: ConstraintKind::AngularAccelerationLimit { max },
        }
    }

    pub fn derivative_agreement() -> Self {
        Self {
            class: ConstraintClass::Kinematics,
            kind: ConstraintKind::DerivativeAgreement,
        }
    }

    pub fn position_equals(step: usize, x: f64, y: f64) -> Self {
        Self {
            class: ConstraintClass::Boundary,
            kind: ConstraintKind::PositionEquals { step, x, y },
        }
    }

    pub fn velocity_equals(step: usize, vx: f64, vy: f64, omega: f64) -> Self {
        Self {
            class: ConstraintClass::Boundary,
            kind: ConstraintKind::VelocityEquals {
                step,
                vx,
                vy,
                omega,
            },
        }
    }

    pub fn heading_equals(step: usize, heading: f64) -> Self {
        Self {
            class: ConstraintClass::Boundary,
            kind: ConstraintKind::HeadingEquals { step, heading },
        }
    }

    pub fn keep_out(polygon: Polygon, margin: f64) -> Self {
        Self {
            class: ConstraintClass::Avoidance,
            kind: ConstraintKind::KeepOut { polygon, margin },
        }
    }

    pub fn separation(other: Arc<Trajectory>, min_distance: f64) -> Self {
        Self {
            class: ConstraintClass::Spacing,
            kind: ConstraintKind::Separation {
                other,
                min_distance,
            },
        }
    }

    pub fn module_speed_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Swerve,
            kind: ConstraintKind::ModuleSpeedLimit { max },
        }
    }

    pub fn module_force_limit(max: f64, mass: f64) -> Self {
        Self {
            class: ConstraintClass::Swerve,
            kind: ConstraintKind::ModuleForceLimit { max, mass },
        }
    }

    pub fn steer_rate_limit(max: f64) -> Self {
        Self {
            class: ConstraintClass::Swerve,
            kind: ConstraintKind::SteerRateLimit { max },
        }
    }

    pub fn chassis_coupling() -> Self {
        Self {
            class: ConstraintClass::Swerve,
            kind: ConstraintKind::ChassisCoupling,
        }
    }

    /// True for kinds that bound the magnitude of a physical quantity
    /// (as opposed to pinning a state or enforcing consistency).
    pub fn is_limit(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::VelocityLimit { .. }
                | ConstraintKind::AccelerationLimit { .. }
                | ConstraintKind::AngularVelocityLimit { .. }
                | ConstraintKind::AngularAccelerationLimit { .. }
                | ConstraintKind::ModuleSpeedLimit { .. }
                | ConstraintKind::ModuleForceLimit { .. }
                | ConstraintKind::SteerRateLimit { .. }
        )
    }

    /// Violation magnitude against an assignment: 0 when satisfied.
    pub fn evaluate(&self, vars: &ProblemVariables) -> f64 {
        match &self.kind {
            ConstraintKind::VelocityLimit { max } => (0..vars.len())
                .map(|k| vars.vel_x[k].hypot(vars.vel_y[k]) - max)
                .fold(0.0, f64::max),
            ConstraintKind::AccelerationLimit { max } => (0..vars.interval_count())
                .map(|k| vars.accel_x[k].hypot(vars.accel_y[k]) - max)
                .fold(0.0, f64::max),
            ConstraintKind::AngularVelocityLimit { max } => vars
                .omega
                .iter()
                .map(|w| w.abs() - max)
                .fold(0.0, f64::max),
            ConstraintKind::AngularAccelerationLimit { max } => vars
                .alpha
                .iter()
                .map(|a| a.abs() - max)
                .fold(0.0, f64::max),
            ConstraintKind::DerivativeAgreement => derivative_residual(vars),
            ConstraintKind::PositionEquals { step, x, y } => {
                vars.position(*step).distance(&Point2D::new(*x, *y))
            }
            ConstraintKind::VelocityEquals {
                step,
                vx,
                vy,
                omega,
            } => {
                let dv = (vars.vel_x[*step] - vx).hypot(vars.vel_y[*step] - vy);
                dv.max((vars.omega[*step] - omega).abs())
            }
            ConstraintKind::HeadingEquals { step, heading } => {
                wrap_angle(vars.theta[*step] - heading).abs()
            }
            ConstraintKind::KeepOut { polygon, margin } => (0..vars.len())
                .map(|k| margin - distance_to_polygon(vars.position(k), polygon))
                .fold(0.0, f64::max),
            ConstraintKind::Separation {
                other,
                min_distance,
            } => separation_violation(vars, other, *min_distance),
            ConstraintKind::ModuleSpeedLimit { max } => vars
                .modules
                .iter()
                .flat_map(|m| m.vx.iter().zip(&m.vy))
                .map(|(vx, vy)| vx.hypot(*vy) - max)
                .fold(0.0, f64::max),
            ConstraintKind::ModuleForceLimit { max, mass } => {
                module_force_violation(vars, *max, *mass)
            }
            ConstraintKind::SteerRateLimit { max } => steer_rate_violation(vars, *max),
            ConstraintKind::ChassisCoupling => coupling_residual(vars),
        }
    }
}

fn derivative_residual(vars: &ProblemVariables) -> f64 {
    let mut worst = 0.0f64;
    for k in 0..vars.interval_count() {
        let dt = vars.dt[k];
        if dt < MIN_DT {
            continue;
        }
        let rx = vars.pos_x[k + 1]
            - vars.pos_x[k]
            - 0.5 * (vars.vel_x[k] + vars.vel_x[k + 1]) * dt;
        let ry = vars.pos_y[k + 1]
            - vars.pos_y[k]
            - 0.5 * (vars.vel_y[k] + vars.vel_y[k + 1]) * dt;
        let rvx = vars.vel_x[k + 1] - vars.vel_x[k] - vars.accel_x[k] * dt;
        let rvy = vars.vel_y[k + 1] - vars.vel_y[k] - vars.accel_y[k] * dt;
        let rtheta = vars.theta[k + 1]
            - vars.theta[k]
            - 0.5 * (vars.omega[k] + vars.omega[k + 1]) * dt;
        let romega = vars.omega[k + 1] - vars.omega[k] - vars.alpha[k] * dt;
        for r in [rx, ry, rvx, rvy, rtheta, romega] {
            worst = worst.max(r.abs());
        }
    }
    worst
}

fn separation_violation(vars: &ProblemVariables, other: &Trajectory, min_distance: f64) -> f64 {
    let mut worst = 0.0f64;
    let horizon = other.travel_time();
    for k in 0..vars.len() {
        let t = vars.time_at(k);
        if t > horizon {
            break;
        }
        if let Some(sample) = other.sample_at(t) {
            let d = vars.position(k).distance(&sample.position());
            worst = worst.max(min_distance - d);
        }
    }
    worst
}

fn module_force_violation(vars: &ProblemVariables, max: f64, mass: f64) -> f64 {
    if vars.modules.is_empty() {
        return 0.0;
    }
    let share = mass / vars.modules.len() as f64;
    let mut worst = 0.0f64;
    for module in &vars.modules {
        for k in 0..vars.interval_count() {
            let dt = vars.dt[k];
            if dt < MIN_DT {
                continue;
            }
            let ax = (module.vx[k + 1] - module.vx[k]) / dt;
            let ay = (module.vy[k + 1] - module.vy[k]) / dt;
            worst = worst.max(share * ax.hypot(ay) - max);
        }
    }
    worst
}

fn steer_rate_violation(vars: &ProblemVariables, max: f64) -> f64 {
    let mut worst = 0.0f64;
    for module in &vars.modules {
        for k in 0..vars.interval_count() {
            let dt = vars.dt[k];
            if dt < MIN_DT {
                continue;
            }
            let speed_a = module.vx[k].hypot(module.vy[k]);
            let speed_b = module.vx[k + 1].hypot(module.vy[k + 1]);
            if speed_a < MIN_STEER_SPEED || speed_b < MIN_STEER_SPEED {
                continue;
            }
            let angle_a = module.vy[k].atan2(module.vx[k]);
            let angle_b = module.vy[k + 1].atan2(module.vx[k + 1]);
            let rate = wrap_angle(angle_b - angle_a).abs() / dt;
            worst = worst.max(rate - max);
        }
    }
    worst
}

fn coupling_residual(vars: &ProblemVariables) -> f64 {
    let mut worst = 0.0f64;
    for module in &vars.modules {
        for k in 0..vars.len() {
            let expected = module_velocity(vars.chassis_velocity(k), module.offset);
            worst = worst
                .max((module.vx[k] - expected.x).abs())
                .max((module.vy[k] - expected.y).abs());
        }
    }
    worst
}

/// Worst violation among the constraints of one class. None when the
/// set holds no constraint of that class.
pub fn max_violation_in_class(
    constraints: &[Constraint],
    vars: &ProblemVariables,
    class: ConstraintClass,
) -> Option<f64> {
    constraints
        .iter()
        .filter(|c| c.class == class)
        .map(|c| c.evaluate(vars))
        .max_by(|a, b| a.total_cmp(b))
}

/// Worst violation across a constraint set, with the class it belongs
/// to. None for an empty set.
pub fn max_violation(
    constraints: &[Constraint],
    vars: &ProblemVariables,
) -> Option<(ConstraintClass, f64)> {
    constraints
        .iter()
        .map(|c| (c.class, c.evaluate(vars)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
