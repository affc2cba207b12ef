//! Solver boundary
//!
//! `TrajectorySolver` is the opaque contract between problem assembly
//! and numeric optimization: a problem goes in, a per-variable
//! assignment (or a typed failure) comes out. `ProfileSolver` is the
//! bundled deterministic implementation: a forward/backward
//! acceleration-limited time-scaling of the seeded path with corner
//! speed caps, exact on straight-line problems.

use std::time::{Duration, Instant};

use log::debug;

use crate::common::{NavError, NavResult};
use crate::drivetrain::{module_velocities, ChassisVelocity};
use crate::trajectory::builder::TrajectoryProblem;
use crate::trajectory::constraints::{
    max_violation_in_class, Constraint, ConstraintClass, ConstraintKind,
};
use crate::trajectory::state::{Trajectory, TrajectorySample};
use crate::trajectory::variables::ProblemVariables;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Convergence and feasibility tolerance.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Wall-clock budget for one solve.
    pub timeout: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Post-solve report, surfaced even on success.
#[derive(Debug, Clone)]
pub struct SolverDiagnostics {
    pub iterations: usize,
    pub max_violation: f64,
    pub tightest_class: Option<ConstraintClass>,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub variables: ProblemVariables,
    pub diagnostics: SolverDiagnostics,
}

/// Opaque solver contract.
pub trait TrajectorySolver {
    fn solve(&self, problem: &TrajectoryProblem) -> NavResult<Solution>;
}

/// Decode a solved assignment into an immutable trajectory.
pub fn decode_trajectory(vars: &ProblemVariables) -> Trajectory {
    let mut samples = Vec::with_capacity(vars.len());
    let mut t = 0.0;
    for k in 0..vars.len() {
        samples.push(TrajectorySample {
            t,
            x: vars.pos_x[k],
            y: vars.pos_y[k],
            heading: vars.theta[k],
            vx: vars.vel_x[k],
            vy: vars.vel_y[k],
            omega: vars.omega[k],
        });
        if k < vars.interval_count() {
            t += vars.dt[k];
        }
    }
    Trajectory::new(samples)
}

/// Deterministic two-pass time-scaling solver.
#[derive(Debug, Clone, Default)]
pub struct ProfileSolver {
    pub config: SolverConfig,
}

impl ProfileSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl TrajectorySolver for ProfileSolver {
    fn solve(&self, problem: &TrajectoryProblem) -> NavResult<Solution> {
        let started = Instant::now();
        let mut vars = problem.variables.clone();
        let n = vars.len();
        if n < 2 {
            return Err(NavError::InvalidParameter(
                "trajectory problem needs at least two timesteps".into(),
            ));
        }

        let limits = Limits::from_problem(problem);
        let ds: Vec<f64> = (0..n - 1)
            .map(|k| vars.position(k).distance(&vars.position(k + 1)))
            .collect();
        let caps = corner_caps(&vars, &ds, &limits);

        // Sweep forward and backward until the profile settles.
        let mut speeds = vec![0.0; n];
        let mut iterations = 0;
        loop {
            if started.elapsed() > self.config.timeout {
                return Err(NavError::SolverTimeout {
                    budget: self.config.timeout,
                });
            }
            if iterations >= self.config.max_iterations {
                return Err(NavError::DidNotConverge { iterations });
            }
            iterations += 1;

            let previous = speeds.clone();
            speeds[0] = limits.start_speed;
            for k in 0..n - 1 {
                let reachable =
                    (speeds[k] * speeds[k] + 2.0 * limits.max_accel * ds[k]).sqrt();
                speeds[k + 1] = caps[k + 1].min(reachable);
            }
            speeds[n - 1] = speeds[n - 1].min(limits.goal_speed);
            for k in (0..n - 1).rev() {
                let reachable =
                    (speeds[k + 1] * speeds[k + 1] + 2.0 * limits.max_accel * ds[k]).sqrt();
                speeds[k] = speeds[k].min(reachable);
            }

            let change = speeds
                .iter()
                .zip(&previous)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            if change <= self.config.tolerance {
                break;
            }
        }

        assign(&mut vars, &speeds, &ds);

        // Limit constraints the two-pass profile cannot express (angular
        // rates, corner accelerations) are honored by stretching time
        // uniformly: durations scale by s, rates by 1/s, accelerations
        // and forces by 1/s^2, so one factor satisfies them all.
        let stretch_factor = required_stretch(&problem.constraints, &vars);
        if stretch_factor > 1.0 {
            stretch(&mut vars, stretch_factor);
        }

        let (tightest_class, max_violation) =
            match crate::trajectory::constraints::max_violation(&problem.constraints, &vars) {
                Some((class, violation)) => (Some(class), violation),
                None => (None, 0.0),
            };
        debug!(
            "profile solve: {} iterations, stretch {:.3}, worst violation {:.2e} ({:?})",
            iterations, stretch_factor, max_violation, tightest_class
        );

        // Each safety class is gated on its own, so a large violation in
        // one class can never mask a smaller one in another.
        for class in [ConstraintClass::Avoidance, ConstraintClass::Spacing] {
            if let Some(violation) = max_violation_in_class(&problem.constraints, &vars, class) {
                if violation > self.config.tolerance {
                    return Err(NavError::Infeasible {
                        suspected: class,
                        violation,
                    });
                }
            }
        }
        if let Some((class, violation)) = worst_limit_violation(&problem.constraints, &vars) {
            if violation > self.config.tolerance.max(1e-9) {
                return Err(NavError::Infeasible {
                    suspected: class,
                    violation,
                });
            }
        }

        Ok(Solution {
            variables: vars,
            diagnostics: SolverDiagnostics {
                iterations,
                max_violation,
                tightest_class,
            },
        })
    }
}

struct Limits {
    max_speed: f64,
    max_accel: f64,
    start_speed: f64,
    goal_speed: f64,
}

impl Limits {
    /// Pull the scalar bounds the profile needs back out of the
    /// constraint set.
    fn from_problem(problem: &TrajectoryProblem) -> Self {
        let n = problem.variables.len();
        let mut limits = Self {
            max_speed: f64::INFINITY,
            max_accel: f64::INFINITY,
            start_speed: 0.0,
            goal_speed: 0.0,
        };
        for constraint in &problem.constraints {
            match &constraint.kind {
                ConstraintKind::VelocityLimit { max } => {
                    limits.max_speed = limits.max_speed.min(*max);
                }
                ConstraintKind::ModuleSpeedLimit { max } => {
                    limits.max_speed = limits.max_speed.min(*max);
                }
                ConstraintKind::AccelerationLimit { max } => {
                    limits.max_accel = limits.max_accel.min(*max);
                }
                ConstraintKind::VelocityEquals { step, vx, vy, .. } => {
                    if *step == 0 {
                        limits.start_speed = vx.hypot(*vy);
                    } else if *step == n - 1 {
                        limits.goal_speed = vx.hypot(*vy);
                    }
                }
                _ => {}
            }
        }
        if !limits.max_accel.is_finite() {
            limits.max_accel = 1.0;
        }
        limits
    }
}

/// Smallest uniform time-stretch factor that brings every magnitude
/// limit back within bounds. Rate-like quantities scale as 1/s and
/// acceleration-like quantities as 1/s^2, so the factor is the worst
/// over-limit ratio (or its square root).
fn required_stretch(constraints: &[Constraint], vars: &ProblemVariables) -> f64 {
    let mut factor = 1.0f64;
    for constraint in constraints {
        let (limit, quadratic) = match &constraint.kind {
            ConstraintKind::VelocityLimit { max }
            | ConstraintKind::AngularVelocityLimit { max }
            | ConstraintKind::ModuleSpeedLimit { max }
            | ConstraintKind::SteerRateLimit { max } => (*max, false),
            ConstraintKind::AccelerationLimit { max }
            | ConstraintKind::AngularAccelerationLimit { max }
            | ConstraintKind::ModuleForceLimit { max, .. } => (*max, true),
            _ => continue,
        };
        if limit <= 0.0 {
            continue;
        }
        let violation = constraint.evaluate(vars);
        if violation <= 0.0 {
            continue;
        }
        let ratio = (limit + violation) / limit;
        factor = factor.max(if quadratic { ratio.sqrt() } else { ratio });
    }
    factor
}

/// Scale every time-dependent column by the stretch factor.
fn stretch(vars: &mut ProblemVariables, s: f64) {
    for dt in &mut vars.dt {
        *dt *= s;
    }
    for v in vars
        .vel_x
        .iter_mut()
        .chain(&mut vars.vel_y)
        .chain(&mut vars.omega)
    {
        *v /= s;
    }
    let s2 = s * s;
    for a in vars
        .accel_x
        .iter_mut()
        .chain(&mut vars.accel_y)
        .chain(&mut vars.alpha)
    {
        *a /= s2;
    }
    for module in &mut vars.modules {
        for v in module.vx.iter_mut().chain(&mut module.vy) {
            *v /= s;
        }
    }
}

fn worst_limit_violation(
    constraints: &[Constraint],
    vars: &ProblemVariables,
) -> Option<(ConstraintClass, f64)> {
    constraints
        .iter()
        .filter(|c| c.is_limit())
        .map(|c| (c.class, c.evaluate(vars)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Speed cap at every node: the global limit, tightened at corners so
/// lateral acceleration stays within the chassis limit.
fn corner_caps(vars: &ProblemVariables, ds: &[f64], limits: &Limits) -> Vec<f64> {
    let n = vars.len();
    let mut caps = vec![limits.max_speed; n];
    for k in 1..n - 1 {
        let a = vars.position(k - 1);
        let b = vars.position(k);
        let c = vars.position(k + 1);
        let (ux, uy) = (b.x - a.x, b.y - a.y);
        let (wx, wy) = (c.x - b.x, c.y - b.y);
        let (lu, lw) = (ux.hypot(uy), wx.hypot(wy));
        if lu <= 0.0 || lw <= 0.0 {
            continue;
        }
        let cos = ((ux * wx + uy * wy) / (lu * lw)).clamp(-1.0, 1.0);
        let angle = cos.acos();
        if angle > 1e-9 {
            let mean_ds = 0.5 * (ds[k - 1] + ds[k]);
            let radius = mean_ds / angle;
            caps[k] = caps[k].min((limits.max_accel * radius).sqrt());
        }
    }
    caps
}

/// Write the solved speed profile back into every variable column.
fn assign(vars: &mut ProblemVariables, speeds: &[f64], ds: &[f64]) {
    let n = vars.len();

    for k in 0..n {
        let (prev, next) = (k.saturating_sub(1), (k + 1).min(n - 1));
        let dx = vars.pos_x[next] - vars.pos_x[prev];
        let dy = vars.pos_y[next] - vars.pos_y[prev];
        let len = dx.hypot(dy);
        if len > 0.0 {
            vars.vel_x[k] = speeds[k] * dx / len;
            vars.vel_y[k] = speeds[k] * dy / len;
        } else {
            vars.vel_x[k] = 0.0;
            vars.vel_y[k] = 0.0;
        }
    }

    for k in 0..n - 1 {
        let pair = speeds[k] + speeds[k + 1];
        vars.dt[k] = if ds[k] <= 0.0 {
            0.0
        } else if pair > 0.0 {
            2.0 * ds[k] / pair
        } else {
            // Both ends at rest over a nonzero gap: nominal crawl
            ds[k].sqrt()
        };
    }

    for k in 0..n - 1 {
        let dt = vars.dt[k];
        if dt > 0.0 {
            vars.accel_x[k] = (vars.vel_x[k + 1] - vars.vel_x[k]) / dt;
            vars.accel_y[k] = (vars.vel_y[k + 1] - vars.vel_y[k]) / dt;
        } else {
            vars.accel_x[k] = 0.0;
            vars.accel_y[k] = 0.0;
        }
    }

    // Heading turns at a fixed rate per meter of path, so omega follows
    // the speed profile: omega_k = dtheta/ds * v_k. With that choice the
    // midpoint of adjacent omegas over dt reproduces the heading step
    // exactly, and every node (degenerate intervals included) gets a
    // fresh value.
    for k in 0..n {
        let (lo, hi) = (k.saturating_sub(1), (k + 1).min(n - 1));
        let span: f64 = ds[lo..hi].iter().sum();
        vars.omega[k] = if span > 0.0 {
            speeds[k] * (vars.theta[hi] - vars.theta[lo]) / span
        } else {
            0.0
        };
    }
    for k in 0..n - 1 {
        let dt = vars.dt[k];
        vars.alpha[k] = if dt > 0.0 {
            (vars.omega[k + 1] - vars.omega[k]) / dt
        } else {
            0.0
        };
    }

    let offsets: Vec<_> = vars.modules.iter().map(|m| m.offset).collect();
    for k in 0..n {
        let chassis = ChassisVelocity::new(vars.vel_x[k], vars.vel_y[k], vars.omega[k]);
        let velocities = module_velocities(chassis, &offsets);
        for (module, velocity) in vars.modules.iter_mut().zip(velocities) {
            module.vx[k] = velocity.x;
            module.vy[k] = velocity.y;
        }
    }
}
