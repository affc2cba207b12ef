//! Decision variables of the trajectory problem
//!
//! Column-per-quantity layout: each chassis quantity is one `Vec<f64>`
//! over the N timesteps, with the step quantities (accelerations and
//! durations) one element shorter. The same struct carries the initial
//! guess into the solver and the solved assignment out of it.

use crate::common::Point2D;
use crate::drivetrain::ChassisVelocity;

/// Per-module velocity columns, one pair per timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleVariables {
    /// Module position relative to the chassis center.
    pub offset: Point2D,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
}

impl ModuleVariables {
    pub fn zeros(offset: Point2D, n: usize) -> Self {
        Self {
            offset,
            vx: vec![0.0; n],
            vy: vec![0.0; n],
        }
    }
}

/// Full variable set over N timesteps.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemVariables {
    pub pos_x: Vec<f64>,
    pub pos_y: Vec<f64>,
    pub vel_x: Vec<f64>,
    pub vel_y: Vec<f64>,
    pub theta: Vec<f64>,
    pub omega: Vec<f64>,
    /// Step quantities, length N - 1.
    pub accel_x: Vec<f64>,
    pub accel_y: Vec<f64>,
    pub alpha: Vec<f64>,
    pub dt: Vec<f64>,
    pub modules: Vec<ModuleVariables>,
}

impl ProblemVariables {
    pub fn zeros(n: usize, module_offsets: &[Point2D]) -> Self {
        let steps = n.saturating_sub(1);
        Self {
            pos_x: vec![0.0; n],
            pos_y: vec![0.0; n],
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
            theta: vec![0.0; n],
            omega: vec![0.0; n],
            accel_x: vec![0.0; steps],
            accel_y: vec![0.0; steps],
            alpha: vec![0.0; steps],
            dt: vec![0.0; steps],
            modules: module_offsets
                .iter()
                .map(|&offset| ModuleVariables::zeros(offset, n))
                .collect(),
        }
    }

    /// Number of timesteps N.
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    /// Number of intervals between timesteps, N - 1.
    pub fn interval_count(&self) -> usize {
        self.dt.len()
    }

    pub fn position(&self, k: usize) -> Point2D {
        Point2D::new(self.pos_x[k], self.pos_y[k])
    }

    pub fn chassis_velocity(&self, k: usize) -> ChassisVelocity {
        ChassisVelocity::new(self.vel_x[k], self.vel_y[k], self.omega[k])
    }

    /// Absolute time of timestep `k` under the current dt assignment.
    pub fn time_at(&self, k: usize) -> f64 {
        self.dt[..k].iter().sum()
    }

    pub fn total_time(&self) -> f64 {
        self.dt.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shape() {
        let offsets = [Point2D::new(0.3, 0.3), Point2D::new(-0.3, 0.3)];
        let vars = ProblemVariables::zeros(5, &offsets);
        assert_eq!(vars.len(), 5);
        assert_eq!(vars.interval_count(), 4);
        assert_eq!(vars.modules.len(), 2);
        assert_eq!(vars.modules[0].vx.len(), 5);
    }

    #[test]
    fn test_time_accumulation() {
        let mut vars = ProblemVariables::zeros(4, &[]);
        vars.dt = vec![0.5, 0.25, 0.25];
        assert_eq!(vars.time_at(0), 0.0);
        assert!((vars.time_at(2) - 0.75).abs() < 1e-12);
        assert!((vars.total_time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_timestep() {
        let vars = ProblemVariables::zeros(1, &[]);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.interval_count(), 0);
        assert_eq!(vars.total_time(), 0.0);
    }
}
