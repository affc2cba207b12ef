//! Swerve drivetrain model
//!
//! Physical limits of the chassis and its modules, plus the stateless
//! kinematic maps between chassis motion and per-module velocities.
//! All quantities are in the robot frame with offsets measured from the
//! center of rotation.

use nalgebra::Vector2;

use crate::common::{NavError, NavResult, Point2D};

/// Chassis velocity in the robot frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisVelocity {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl ChassisVelocity {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn translation(&self) -> Vector2<f64> {
        Vector2::new(self.vx, self.vy)
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Physical limits of a swerve drivetrain.
///
/// Chassis-level limits bound the rigid body as a whole; module-level
/// limits bound each wheel. Both families become constraints in the
/// trajectory problem.
#[derive(Debug, Clone)]
pub struct DrivetrainProfile {
    pub max_linear_velocity: f64,
    pub max_linear_acceleration: f64,
    pub max_angular_velocity: f64,
    pub max_angular_acceleration: f64,
    pub module_max_speed: f64,
    pub module_max_force: f64,
    pub module_max_steer_rate: f64,
    /// Module positions relative to the center of rotation.
    pub module_offsets: Vec<Point2D>,
    pub mass: f64,
    pub moment_of_inertia: f64,
}

impl Default for DrivetrainProfile {
    fn default() -> Self {
        // Four modules on a square, 0.33 m from center on each axis
        let d = 0.33;
        Self {
            max_linear_velocity: 4.5,
            max_linear_acceleration: 3.0,
            max_angular_velocity: 8.0,
            max_angular_acceleration: 12.0,
            module_max_speed: 4.8,
            module_max_force: 400.0,
            module_max_steer_rate: 12.0,
            module_offsets: vec![
                Point2D::new(d, d),
                Point2D::new(-d, d),
                Point2D::new(-d, -d),
                Point2D::new(d, -d),
            ],
            mass: 55.0,
            moment_of_inertia: 6.0,
        }
    }
}

impl DrivetrainProfile {
    /// Reject non-physical profiles before any of the values reach the
    /// trajectory problem.
    pub fn validate(&self) -> NavResult<()> {
        let positive = [
            ("max_linear_velocity", self.max_linear_velocity),
            ("max_linear_acceleration", self.max_linear_acceleration),
            ("max_angular_velocity", self.max_angular_velocity),
            ("max_angular_acceleration", self.max_angular_acceleration),
            ("module_max_speed", self.module_max_speed),
            ("module_max_force", self.module_max_force),
            ("module_max_steer_rate", self.module_max_steer_rate),
            ("mass", self.mass),
            ("moment_of_inertia", self.moment_of_inertia),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(NavError::InvalidParameter(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.module_offsets.is_empty() {
            return Err(NavError::InvalidParameter(
                "drivetrain needs at least one module".into(),
            ));
        }
        Ok(())
    }

    pub fn module_count(&self) -> usize {
        self.module_offsets.len()
    }
}

/// Velocity of one module: v_module = v_chassis + omega x offset.
pub fn module_velocity(chassis: ChassisVelocity, offset: Point2D) -> Vector2<f64> {
    Vector2::new(
        chassis.vx - chassis.omega * offset.y,
        chassis.vy + chassis.omega * offset.x,
    )
}

pub fn module_velocities(chassis: ChassisVelocity, offsets: &[Point2D]) -> Vec<Vector2<f64>> {
    offsets
        .iter()
        .map(|&offset| module_velocity(chassis, offset))
        .collect()
}

/// Recover the chassis velocity that produced a set of module
/// velocities. Exact inverse of [`module_velocities`] for consistent
/// inputs; for inconsistent inputs it is the least-squares fit.
pub fn chassis_velocity(modules: &[Vector2<f64>], offsets: &[Point2D]) -> ChassisVelocity {
    if modules.is_empty() || modules.len() != offsets.len() {
        return ChassisVelocity::new(0.0, 0.0, 0.0);
    }
    let n = modules.len() as f64;
    let mean_v: Vector2<f64> = modules.iter().sum::<Vector2<f64>>() / n;
    let cx = offsets.iter().map(|r| r.x).sum::<f64>() / n;
    let cy = offsets.iter().map(|r| r.y).sum::<f64>() / n;

    // Work in centered offsets so the angular term decouples from the
    // translation even when the offsets are not symmetric about origin.
    let mut cross = 0.0;
    let mut norm = 0.0;
    for (v, r) in modules.iter().zip(offsets) {
        let (rx, ry) = (r.x - cx, r.y - cy);
        cross += rx * v.y - ry * v.x;
        norm += rx * rx + ry * ry;
    }
    let omega = if norm > 0.0 { cross / norm } else { 0.0 };

    ChassisVelocity::new(mean_v.x + omega * cy, mean_v.y - omega * cx, omega)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_offsets() -> Vec<Point2D> {
        DrivetrainProfile::default().module_offsets
    }

    #[test]
    fn test_pure_translation() {
        let chassis = ChassisVelocity::new(1.5, -0.5, 0.0);
        for v in module_velocities(chassis, &square_offsets()) {
            assert!((v.x - 1.5).abs() < 1e-12);
            assert!((v.y + 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pure_rotation_speed() {
        // Every module on the square moves at omega * |r|
        let chassis = ChassisVelocity::new(0.0, 0.0, 2.0);
        let offsets = square_offsets();
        let radius = offsets[0].distance(&Point2D::origin());
        for v in module_velocities(chassis, &offsets) {
            assert!((v.norm() - 2.0 * radius).abs() < 1e-12);
        }
    }

    #[test]
    fn test_kinematics_round_trip() {
        let chassis = ChassisVelocity::new(2.0, -1.0, 1.5);
        let offsets = square_offsets();
        let modules = module_velocities(chassis, &offsets);
        let recovered = chassis_velocity(&modules, &offsets);
        assert!((recovered.vx - chassis.vx).abs() < 1e-12);
        assert!((recovered.vy - chassis.vy).abs() < 1e-12);
        assert!((recovered.omega - chassis.omega).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_asymmetric_offsets() {
        let offsets = vec![
            Point2D::new(0.4, 0.1),
            Point2D::new(-0.2, 0.3),
            Point2D::new(-0.1, -0.5),
        ];
        let chassis = ChassisVelocity::new(-0.7, 1.2, -2.4);
        let modules = module_velocities(chassis, &offsets);
        let recovered = chassis_velocity(&modules, &offsets);
        assert!((recovered.vx - chassis.vx).abs() < 1e-9);
        assert!((recovered.vy - chassis.vy).abs() < 1e-9);
        assert!((recovered.omega - chassis.omega).abs() < 1e-9);
    }

    #[test]
    fn test_default_profile_validates() {
        assert!(DrivetrainProfile::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_nonpositive_limits() {
        let mut profile = DrivetrainProfile::default();
        profile.max_linear_velocity = 0.0;
        assert!(matches!(
            profile.validate(),
            Err(NavError::InvalidParameter(_))
        ));

        let mut profile = DrivetrainProfile::default();
        profile.module_offsets.clear();
        assert!(profile.validate().is_err());
    }
}
