//! Time-parameterized trajectory output

use log::info;

use crate::common::Point2D;

/// One sampled chassis state along a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    /// Time since trajectory start, seconds.
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl TrajectorySample {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Immutable time-parameterized trajectory.
///
/// Samples are strictly increasing in `t`. Derived parameters are
/// computed once at construction and logged.
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
    travel_time: f64,
    length: f64,
    peak_speed: f64,
}

impl Trajectory {
    pub fn new(samples: Vec<TrajectorySample>) -> Self {
        debug_assert!(
            samples.windows(2).all(|w| w[1].t > w[0].t),
            "trajectory timestamps must be strictly increasing"
        );
        let travel_time = samples.last().map_or(0.0, |s| s.t);
        let length = samples
            .windows(2)
            .map(|w| w[0].position().distance(&w[1].position()))
            .sum();
        let peak_speed = samples.iter().map(|s| s.speed()).fold(0.0, f64::max);
        info!(
            "trajectory: {} samples, {:.3} s, {:.3} m, peak {:.3} m/s",
            samples.len(),
            travel_time,
            length,
            peak_speed
        );
        Self {
            samples,
            travel_time,
            length,
            peak_speed,
        }
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total travel time in seconds.
    pub fn travel_time(&self) -> f64 {
        self.travel_time
    }

    /// Traversed path length in meters.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn peak_speed(&self) -> f64 {
        self.peak_speed
    }

    /// Linearly interpolated state at time `t`, clamped to the
    /// trajectory's time range. None for an empty trajectory.
    pub fn sample_at(&self, t: f64) -> Option<TrajectorySample> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if t <= first.t {
            return Some(*first);
        }
        if t >= last.t {
            return Some(*last);
        }
        let upper = self.samples.partition_point(|s| s.t < t);
        let (a, b) = (self.samples[upper - 1], self.samples[upper]);
        let span = b.t - a.t;
        if span <= 0.0 {
            return Some(a);
        }
        let u = (t - a.t) / span;
        let lerp = |x: f64, y: f64| x + (y - x) * u;
        Some(TrajectorySample {
            t,
            x: lerp(a.x, b.x),
            y: lerp(a.y, b.y),
            heading: lerp(a.heading, b.heading),
            vx: lerp(a.vx, b.vx),
            vy: lerp(a.vy, b.vy),
            omega: lerp(a.omega, b.omega),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, x: f64, vx: f64) -> TrajectorySample {
        TrajectorySample {
            t,
            x,
            y: 0.0,
            heading: 0.0,
            vx,
            vy: 0.0,
            omega: 0.0,
        }
    }

    #[test]
    fn test_derived_parameters() {
        let traj = Trajectory::new(vec![
            sample(0.0, 0.0, 0.0),
            sample(1.0, 1.0, 2.0),
            sample(2.0, 3.0, 0.0),
        ]);
        assert_eq!(traj.len(), 3);
        assert!((traj.travel_time() - 2.0).abs() < 1e-12);
        assert!((traj.length() - 3.0).abs() < 1e-12);
        assert!((traj.peak_speed() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_at_interpolates() {
        let traj = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(2.0, 4.0, 4.0)]);
        let mid = traj.sample_at(1.0).unwrap();
        assert!((mid.x - 2.0).abs() < 1e-12);
        assert!((mid.vx - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_at_clamps() {
        let traj = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(1.0, 1.0, 1.0)]);
        assert_eq!(traj.sample_at(-5.0).unwrap().x, 0.0);
        assert_eq!(traj.sample_at(10.0).unwrap().x, 1.0);
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_repeated_timestamp_rejected() {
        Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(0.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_empty_trajectory() {
        let traj = Trajectory::new(Vec::new());
        assert!(traj.is_empty());
        assert!(traj.sample_at(0.0).is_none());
        assert_eq!(traj.travel_time(), 0.0);
    }
}
