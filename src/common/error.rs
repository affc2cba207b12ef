//! Error types for swerve_nav

use std::time::Duration;

use thiserror::Error;

use crate::trajectory::constraints::ConstraintClass;

/// Errors produced while validating or deriving obstacle geometry.
///
/// These are fatal configuration errors: the caller must fix the input,
/// retrying cannot succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A polygon needs at least three vertices.
    #[error("polygon has {0} vertices, need at least 3")]
    TooFewVertices(usize),
    /// Two consecutive vertices coincide.
    #[error("polygon has coincident consecutive vertices at index {0}")]
    DuplicateVertex(usize),
    /// The polygon boundary crosses itself.
    #[error("polygon is self-intersecting")]
    SelfIntersecting,
    /// Inflation by a negative radius would shrink the robot footprint.
    #[error("inflation radius {0} is negative")]
    NegativeRadius(f64),
}

/// Main error type for the navigation pipeline.
#[derive(Debug, Error)]
pub enum NavError {
    /// Malformed input geometry.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    /// Start and goal are not connected in the visibility mesh.
    #[error("no path found: start and goal are not connected in the mesh")]
    NoPathFound,
    /// The trajectory problem has no solution under the given constraints.
    /// `suspected` names the constraint class with the largest violation.
    #[error("trajectory problem infeasible, tightest constraint class {suspected:?} (violation {violation:.4})")]
    Infeasible {
        suspected: ConstraintClass,
        violation: f64,
    },
    /// The solver gave up before reaching the requested tolerance.
    #[error("solver did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
    /// The solver exceeded its wall-clock budget.
    #[error("solver exceeded time budget of {budget:?}")]
    SolverTimeout { budget: Duration },
    /// A parameter outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for navigation operations
pub type NavResult<T> = Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::TooFewVertices(2);
        assert_eq!(format!("{}", err), "polygon has 2 vertices, need at least 3");
    }

    #[test]
    fn test_nav_error_from_geometry() {
        let err: NavError = GeometryError::SelfIntersecting.into();
        assert!(matches!(err, NavError::Geometry(_)));
        assert!(format!("{}", err).contains("self-intersecting"));
    }

    #[test]
    fn test_infeasible_names_class() {
        let err = NavError::Infeasible {
            suspected: ConstraintClass::Avoidance,
            violation: 0.25,
        };
        assert!(format!("{}", err).contains("Avoidance"));
    }
}
