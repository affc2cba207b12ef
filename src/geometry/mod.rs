//! Geometry kernel: polygon primitives, intersection tests, inflation

pub mod polygon;
pub mod intersect;

pub use polygon::Polygon;
pub use intersect::{
    distance_to_polygon, point_segment_distance, segment_crosses_interior,
    segment_intersects_polygon, segments_intersect,
};
