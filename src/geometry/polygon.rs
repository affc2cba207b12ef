//! Validated polygon type and obstacle inflation
//!
//! A `Polygon` is a closed, simple (non-self-intersecting) boundary.
//! Construction validates the input and fails fast on malformed
//! geometry; nothing is ever silently "fixed". Vertices are normalized
//! to counter-clockwise winding so offset directions are consistent.

use crate::common::{GeometryError, Point2D};
use crate::geometry::intersect::segments_intersect;

/// Chord count used to approximate each rounded inflation corner.
const DEFAULT_ARC_SEGMENTS: usize = 4;

const DUPLICATE_EPS: f64 = 1e-9;

/// Closed simple polygon, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2D>,
}

impl Polygon {
    /// Build a polygon from an ordered vertex list.
    ///
    /// An explicitly closed ring (last vertex equal to the first) is
    /// accepted; the closing vertex is dropped. Fails with a
    /// [`GeometryError`] on fewer than three vertices, coincident
    /// consecutive vertices, or a self-intersecting boundary.
    pub fn new(mut vertices: Vec<Point2D>) -> Result<Self, GeometryError> {
        if vertices.len() > 3 {
            let first = vertices[0];
            let last = vertices[vertices.len() - 1];
            if first.distance(&last) <= DUPLICATE_EPS {
                vertices.pop();
            }
        }
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        let n = vertices.len();
        for i in 0..n {
            if vertices[i].distance(&vertices[(i + 1) % n]) <= DUPLICATE_EPS {
                return Err(GeometryError::DuplicateVertex(i));
            }
        }
        let polygon = Self::new_unchecked(vertices);
        if polygon.has_self_intersection() {
            return Err(GeometryError::SelfIntersecting);
        }
        Ok(polygon)
    }

    /// Construct without the self-intersection scan, normalizing winding.
    /// Used for derived geometry (inflation output) whose source polygon
    /// was already validated.
    pub(crate) fn new_unchecked(vertices: Vec<Point2D>) -> Self {
        let mut polygon = Self { vertices };
        if polygon.signed_area() < 0.0 {
            polygon.vertices.reverse();
        }
        polygon
    }

    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate the boundary edges, wrapping around to close the ring.
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Even-odd ray-cast containment test for the polygon interior.
    pub fn contains(&self, point: Point2D) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Axis-aligned bounding box as (min, max) corners.
    pub fn bounding_box(&self) -> (Point2D, Point2D) {
        let mut min = Point2D::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    fn has_self_intersection(&self) -> bool {
        let n = self.vertices.len();
        for i in 0..n {
            for j in (i + 1)..n {
                // Skip edges sharing a vertex (consecutive, or first/last)
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                let (a1, a2) = (self.vertices[i], self.vertices[(i + 1) % n]);
                let (b1, b2) = (self.vertices[j], self.vertices[(j + 1) % n]);
                if segments_intersect(a1, a2, b1, b2) {
                    return true;
                }
            }
        }
        false
    }

    /// Offset the polygon outward by `radius`.
    ///
    /// Straight edges translate along their outward normal; corners where
    /// the offset edges separate are bridged with an arc approximated by
    /// [`DEFAULT_ARC_SEGMENTS`] chords, so no collision gap opens up at a
    /// sharp vertex. A negative radius is a configuration error: the
    /// effective robot footprint must never shrink.
    pub fn inflate(&self, radius: f64) -> Result<Polygon, GeometryError> {
        self.inflate_with(radius, DEFAULT_ARC_SEGMENTS)
    }

    /// [`inflate`](Self::inflate) with an explicit corner-arc chord count.
    pub fn inflate_with(&self, radius: f64, arc_segments: usize) -> Result<Polygon, GeometryError> {
        if radius < 0.0 {
            return Err(GeometryError::NegativeRadius(radius));
        }
        if radius == 0.0 {
            return Ok(self.clone());
        }
        let arc_segments = arc_segments.max(1);
        let n = self.vertices.len();
        let mut out: Vec<Point2D> = Vec::with_capacity(n * (arc_segments + 1));

        for i in 0..n {
            let prev = self.vertices[(i + n - 1) % n];
            let curr = self.vertices[i];
            let next = self.vertices[(i + 1) % n];

            let d1 = normalize(curr.x - prev.x, curr.y - prev.y);
            let d2 = normalize(next.x - curr.x, next.y - curr.y);
            // Outward normals for CCW winding: rotate direction 90 deg CW
            let n1 = Point2D::new(d1.y, -d1.x);
            let n2 = Point2D::new(d2.y, -d2.x);

            let turn = d1.x * d2.y - d1.y * d2.x;
            if turn > 1e-12 {
                // Convex corner: bridge the gap between the two offset
                // edges with an arc around the original vertex.
                push_arc(&mut out, curr, n1, n2, radius, arc_segments);
            } else {
                // Straight or reflex corner: the offset edges meet at the
                // miter point.
                out.push(miter_point(curr, n1, n2, radius));
            }
        }

        out.dedup_by(|a, b| a.distance(b) <= DUPLICATE_EPS);
        if out.len() > 1 && out[0].distance(&out[out.len() - 1]) <= DUPLICATE_EPS {
            out.pop();
        }
        Ok(Polygon::new_unchecked(out))
    }
}

fn normalize(x: f64, y: f64) -> Point2D {
    let len = (x * x + y * y).sqrt();
    if len <= 1e-12 {
        Point2D::new(0.0, 0.0)
    } else {
        Point2D::new(x / len, y / len)
    }
}

/// Intersection of the two offset edges adjacent to `curr`.
fn miter_point(curr: Point2D, n1: Point2D, n2: Point2D, radius: f64) -> Point2D {
    let bx = n1.x + n2.x;
    let by = n1.y + n2.y;
    let blen = (bx * bx + by * by).sqrt();
    if blen <= 1e-12 {
        // Edges fold back on themselves; offset along the first normal.
        return Point2D::new(curr.x + n1.x * radius, curr.y + n1.y * radius);
    }
    let (bx, by) = (bx / blen, by / blen);
    // Distance from the vertex to the offset-edge intersection is
    // radius / cos(theta / 2), with theta the angle between the normals.
    let cos_half = n1.x * bx + n1.y * by;
    if cos_half <= 1e-12 {
        return Point2D::new(curr.x + n1.x * radius, curr.y + n1.y * radius);
    }
    let miter_len = radius / cos_half;
    Point2D::new(curr.x + bx * miter_len, curr.y + by * miter_len)
}

/// Arc from `curr + n1 * radius` to `curr + n2 * radius`, swept
/// counter-clockwise, as `segments` chords.
fn push_arc(out: &mut Vec<Point2D>, curr: Point2D, n1: Point2D, n2: Point2D, radius: f64, segments: usize) {
    let a1 = n1.y.atan2(n1.x);
    let a2 = n2.y.atan2(n2.x);
    let mut sweep = a2 - a1;
    while sweep < 0.0 {
        sweep += 2.0 * std::f64::consts::PI;
    }
    for k in 0..=segments {
        let angle = a1 + sweep * (k as f64) / (segments as f64);
        out.push(Point2D::new(
            curr.x + radius * angle.cos(),
            curr.y + radius * angle.sin(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::intersect::distance_to_polygon;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(size, 0.0),
            Point2D::new(size, size),
            Point2D::new(0.0, size),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_too_few_vertices() {
        let result = Polygon::new(vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)]);
        assert!(matches!(result, Err(GeometryError::TooFewVertices(2))));
    }

    #[test]
    fn test_rejects_duplicate_vertices() {
        let result = Polygon::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
        ]);
        assert!(matches!(result, Err(GeometryError::DuplicateVertex(_))));
    }

    #[test]
    fn test_rejects_self_intersection() {
        // Bowtie
        let result = Polygon::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
        ]);
        assert!(matches!(result, Err(GeometryError::SelfIntersecting)));
    }

    #[test]
    fn test_accepts_explicitly_closed_ring() {
        let polygon = Polygon::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(polygon.len(), 3);
    }

    #[test]
    fn test_winding_normalized_to_ccw() {
        let clockwise = Polygon::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(1.0, 0.0),
        ])
        .unwrap();
        assert!(clockwise.signed_area() > 0.0);
    }

    #[test]
    fn test_contains() {
        let sq = square(10.0);
        assert!(sq.contains(Point2D::new(5.0, 5.0)));
        assert!(!sq.contains(Point2D::new(-1.0, 5.0)));
        assert!(!sq.contains(Point2D::new(11.0, 5.0)));
    }

    #[test]
    fn test_inflate_rejects_negative_radius() {
        let sq = square(10.0);
        assert!(matches!(
            sq.inflate(-0.5),
            Err(GeometryError::NegativeRadius(_))
        ));
    }

    #[test]
    fn test_inflate_grows_area() {
        let sq = square(10.0);
        let grown = sq.inflate(1.0).unwrap();
        assert!(grown.area() > sq.area());
        // Rounded corners: more vertices than the input square
        assert!(grown.len() > sq.len());
    }

    #[test]
    fn test_inflate_boundary_tolerance() {
        let sq = square(10.0);
        let r = 0.5;
        let eps = 0.01;
        let grown = sq.inflate(r).unwrap();
        // Probe just inside / outside the offset bottom edge
        assert!(grown.contains(Point2D::new(5.0, -(r - eps))));
        assert!(!grown.contains(Point2D::new(5.0, -(r + eps))));
        // Same check via signed distance to the original boundary
        assert!(distance_to_polygon(Point2D::new(5.0, -(r - eps)), &sq) < r);
        assert!(distance_to_polygon(Point2D::new(5.0, -(r + eps)), &sq) > r);
    }

    #[test]
    fn test_inflate_rounds_corners() {
        let sq = square(10.0);
        let r = 1.0;
        let grown = sq.inflate_with(r, 8).unwrap();
        // The squared-off corner point lies outside a rounded offset
        assert!(!grown.contains(Point2D::new(-0.95, -0.95)));
        // But a point on the corner diagonal within the arc is inside
        let inside = r / std::f64::consts::SQRT_2 * 0.95;
        assert!(grown.contains(Point2D::new(-inside, -inside)));
    }

    #[test]
    fn test_inflate_zero_is_identity() {
        let sq = square(10.0);
        assert_eq!(sq.inflate(0.0).unwrap(), sq);
    }
}
