//! Polygon validation ahead of the planar subdivision.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Line, LineString, Polygon, RemoveRepeatedPoints};
use thiserror::Error;

use super::SLIVER_AREA;

/// Reasons a polygon is rejected from the overlay.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// A ring has fewer than three distinct vertices.
    #[error("ring has {0} vertices (need at least 4 including closure)")]
    TooFewVertices(usize),

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate")]
    NonFinite,

    /// The polygon encloses no area.
    #[error("polygon has zero area")]
    ZeroArea,

    /// The coordinates do not describe a polygon at all.
    #[error("malformed polygon: {0}")]
    Malformed(String),

    /// Two edges of a ring cross or overlap.
    #[error("ring self-intersects between edges {0} and {1}")]
    SelfIntersection(usize, usize),
}

/// Check that a polygon can take part in the overlay.
///
/// Rejects short rings, non-finite coordinates, zero-area polygons and
/// self-intersecting exterior or interior rings. Repeated consecutive
/// vertices are ignored.
pub fn validate_polygon(polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        validate_ring(ring)?;
    }

    if polygon.unsigned_area() <= SLIVER_AREA {
        return Err(GeometryError::ZeroArea);
    }

    Ok(())
}

fn validate_ring(ring: &LineString<f64>) -> Result<(), GeometryError> {
    let ring = ring.remove_repeated_points();
    if ring.0.len() < 4 {
        return Err(GeometryError::TooFewVertices(ring.0.len()));
    }
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                // Neighbouring edges always meet at their shared vertex.
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return Err(GeometryError::SelfIntersection(i, j)),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon};

    #[test]
    fn test_valid_square() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        assert_eq!(validate_polygon(&square), Ok(()));
    }

    #[test]
    fn test_repeated_vertex_is_valid() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.1, y: 0.0),
            (x: 0.1, y: 0.0),
            (x: 0.1, y: 0.1),
            (x: 0.0, y: 0.1)
        ];
        assert_eq!(validate_polygon(&square), Ok(()));
    }

    #[test]
    fn test_repeated_vertices_do_not_pad_short_ring() {
        let ring = LineString::new(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 0.0, y: 0.0 },
        ]);
        assert!(matches!(
            validate_polygon(&Polygon::new(ring, vec![])),
            Err(GeometryError::TooFewVertices(3))
        ));
    }

    #[test]
    fn test_bowtie_is_self_intersecting() {
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)];
        assert!(matches!(
            validate_polygon(&bowtie),
            Err(GeometryError::SelfIntersection(_, _))
        ));
    }

    #[test]
    fn test_collinear_ring_has_zero_area() {
        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 3.0, y: 0.0)];
        assert!(validate_polygon(&flat).is_err());
    }

    #[test]
    fn test_short_ring_rejected() {
        let ring = LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }]);
        let polygon = Polygon::new(ring, vec![]);
        assert!(matches!(
            validate_polygon(&polygon),
            Err(GeometryError::TooFewVertices(_))
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let polygon = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        assert_eq!(validate_polygon(&polygon), Err(GeometryError::NonFinite));
    }
}
