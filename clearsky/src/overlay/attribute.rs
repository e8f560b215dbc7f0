//! Piece ownership by centroid containment.

use std::collections::BTreeMap;

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Centroid, InteriorPoint, Point, Polygon};

use super::ValuedPolygon;
use crate::geometry::GeometryIndex;
use crate::model::OverlayRegion;

/// Point used to decide which inputs own a piece.
///
/// * Centroid strictly inside the piece: the centroid.
/// * Centroid on the piece boundary: `None`, the piece belongs to nobody.
/// * Centroid outside (concave piece): an interior point instead.
pub fn representative_point(piece: &Polygon<f64>) -> Option<Point<f64>> {
    let centroid = piece.centroid()?;
    match piece.coordinate_position(&centroid.0) {
        CoordPos::Inside => Some(centroid),
        CoordPos::OnBoundary => None,
        CoordPos::Outside => piece.interior_point(),
    }
}

/// Attach contributors and summed value to each flattened piece.
///
/// `index` must be built over `inputs` in the same order.
pub fn attribute(
    pieces: Vec<Polygon<f64>>,
    inputs: &[ValuedPolygon],
    index: &GeometryIndex,
) -> Vec<OverlayRegion> {
    pieces
        .into_iter()
        .map(|piece| {
            let Some(point) = representative_point(&piece) else {
                return OverlayRegion::unowned(piece);
            };

            // Parts of one order count once.
            let owners: BTreeMap<usize, &ValuedPolygon> = index
                .containing(&point)
                .into_iter()
                .map(|i| (inputs[i].order, &inputs[i]))
                .collect();

            OverlayRegion {
                geometry: piece,
                contributing_order_ids: owners.values().map(|p| p.id.clone()).collect(),
                value_sum: owners.values().map(|p| u64::from(p.value)).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderId;
    use geo::{polygon, Contains, MultiPolygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    /// L-shape whose centroid (1.5, 1.0) sits on its inner horizontal edge.
    fn boundary_centroid_l() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 3.0),
            (x: 0.0, y: 3.0)
        ]
    }

    fn valued(order: usize, id: &str, value: u32, geometry: Polygon<f64>) -> ValuedPolygon {
        ValuedPolygon {
            order,
            id: OrderId::from(id),
            value,
            geometry,
        }
    }

    fn index_of(inputs: &[ValuedPolygon]) -> GeometryIndex {
        GeometryIndex::new(
            inputs
                .iter()
                .map(|p| MultiPolygon::new(vec![p.geometry.clone()])),
        )
    }

    #[test]
    fn test_convex_piece_uses_centroid() {
        let piece = rect(0.0, 0.0, 2.0, 2.0);
        let point = representative_point(&piece).unwrap();
        assert_eq!(point, Point::new(1.0, 1.0));
    }

    #[test]
    fn test_boundary_centroid_is_unowned() {
        assert!(representative_point(&boundary_centroid_l()).is_none());

        let inputs = vec![valued(0, "A", 1000, boundary_centroid_l())];
        let regions = attribute(vec![boundary_centroid_l()], &inputs, &index_of(&inputs));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].value_sum, 0);
        assert!(regions[0].contributing_order_ids.is_empty());
    }

    #[test]
    fn test_concave_piece_falls_back_to_interior_point() {
        // U-shape: the centroid lands in the notch.
        let u = polygon![
            (x: 0.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 3.0, y: 3.0),
            (x: 2.0, y: 3.0),
            (x: 2.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 3.0),
            (x: 0.0, y: 3.0)
        ];
        let point = representative_point(&u).unwrap();
        assert!(u.contains(&point));
    }

    #[test]
    fn test_overlapping_owners_sum_values() {
        let inputs = vec![
            valued(0, "A", 1000, rect(0.0, 0.0, 2.0, 2.0)),
            valued(1, "B", 715, rect(0.0, 0.0, 4.0, 4.0)),
        ];
        let regions = attribute(
            vec![rect(0.5, 0.5, 1.5, 1.5)],
            &inputs,
            &index_of(&inputs),
        );

        assert_eq!(regions[0].value_sum, 1715);
        assert_eq!(regions[0].contributing_order_ids.len(), 2);
    }

    #[test]
    fn test_parts_of_one_order_count_once() {
        let inputs = vec![
            valued(0, "A", 1000, rect(0.0, 0.0, 2.0, 2.0)),
            valued(0, "A", 1000, rect(0.0, 0.0, 3.0, 3.0)),
        ];
        let regions = attribute(
            vec![rect(0.5, 0.5, 1.5, 1.5)],
            &inputs,
            &index_of(&inputs),
        );

        assert_eq!(regions[0].value_sum, 1000);
    }
}
