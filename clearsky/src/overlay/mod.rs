//! Overlay aggregation: overlapping valued footprints → disjoint regions.
//!
//! # Architecture
//!
//! ```text
//! ValuedOrder ─► explode parts ─► validate ─┬─► rejected (logged)
//!                                          │
//!                                          ▼
//!                               ┌──── per strip ────┐
//!                               │ clip to strip     │
//!                               │ flatten (fold)    │
//!                               │ attribute         │
//!                               └───────────────────┘
//!                                          │
//!                                          ▼
//!                                   OverlayRegion set
//! ```
//!
//! The output regions are pairwise disjoint and their union equals the union
//! of the accepted footprints. Each region carries the orders whose interior
//! holds its representative point, and the sum of their values.

mod attribute;
mod flatten;

pub use attribute::{attribute, representative_point};
pub use flatten::flatten;

use geo::{BooleanOps, MultiPolygon, Polygon, RemoveRepeatedPoints};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CsiError, CsiResult};
use crate::geometry::{significant_parts, to_multi, validate_polygon, GeometryIndex};
use crate::model::{OrderId, OverlayRegion, ValuedOrder};
use crate::tiler::Tiler;

/// One single-part polygon taking part in the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedPolygon {
    /// Position of the owning order in the aggregated slice.
    pub order: usize,
    pub id: OrderId,
    pub value: u32,
    pub geometry: Polygon<f64>,
}

/// A footprint part dropped before flattening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedGeometry {
    pub id: OrderId,
    pub part_index: usize,
    pub reason: String,
}

/// Result of an aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    pub regions: Vec<OverlayRegion>,
    pub rejected: Vec<RejectedGeometry>,
}

impl AggregateOutcome {
    pub fn total_value(&self) -> u64 {
        self.regions.iter().map(|r| r.value_sum).sum()
    }
}

/// Flattens valued order footprints into a disjoint valued partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayAggregator;

impl OverlayAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate every footprint in a single pass.
    pub fn aggregate(&self, orders: &[ValuedOrder]) -> AggregateOutcome {
        let (inputs, rejected) = prepare(orders);
        let regions = overlay(&inputs);

        debug!(
            orders = orders.len(),
            parts = inputs.len(),
            regions = regions.len(),
            "Overlay aggregated"
        );

        AggregateOutcome { regions, rejected }
    }

    /// Aggregate strip by strip.
    ///
    /// Footprints are clipped to each [`Tiler`] strip before flattening, so
    /// every region lies inside exactly one strip.
    ///
    /// # Errors
    ///
    /// Propagates [`CsiError::GridTooLarge`] and strip configuration errors
    /// from the tiler.
    pub fn aggregate_tiled(
        &self,
        orders: &[ValuedOrder],
        tiler: &Tiler,
    ) -> CsiResult<AggregateOutcome> {
        let (inputs, rejected) = prepare(orders);
        let index = index_over(&inputs);
        let strips = tiler.strips(&index)?;

        let regions: Vec<OverlayRegion> = strips
            .iter()
            .flat_map(|strip| {
                let clip = to_multi(&strip.bounds.to_polygon());
                let clipped: Vec<ValuedPolygon> = index
                    .intersecting_rect(&strip.bounds)
                    .into_iter()
                    .flat_map(|i| {
                        let input = &inputs[i];
                        significant_parts(to_multi(&input.geometry).intersection(&clip)).map(
                            move |geometry| ValuedPolygon {
                                geometry,
                                ..input.clone()
                            },
                        )
                    })
                    .collect();
                overlay(&clipped)
            })
            .collect();

        debug!(
            orders = orders.len(),
            parts = inputs.len(),
            strips = strips.len(),
            regions = regions.len(),
            "Tiled overlay aggregated"
        );

        Ok(AggregateOutcome { regions, rejected })
    }
}

/// Explode valued orders into validated single-part polygons.
fn prepare(orders: &[ValuedOrder]) -> (Vec<ValuedPolygon>, Vec<RejectedGeometry>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (order, valued) in orders.iter().enumerate() {
        for (part_index, part) in valued.order.footprint.iter().enumerate() {
            match validate_polygon(part) {
                Ok(()) => accepted.push(ValuedPolygon {
                    order,
                    id: valued.id().clone(),
                    value: valued.value,
                    geometry: part.remove_repeated_points(),
                }),
                Err(source) => {
                    let err = CsiError::Geometry {
                        subject: format!("order {} part {}", valued.id(), part_index),
                        source,
                    };
                    warn!(order = %valued.id(), part_index, error = %err, "Dropping footprint part");
                    rejected.push(RejectedGeometry {
                        id: valued.id().clone(),
                        part_index,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    (accepted, rejected)
}

fn index_over(inputs: &[ValuedPolygon]) -> GeometryIndex {
    GeometryIndex::new(inputs.iter().map(|p| to_multi(&p.geometry)))
}

fn overlay(inputs: &[ValuedPolygon]) -> Vec<OverlayRegion> {
    let index = index_over(inputs);
    let pieces = flatten(inputs.iter().map(|p| &p.geometry));
    attribute(pieces, inputs, &index)
}

/// Union of the regions owned by an order.
pub fn owned_footprint(regions: &[OverlayRegion], id: &OrderId) -> MultiPolygon<f64> {
    crate::geometry::union_all(
        regions
            .iter()
            .filter(|r| r.is_owned_by(id))
            .map(|r| r.geometry.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::union_all;
    use crate::model::Order;
    use crate::value::ValueAssigner;
    use geo::{polygon, Area};
    use std::collections::BTreeSet;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn valued(id: &str, priority: i32, geometry: Polygon<f64>) -> ValuedOrder {
        ValueAssigner::assign(Order::new(id, priority, 30, geometry)).unwrap()
    }

    /// Three footprints whose overlaps produce all seven owner combinations.
    fn venn() -> Vec<ValuedOrder> {
        vec![
            valued("A", 700, rect(0.0, 0.0, 0.2, 0.2)),
            valued("B", 720, rect(0.1, 0.0, 0.3, 0.2)),
            valued("C", 740, rect(0.05, 0.1, 0.25, 0.3)),
        ]
    }

    fn assert_partition(regions: &[OverlayRegion], inputs: &[ValuedOrder]) {
        let union = union_all(
            inputs
                .iter()
                .flat_map(|o| o.order.footprint.iter().cloned()),
        );
        let total: f64 = regions.iter().map(OverlayRegion::area).sum();
        assert!((total - union.unsigned_area()).abs() < 1e-9);

        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                let overlap = to_multi(&a.geometry).intersection(&to_multi(&b.geometry));
                assert!(overlap.unsigned_area() < 1e-9);
            }
        }
    }

    #[test]
    fn test_venn_region_sums() {
        let orders = venn();
        let outcome = OverlayAggregator::new().aggregate(&orders);

        let sums: BTreeSet<u64> = outcome.regions.iter().map(|r| r.value_sum).collect();
        let expected: BTreeSet<u64> = [1000, 715, 464, 1715, 1464, 1179, 2179].into();
        assert_eq!(sums, expected);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let orders = venn();
        let outcome = OverlayAggregator::new().aggregate(&orders);
        assert_partition(&outcome.regions, &orders);
    }

    #[test]
    fn test_value_is_conserved_per_order() {
        let orders = venn();
        let outcome = OverlayAggregator::new().aggregate(&orders);

        for order in &orders {
            let owned = owned_footprint(&outcome.regions, order.id());
            assert!((owned.unsigned_area() - order.order.footprint.unsigned_area()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tiled_matches_single_pass() {
        let orders = venn();
        let aggregator = OverlayAggregator::new();
        let single = aggregator.aggregate(&orders);
        let tiled = aggregator.aggregate_tiled(&orders, &Tiler::default()).unwrap();

        assert!(tiled.regions.len() >= single.regions.len());
        assert_partition(&tiled.regions, &orders);

        for order in &orders {
            let a = owned_footprint(&single.regions, order.id()).unsigned_area();
            let b = owned_footprint(&tiled.regions, order.id()).unsigned_area();
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_part_is_rejected_not_fatal() {
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)];
        let orders = vec![
            valued("good", 700, rect(5.0, 5.0, 6.0, 6.0)),
            valued("bad", 700, bowtie),
        ];
        let outcome = OverlayAggregator::new().aggregate(&orders);

        assert_eq!(outcome.regions.len(), 1);
        assert_eq!(outcome.total_value(), 1000);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id, OrderId::from("bad"));
        assert!(outcome.rejected[0].reason.contains("self-intersects"));
    }

    #[test]
    fn test_repeated_vertex_keeps_order_value() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.1, y: 0.0),
            (x: 0.1, y: 0.0),
            (x: 0.1, y: 0.1),
            (x: 0.0, y: 0.1)
        ];
        let outcome = OverlayAggregator::new().aggregate(&[valued("A", 700, square)]);

        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.regions.len(), 1);
        assert_eq!(outcome.total_value(), 1000);
    }

    #[test]
    fn test_empty_input_yields_no_regions() {
        let outcome = OverlayAggregator::new()
            .aggregate_tiled(&[], &Tiler::default())
            .unwrap();
        assert!(outcome.regions.is_empty());
    }

    #[test]
    fn test_tiled_propagates_grid_error() {
        let orders = vec![valued("A", 700, rect(0.0, 0.0, 10.0, 10.0))];
        let tiler = Tiler::default().with_max_grid(2, 2);
        assert!(matches!(
            OverlayAggregator::new().aggregate_tiled(&orders, &tiler),
            Err(CsiError::GridTooLarge { .. })
        ));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_triangle() -> impl Strategy<Value = Polygon<f64>> {
            proptest::array::uniform6(0u8..12)
                .prop_map(|v| {
                    let p = |i: usize| (f64::from(v[i]) * 0.01, f64::from(v[i + 1]) * 0.01);
                    let ((x0, y0), (x1, y1), (x2, y2)) = (p(0), p(2), p(4));
                    polygon![(x: x0, y: y0), (x: x1, y: y1), (x: x2, y: y2)]
                })
                .prop_filter("degenerate triangle", |t| t.unsigned_area() > 1e-6)
        }

        fn orders_from(polygons: Vec<Polygon<f64>>) -> Vec<ValuedOrder> {
            polygons
                .into_iter()
                .enumerate()
                .map(|(i, p)| valued(&format!("O{}", i), 700 + i as i32 * 10, p))
                .collect()
        }

        fn arb_rect() -> impl Strategy<Value = Polygon<f64>> {
            (0u8..8, 0u8..8, 1u8..5, 1u8..5).prop_map(|(x, y, w, h)| {
                let (x, y) = (f64::from(x) * 0.01, f64::from(y) * 0.01);
                rect(x, y, x + f64::from(w) * 0.01, y + f64::from(h) * 0.01)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn test_overlay_partitions_random_rectangles(
                rects in proptest::collection::vec(arb_rect(), 1..5)
            ) {
                let orders = orders_from(rects);
                let outcome = OverlayAggregator::new().aggregate(&orders);

                let union = union_all(orders.iter().flat_map(|o| o.order.footprint.iter().cloned()));
                let total: f64 = outcome.regions.iter().map(OverlayRegion::area).sum();
                prop_assert!((total - union.unsigned_area()).abs() < 1e-9);

                for (i, a) in outcome.regions.iter().enumerate() {
                    for b in &outcome.regions[i + 1..] {
                        let overlap = to_multi(&a.geometry).intersection(&to_multi(&b.geometry));
                        prop_assert!(overlap.unsigned_area() < 1e-9);
                    }
                }

                // No region can claim more than the orders that cover it.
                let max_sum: u64 = orders.iter().map(|o| u64::from(o.value)).sum();
                prop_assert!(outcome.regions.iter().all(|r| r.value_sum <= max_sum));
            }

            #[test]
            fn test_overlay_partitions_random_triangles(
                triangles in proptest::collection::vec(arb_triangle(), 2..7)
            ) {
                let orders = orders_from(triangles);
                let input_area: f64 = orders.iter().map(|o| o.order.footprint.unsigned_area()).sum();
                let outcome = OverlayAggregator::new().aggregate(&orders);

                let union = union_all(orders.iter().flat_map(|o| o.order.footprint.iter().cloned()));
                let total: f64 = outcome.regions.iter().map(OverlayRegion::area).sum();
                prop_assert!((total - union.unsigned_area()).abs() < input_area * 1e-6);

                for (i, a) in outcome.regions.iter().enumerate() {
                    for b in &outcome.regions[i + 1..] {
                        let overlap = to_multi(&a.geometry).intersection(&to_multi(&b.geometry));
                        prop_assert!(overlap.unsigned_area() < 1e-9);
                    }
                }

                // Boolean-op slivers would show up as specks far below the cutoff.
                let cutoff = crate::geometry::sliver_threshold(input_area);
                prop_assert!(outcome.regions.iter().all(|r| r.area() > cutoff * 0.5));
            }
        }
    }
}
