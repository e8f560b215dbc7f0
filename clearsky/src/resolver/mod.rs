//! Per-order extents from exploded multi-part geometry.
//!
//! Orders are exploded into single-part polygons, each tagged with a
//! [`PartKey`]. The coordinate export of those parts is joined back by key,
//! and each order's combined bounding extent is converted into a physical
//! width and height.
//!
//! # Architecture
//!
//! ```text
//! Order ──► explode ──► ExplodedPart { PartKey, polygon }
//!                              │
//!                              ▼
//!                      GeometryExporter ──► CoordinateRecord { PartKey, coords }
//!                              │                      │
//!                              └──── join by key ◄────┘
//!                                       │
//!                                       ▼
//!                     ResolvedOrder { extent, width km, height km }
//! ```
//!
//! A part whose record is missing is logged and counted; an order with no
//! records at all reports `"Not found"` extents.

mod export;

pub use export::{CoordinateRecord, GeoJsonExporter, GeometryExporter, PartProperties};

use std::collections::{BTreeMap, HashMap};

use geo::{Coord, Polygon};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CsiResult;
use crate::geometry::get_distance;
use crate::model::{Order, OrderId, ResolvedOrder};

/// Structural key of one exploded part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartKey {
    pub order_id: OrderId,
    pub part_index: usize,
}

impl PartKey {
    pub fn new(order_id: OrderId, part_index: usize) -> Self {
        Self {
            order_id,
            part_index,
        }
    }
}

/// A single-part polygon split off a (possibly multi-part) order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplodedPart {
    pub key: PartKey,
    pub geometry: Polygon<f64>,
}

/// Split every order footprint into single-part polygons.
pub fn explode(orders: &[Order]) -> Vec<ExplodedPart> {
    orders
        .iter()
        .flat_map(|order| {
            order
                .footprint
                .iter()
                .enumerate()
                .map(|(part_index, polygon)| ExplodedPart {
                    key: PartKey::new(order.id.clone(), part_index),
                    geometry: polygon.clone(),
                })
        })
        .collect()
}

/// Axis-aligned extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Extent {
    fn of(coords: &[Coord<f64>]) -> Option<Self> {
        coords.iter().fold(None, |extent, c| {
            Some(match extent {
                None => Extent {
                    x_min: c.x,
                    x_max: c.x,
                    y_min: c.y,
                    y_max: c.y,
                },
                Some(e) => Extent {
                    x_min: e.x_min.min(c.x),
                    x_max: e.x_max.max(c.x),
                    y_min: e.y_min.min(c.y),
                    y_max: e.y_max.max(c.y),
                },
            })
        })
    }

    fn merge(self, other: Extent) -> Extent {
        Extent {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// East-west span along the southern edge, in kilometres.
    fn width_km(&self) -> f64 {
        get_distance((self.y_min, self.x_min), (self.y_min, self.x_max))
    }

    /// North-south span along the western edge, in kilometres.
    fn height_km(&self) -> f64 {
        get_distance((self.y_min, self.x_min), (self.y_max, self.x_min))
    }
}

/// Rebuilds per-order extents from exploded parts and their coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderGeometryResolver;

impl OrderGeometryResolver {
    pub fn new() -> Self {
        Self
    }

    /// Explode, export and resolve in one go.
    pub fn resolve_orders<E>(&self, orders: &[Order], exporter: &E) -> CsiResult<Vec<ResolvedOrder>>
    where
        E: GeometryExporter + ?Sized,
    {
        let parts = explode(orders);
        let records = exporter.export_geometry(&parts)?;
        Ok(self.resolve(&parts, &records))
    }

    /// Join parts to coordinate records and fold each order's extent.
    ///
    /// Output is sorted by order id, one entry per distinct id.
    pub fn resolve(&self, parts: &[ExplodedPart], records: &[CoordinateRecord]) -> Vec<ResolvedOrder> {
        let lookup: HashMap<&PartKey, &CoordinateRecord> =
            records.iter().map(|r| (&r.key, r)).collect();

        let mut by_order: BTreeMap<&OrderId, Vec<&PartKey>> = BTreeMap::new();
        for part in parts {
            by_order.entry(&part.key.order_id).or_default().push(&part.key);
        }

        let resolved: Vec<ResolvedOrder> = by_order
            .into_iter()
            .map(|(id, keys)| {
                let (extent, missing) = keys.iter().fold((None, 0usize), |(extent, missing), key| {
                    match lookup.get(key).and_then(|r| Extent::of(&r.coordinates)) {
                        Some(part) => (
                            Some(extent.map_or(part, |e: Extent| e.merge(part))),
                            missing,
                        ),
                        None => {
                            warn!(order = %id, part_index = key.part_index, "No coordinates for part");
                            (extent, missing + 1)
                        }
                    }
                });

                ResolvedOrder {
                    id: id.clone(),
                    x_min: extent.map(|e| e.x_min),
                    x_max: extent.map(|e| e.x_max),
                    y_min: extent.map(|e| e.y_min),
                    y_max: extent.map(|e| e.y_max),
                    width: extent.map(|e| e.width_km()),
                    height: extent.map(|e| e.height_km()),
                    parts: keys.len(),
                    missing_parts: missing,
                }
            })
            .collect();

        debug!(
            orders = resolved.len(),
            parts = parts.len(),
            records = records.len(),
            "Order extents resolved"
        );

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size)
        ]
    }

    fn record(id: &str, part_index: usize, polygon: &Polygon<f64>) -> CoordinateRecord {
        CoordinateRecord {
            key: PartKey::new(OrderId::from(id), part_index),
            coordinates: polygon.exterior().0.clone(),
        }
    }

    #[test]
    fn test_explode_tags_parts() {
        let orders = vec![
            Order::new(
                "A",
                700,
                30,
                MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]),
            ),
            Order::new("B", 700, 30, square(2.0, 2.0, 1.0)),
        ];
        let parts = explode(&orders);

        let keys: Vec<(&str, usize)> = parts
            .iter()
            .map(|p| (p.key.order_id.as_str(), p.key.part_index))
            .collect();
        assert_eq!(keys, vec![("A", 0), ("A", 1), ("B", 0)]);
    }

    #[test]
    fn test_one_degree_square_at_equator() {
        let orders = vec![Order::new("A", 700, 30, square(0.0, 0.0, 1.0))];
        let resolved = OrderGeometryResolver::new()
            .resolve_orders(&orders, &GeoJsonExporter::new())
            .unwrap();

        assert_eq!(resolved.len(), 1);
        let a = &resolved[0];
        assert!((a.width.unwrap() - 111.19).abs() < 0.01);
        assert!((a.height.unwrap() - 111.19).abs() < 0.01);
        assert_eq!(a.missing_parts, 0);
    }

    #[test]
    fn test_multi_part_extent_is_combined() {
        let a0 = square(0.0, 0.0, 1.0);
        let a1 = square(4.0, 2.0, 1.0);
        let parts = explode(&[Order::new(
            "A",
            700,
            30,
            MultiPolygon::new(vec![a0.clone(), a1.clone()]),
        )]);
        let records = vec![record("A", 1, &a1), record("A", 0, &a0)];

        let resolved = OrderGeometryResolver::new().resolve(&parts, &records);
        let a = &resolved[0];
        assert_eq!(a.parts, 2);
        assert_eq!(a.x_min, Some(0.0));
        assert_eq!(a.x_max, Some(5.0));
        assert_eq!(a.y_max, Some(3.0));
    }

    #[test]
    fn test_record_order_does_not_matter() {
        let a0 = square(0.0, 0.0, 1.0);
        let a1 = square(4.0, 2.0, 1.0);
        let b0 = square(9.0, 9.0, 0.5);
        let parts = explode(&[
            Order::new("A", 700, 30, MultiPolygon::new(vec![a0.clone(), a1.clone()])),
            Order::new("B", 700, 30, b0.clone()),
        ]);

        let forward = vec![record("A", 0, &a0), record("A", 1, &a1), record("B", 0, &b0)];
        let mut backward = forward.clone();
        backward.reverse();

        let resolver = OrderGeometryResolver::new();
        assert_eq!(
            resolver.resolve(&parts, &forward),
            resolver.resolve(&parts, &backward)
        );
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let parts = explode(&[Order::new("A", 700, 30, square(0.0, 0.0, 1.0))]);
        let resolved = OrderGeometryResolver::new().resolve(&parts, &[]);

        let a = &resolved[0];
        assert!(!a.is_found());
        assert_eq!(a.width, None);
        assert_eq!(a.missing_parts, 1);

        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["height"], crate::model::NOT_FOUND);
    }

    #[test]
    fn test_partially_missing_parts_still_resolve() {
        let a0 = square(0.0, 0.0, 1.0);
        let parts = explode(&[Order::new(
            "A",
            700,
            30,
            MultiPolygon::new(vec![a0.clone(), square(4.0, 2.0, 1.0)]),
        )]);
        let resolved = OrderGeometryResolver::new().resolve(&parts, &[record("A", 0, &a0)]);

        let a = &resolved[0];
        assert!(a.is_found());
        assert_eq!(a.x_max, Some(1.0));
        assert_eq!(a.missing_parts, 1);
    }

    #[test]
    fn test_degenerate_extent_has_zero_width() {
        let line = CoordinateRecord {
            key: PartKey::new(OrderId::from("A"), 0),
            coordinates: vec![Coord { x: 3.0, y: 0.0 }, Coord { x: 3.0, y: 1.0 }],
        };
        let parts = explode(&[Order::new("A", 700, 30, square(0.0, 0.0, 1.0))]);
        let resolved = OrderGeometryResolver::new().resolve(&parts, &[line]);
        assert_eq!(resolved[0].width, Some(0.0));
    }
}
