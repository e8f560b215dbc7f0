//! Geometry support shared by every stage.
//!
//! - [`GeometryIndex`]: read-only R-tree over polygons with intersects,
//!   contains and centroid queries
//! - [`validate_polygon`]: rejects polygons the overlay cannot flatten
//! - [`get_distance`]: great-circle distance in kilometres
//!
//! Coordinates are lon/lat degrees throughout (`x` = longitude,
//! `y` = latitude).

mod distance;
mod index;
mod validate;

pub use distance::{get_distance, km_per_degree_lat, km_per_degree_lon, EARTH_RADIUS_KM};
pub use index::GeometryIndex;
pub use validate::{validate_polygon, GeometryError};

use geo::{Area, BooleanOps, MultiPolygon, Polygon};

/// Polygons smaller than this (square degrees) are always treated as slivers.
pub const SLIVER_AREA: f64 = 1e-12;

/// Sliver cutoff as a fraction of the area being subdivided.
pub const SLIVER_FRACTION: f64 = 1e-7;

/// Smallest piece area kept when subdividing `reference_area` square degrees.
#[inline]
pub fn sliver_threshold(reference_area: f64) -> f64 {
    SLIVER_AREA.max(reference_area * SLIVER_FRACTION)
}

/// Wrap a single polygon as a multi-polygon.
#[inline]
pub fn to_multi(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon.clone()])
}

/// Keep only the parts of a boolean-op result that carry real area.
pub fn significant_parts(multi: MultiPolygon<f64>) -> impl Iterator<Item = Polygon<f64>> {
    parts_above(multi, SLIVER_AREA)
}

/// Keep only the parts larger than `min_area`.
pub fn parts_above(multi: MultiPolygon<f64>, min_area: f64) -> impl Iterator<Item = Polygon<f64>> {
    multi
        .into_iter()
        .filter(move |p| p.unsigned_area() > min_area)
}

/// Union a sequence of polygons into one multi-polygon.
pub fn union_all<I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = Polygon<f64>>,
{
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        })
}
