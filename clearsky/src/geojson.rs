//! GeoJSON feature (de)serialization.
//!
//! Only the subset the order and visibility layers use is supported:
//! `FeatureCollection`s of `Polygon` / `MultiPolygon` features with flat
//! property objects. Positions may carry a third (height) ordinate; it is
//! ignored.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{CsiError, CsiResult};
use crate::geometry::GeometryError;
use crate::model::{Order, OrderId, RevNumber, VisibilityCell};

/// A GeoJSON position: `[lon, lat]` or `[lon, lat, height]`.
pub type Position = Vec<f64>;

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn from_polygon(polygon: &Polygon<f64>) -> Self {
        Geometry::Polygon(polygon_rings(polygon))
    }

    /// Convert to a `geo` multi-polygon.
    pub fn to_multi_polygon(&self) -> Result<MultiPolygon<f64>, GeometryError> {
        match self {
            Geometry::Polygon(rings) => Ok(MultiPolygon::new(vec![to_polygon(rings)?])),
            Geometry::MultiPolygon(polygons) if polygons.is_empty() => Err(
                GeometryError::Malformed("multi-polygon has no parts".to_string()),
            ),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new),
        }
    }
}

/// A GeoJSON feature with typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    pub geometry: Option<Geometry>,
    pub properties: P,
}

/// A GeoJSON feature collection with typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self { features }
    }
}

/// Attributes of an order feature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderProperties {
    #[serde(alias = "external_i", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "tasking_pr")]
    pub priority: i32,
    pub max_ona: i32,
}

/// Attributes of a visibility cell feature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellProperties {
    pub rev_num: RevNumber,
    pub ona_tier: i32,
    #[serde(default)]
    pub days_offset: i32,
}

/// Parse an order layer.
///
/// Features without geometry, or whose coordinates do not form polygons, are
/// skipped with a warning; the rest of the layer still loads.
pub fn parse_orders(text: &str) -> CsiResult<Vec<Order>> {
    let collection: FeatureCollection<OrderProperties> = parse("order layer", text)?;

    let mut orders = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let props = feature.properties;
        let Some(geometry) = feature.geometry else {
            warn!(order = %props.id, "Order feature has no geometry, skipping");
            continue;
        };
        let footprint = match geometry.to_multi_polygon() {
            Ok(footprint) => footprint,
            Err(source) => {
                let err = CsiError::Geometry {
                    subject: format!("order {}", props.id),
                    source,
                };
                warn!(order = %props.id, error = %err, "Skipping order feature");
                continue;
            }
        };
        orders.push(Order::new(
            OrderId::new(props.id),
            props.priority,
            props.max_ona,
            footprint,
        ));
    }
    Ok(orders)
}

/// Parse a visibility layer. Multi-part cells become one cell per part.
///
/// Malformed cells are skipped with a warning.
pub fn parse_cells(text: &str) -> CsiResult<Vec<VisibilityCell>> {
    let collection: FeatureCollection<CellProperties> = parse("visibility layer", text)?;

    let mut cells = Vec::new();
    for (position, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties;
        let Some(geometry) = feature.geometry else {
            warn!(rev = props.rev_num, "Visibility feature has no geometry, skipping");
            continue;
        };
        let parts = match geometry.to_multi_polygon() {
            Ok(parts) => parts,
            Err(source) => {
                let err = CsiError::Geometry {
                    subject: format!("visibility feature {} (rev {})", position, props.rev_num),
                    source,
                };
                warn!(rev = props.rev_num, error = %err, "Skipping visibility feature");
                continue;
            }
        };
        cells.extend(parts.into_iter().map(|polygon| VisibilityCell {
            rev_num: props.rev_num,
            ona_tier: props.ona_tier,
            days_offset: props.days_offset,
            geometry: polygon,
        }));
    }
    Ok(cells)
}

/// Decode a JSON document, tagging failures with what was being read.
pub fn parse<T>(what: &str, text: &str) -> CsiResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(text).map_err(|source| CsiError::Parse {
        what: what.to_string(),
        source,
    })
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| GeometryError::Malformed("polygon has no exterior ring".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_line_string(ring: &[Position]) -> Result<LineString<f64>, GeometryError> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(GeometryError::Malformed(format!(
                "position has {} ordinates, need at least 2",
                position.len()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Accept ids written either as strings or as numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}
