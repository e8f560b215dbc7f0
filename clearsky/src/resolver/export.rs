//! Coordinate export of exploded parts.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExplodedPart, PartKey};
use crate::error::{CsiError, CsiResult};
use crate::geojson::{self, Feature, FeatureCollection, Geometry};
use crate::model::OrderId;

/// Vertices exported for one exploded part.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRecord {
    pub key: PartKey,
    pub coordinates: Vec<Coord<f64>>,
}

/// Produces coordinate records for exploded parts.
///
/// Records may come back in any order; the resolver joins them by
/// [`PartKey`].
pub trait GeometryExporter {
    fn export_geometry(&self, parts: &[ExplodedPart]) -> CsiResult<Vec<CoordinateRecord>>;
}

/// Properties written on each exported part feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartProperties {
    #[serde(alias = "external_i", deserialize_with = "geojson::string_or_number")]
    pub id: String,
    /// Missing in legacy exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_index: Option<usize>,
}

/// Exports parts as a GeoJSON feature collection.
///
/// With an output path the document is written to disk and read back, so the
/// records reflect exactly what a downstream consumer of the file would see.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonExporter {
    output: Option<PathBuf>,
}

impl GeoJsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist the export document at `path`.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Build the export document.
    pub fn to_geojson(parts: &[ExplodedPart]) -> FeatureCollection<PartProperties> {
        FeatureCollection::new(
            parts
                .iter()
                .map(|part| Feature {
                    geometry: Some(Geometry::from_polygon(&part.geometry)),
                    properties: PartProperties {
                        id: part.key.order_id.to_string(),
                        part_index: Some(part.key.part_index),
                    },
                })
                .collect(),
        )
    }

    /// Read coordinate records from an export document.
    ///
    /// Features without a `part_index` get one assigned in encounter order
    /// per id, matching how legacy exports enumerated duplicate ids.
    pub fn parse(text: &str) -> CsiResult<Vec<CoordinateRecord>> {
        let collection: FeatureCollection<PartProperties> = geojson::parse("geometry export", text)?;
        let mut next_index: HashMap<String, usize> = HashMap::new();

        collection
            .features
            .into_iter()
            .map(|feature| -> CsiResult<CoordinateRecord> {
                let PartProperties { id, part_index } = feature.properties;
                let counter = next_index.entry(id.clone()).or_insert(0);
                let part_index = part_index.unwrap_or(*counter);
                *counter = part_index + 1;

                let coordinates = match feature.geometry {
                    Some(geometry) => geometry
                        .to_multi_polygon()
                        .map_err(|source| CsiError::Geometry {
                            subject: format!("exported part {} of order {}", part_index, id),
                            source,
                        })?
                        .iter()
                        .flat_map(|p| p.exterior().0.clone())
                        .collect(),
                    None => Vec::new(),
                };

                Ok(CoordinateRecord {
                    key: PartKey::new(OrderId::new(id), part_index),
                    coordinates,
                })
            })
            .collect()
    }
}

impl GeometryExporter for GeoJsonExporter {
    fn export_geometry(&self, parts: &[ExplodedPart]) -> CsiResult<Vec<CoordinateRecord>> {
        let document = serde_json::to_string(&Self::to_geojson(parts)).map_err(|source| {
            CsiError::Parse {
                what: "geometry export".to_string(),
                source,
            }
        })?;

        let text = match &self.output {
            Some(path) => {
                fs::write(path, &document).map_err(|source| CsiError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), parts = parts.len(), "Geometry export written");
                fs::read_to_string(path).map_err(|source| CsiError::Io {
                    path: path.clone(),
                    source,
                })?
            }
            None => document,
        };

        Self::parse(&text)
    }
}
