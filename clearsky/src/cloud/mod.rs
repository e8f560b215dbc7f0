//! Cloud masking of the valued surface.
//!
//! # Architecture
//!
//! ```text
//! WeatherRaster ──► Vectorizer ──► CloudPolygon set
//!                  (clip = rev footprint)     │
//!                                            ▼
//! OverlayRegion set ───────────────────────► erase ──► ClearValueSurface
//! ```
//!
//! Erasing keeps each region's contributors and value untouched: a region
//! partly under cloud keeps its full `value_sum` on whatever clear area is
//! left. A region cut into several pieces yields one region per piece.

mod raster;
mod vectorizer;

pub use raster::WeatherRaster;
pub use vectorizer::{GridVectorizer, Vectorizer, DEFAULT_CLOUD_CODE};

use geo::{BooleanOps, BoundingRect, MultiPolygon};
use tracing::debug;

use crate::error::CsiResult;
use crate::geometry::{significant_parts, to_multi, union_all, GeometryIndex};
use crate::model::{ClearValueSurface, CloudPolygon, OverlayRegion, RevNumber};

/// Removes cloud-covered area from overlay regions.
#[derive(Debug, Clone, Default)]
pub struct CloudMasker<V> {
    vectorizer: V,
}

impl<V: Vectorizer> CloudMasker<V> {
    pub fn new(vectorizer: V) -> Self {
        Self { vectorizer }
    }

    pub fn vectorizer(&self) -> &V {
        &self.vectorizer
    }

    /// Cloud polygons inside `clip`.
    pub fn clouds(
        &self,
        raster: &WeatherRaster,
        clip: &MultiPolygon<f64>,
    ) -> CsiResult<Vec<CloudPolygon>> {
        let Some(extent) = clip.bounding_rect() else {
            return Ok(Vec::new());
        };
        let polygons = self.vectorizer.vectorize(raster, &extent, clip)?;
        Ok(polygons.into_iter().map(CloudPolygon::from).collect())
    }

    /// Vectorize the raster within `clip` and erase the clouds from `regions`.
    ///
    /// # Arguments
    ///
    /// * `rev` - Rev the surface belongs to
    /// * `regions` - Flattened overlay regions
    /// * `raster` - Cloud-cover raster
    /// * `clip` - Rev footprint the clouds are clipped to
    pub fn mask(
        &self,
        rev: RevNumber,
        regions: Vec<OverlayRegion>,
        raster: &WeatherRaster,
        clip: &MultiPolygon<f64>,
    ) -> CsiResult<ClearValueSurface> {
        let clouds = self.clouds(raster, clip)?;
        let before = regions.len();
        let clear = erase(regions, &clouds);

        debug!(
            rev,
            clouds = clouds.len(),
            regions_before = before,
            regions_after = clear.len(),
            "Clouds erased"
        );

        Ok(ClearValueSurface::new(rev, clear))
    }
}

/// Subtract cloud polygons from every region.
///
/// Regions wholly under cloud disappear; the rest keep their contributors and
/// value. Running it twice with the same clouds changes nothing.
pub fn erase(regions: Vec<OverlayRegion>, clouds: &[CloudPolygon]) -> Vec<OverlayRegion> {
    if clouds.is_empty() {
        return regions;
    }

    let index = GeometryIndex::new(clouds.iter().map(|c| to_multi(&c.geometry)));

    regions
        .into_iter()
        .flat_map(|region| {
            let region_multi = to_multi(&region.geometry);
            let hits = index.intersecting(&region_multi);
            if hits.is_empty() {
                return vec![region];
            }

            let cover = union_all(hits.iter().map(|&i| clouds[i].geometry.clone()));
            significant_parts(region_multi.difference(&cover))
                .map(|geometry| OverlayRegion {
                    geometry,
                    contributing_order_ids: region.contributing_order_ids.clone(),
                    value_sum: region.value_sum,
                })
                .collect()
        })
        .collect()
}
