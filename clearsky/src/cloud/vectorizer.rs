//! Raster-to-polygon conversion.

use geo::{BooleanOps, Intersects, MultiPolygon, Polygon, Rect};
use tracing::debug;

use super::raster::WeatherRaster;
use crate::error::CsiResult;
use crate::geometry::{significant_parts, union_all};

/// Default raster code marking a cloudy cell.
pub const DEFAULT_CLOUD_CODE: u8 = 0;

/// Turns the cloudy cells of a raster into polygons.
///
/// Implementations are free to use any vectorization strategy; the masker
/// only relies on the output covering the cloudy cells inside `clip`.
pub trait Vectorizer: Send + Sync {
    /// Polygons covering cloudy cells within `extent`, clipped to `clip`.
    fn vectorize(
        &self,
        raster: &WeatherRaster,
        extent: &Rect<f64>,
        clip: &MultiPolygon<f64>,
    ) -> CsiResult<Vec<Polygon<f64>>>;
}

/// Vectorizer that merges horizontal runs of cloudy cells and unions them.
#[derive(Debug, Clone, Copy)]
pub struct GridVectorizer {
    cloud_code: u8,
}

impl Default for GridVectorizer {
    fn default() -> Self {
        Self {
            cloud_code: DEFAULT_CLOUD_CODE,
        }
    }
}

impl GridVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cloud_code(mut self, cloud_code: u8) -> Self {
        self.cloud_code = cloud_code;
        self
    }

    pub fn cloud_code(&self) -> u8 {
        self.cloud_code
    }

    /// Row runs of cloudy cells, one rectangle per run.
    fn runs(&self, raster: &WeatherRaster) -> Vec<Rect<f64>> {
        let cloudy = |row, col| raster.code(row, col) == Some(self.cloud_code);
        let mut runs = Vec::new();

        for row in 0..raster.rows() {
            let mut col = 0;
            while col < raster.cols() {
                if !cloudy(row, col) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < raster.cols() && cloudy(row, col) {
                    col += 1;
                }
                runs.push(raster.run_rect(row, start, col));
            }
        }

        runs
    }
}

impl Vectorizer for GridVectorizer {
    fn vectorize(
        &self,
        raster: &WeatherRaster,
        extent: &Rect<f64>,
        clip: &MultiPolygon<f64>,
    ) -> CsiResult<Vec<Polygon<f64>>> {
        if clip.0.is_empty() {
            return Ok(Vec::new());
        }

        let runs: Vec<Polygon<f64>> = self
            .runs(raster)
            .into_iter()
            .filter(|run| run.intersects(extent))
            .map(|run| run.to_polygon())
            .collect();
        let run_count = runs.len();

        let clouds: Vec<Polygon<f64>> =
            significant_parts(union_all(runs).intersection(clip)).collect();

        debug!(
            code = self.cloud_code,
            runs = run_count,
            polygons = clouds.len(),
            "Raster vectorized"
        );

        Ok(clouds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, Area};

    fn raster(rows: usize, cols: usize, codes: Vec<u8>) -> WeatherRaster {
        let extent = Rect::new(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: cols as f64, y: rows as f64 },
        );
        WeatherRaster::new(extent, rows, cols, codes).unwrap()
    }

    fn everywhere(r: &WeatherRaster) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![r.extent().to_polygon()])
    }

    #[test]
    fn test_runs_merge_horizontally() {
        let r = raster(2, 4, vec![0, 0, 1, 0, 1, 1, 1, 1]);
        let runs = GridVectorizer::new().runs(&r);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].width(), 2.0);
    }

    #[test]
    fn test_vectorize_covers_cloudy_cells() {
        let r = raster(2, 2, vec![0, 0, 0, 1]);
        let polygons = GridVectorizer::new()
            .vectorize(&r, &r.extent(), &everywhere(&r))
            .unwrap();

        let area: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!((area - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_vectorize_clips_to_footprint() {
        let r = raster(2, 2, vec![0; 4]);
        let clip = MultiPolygon::new(vec![Rect::new(
            coord! { x: 0.5, y: 0.5 },
            coord! { x: 1.5, y: 1.0 },
        )
        .to_polygon()]);
        let polygons = GridVectorizer::new().vectorize(&r, &r.extent(), &clip).unwrap();

        let area: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!((area - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_custom_cloud_code() {
        let r = raster(1, 3, vec![0, 7, 7]);
        let polygons = GridVectorizer::new()
            .with_cloud_code(7)
            .vectorize(&r, &r.extent(), &everywhere(&r))
            .unwrap();

        let area: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!((area - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_raster_yields_nothing() {
        let r = raster(2, 2, vec![1; 4]);
        let polygons = GridVectorizer::new()
            .vectorize(&r, &r.extent(), &everywhere(&r))
            .unwrap();
        assert!(polygons.is_empty());
    }

    #[test]
    fn test_empty_clip_yields_nothing() {
        let r = raster(2, 2, vec![0; 4]);
        let polygons = GridVectorizer::new()
            .vectorize(&r, &r.extent(), &MultiPolygon::new(Vec::new()))
            .unwrap();
        assert!(polygons.is_empty());
    }
}
