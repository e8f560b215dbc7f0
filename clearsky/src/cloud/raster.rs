//! Cloud-cover raster.

use geo::{coord, Rect};
use serde::Deserialize;

use crate::error::{CsiError, CsiResult};

/// A grid of cloud-cover codes over a lon/lat extent.
///
/// Cells are stored row-major with row 0 along the north edge, the usual
/// raster convention.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RasterDocument")]
pub struct WeatherRaster {
    extent: Rect<f64>,
    rows: usize,
    cols: usize,
    codes: Vec<u8>,
}

/// On-disk form of a raster.
#[derive(Debug, Deserialize)]
struct RasterDocument {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
    rows: usize,
    cols: usize,
    codes: Vec<u8>,
}

impl TryFrom<RasterDocument> for WeatherRaster {
    type Error = CsiError;

    fn try_from(doc: RasterDocument) -> CsiResult<Self> {
        let extent = Rect::new(
            coord! { x: doc.x_min, y: doc.y_min },
            coord! { x: doc.x_max, y: doc.y_max },
        );
        WeatherRaster::new(extent, doc.rows, doc.cols, doc.codes)
    }
}

impl WeatherRaster {
    /// Create a raster, checking the grid shape against the code buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CsiError::Raster`] for an empty grid, a code count that does
    /// not match `rows * cols`, or a degenerate extent.
    pub fn new(extent: Rect<f64>, rows: usize, cols: usize, codes: Vec<u8>) -> CsiResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CsiError::Raster(format!("empty grid {}x{}", rows, cols)));
        }
        if codes.len() != rows * cols {
            return Err(CsiError::Raster(format!(
                "{} codes for a {}x{} grid",
                codes.len(),
                rows,
                cols
            )));
        }
        let finite = [extent.min(), extent.max()]
            .iter()
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !finite || extent.width() <= 0.0 || extent.height() <= 0.0 {
            return Err(CsiError::Raster("extent has no area".to_string()));
        }

        Ok(Self {
            extent,
            rows,
            cols,
            codes,
        })
    }

    /// A raster with every cell set to `code`.
    pub fn filled(extent: Rect<f64>, rows: usize, cols: usize, code: u8) -> CsiResult<Self> {
        Self::new(extent, rows, cols, vec![code; rows * cols])
    }

    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Code at `(row, col)`, or `None` outside the grid.
    pub fn code(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.codes.get(row * self.cols + col).copied()
    }

    fn cell_width(&self) -> f64 {
        self.extent.width() / self.cols as f64
    }

    fn cell_height(&self) -> f64 {
        self.extent.height() / self.rows as f64
    }

    /// Bounds of the cells `[start_col, end_col)` in `row`.
    pub fn run_rect(&self, row: usize, start_col: usize, end_col: usize) -> Rect<f64> {
        let x0 = self.extent.min().x;
        let y_top = self.extent.max().y;
        let (w, h) = (self.cell_width(), self.cell_height());
        Rect::new(
            coord! { x: x0 + start_col as f64 * w, y: y_top - (row + 1) as f64 * h },
            coord! { x: x0 + end_col as f64 * w, y: y_top - row as f64 * h },
        )
    }

    /// Bounds of a single cell.
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect<f64> {
        self.run_rect(row, col, col + 1)
    }
}
