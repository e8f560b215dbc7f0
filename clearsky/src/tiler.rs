//! Strip tiling of a footprint.
//!
//! Covers the bounding extent of a set of footprints with a grid of
//! non-overlapping rectangular strips (15 km × 60 km by default) and keeps
//! only the strips that touch a footprint. Each strip bounds one overlay run,
//! so no flattened piece is ever larger than a strip.
//!
//! ```text
//!   x_min                                   x_max
//!   ┌────┬────┬────┬────┬────┐ y_max
//!   │ 0,0│ 1,0│    │    │    │     narrow (15 km) across,
//!   │    │  ▓▓▓▓▓▓▓│    │    │     wide (60 km) along
//!   ├────┼──▓▓▓▓▓▓▓▓▓──┼────┤
//!   │    │  ▓▓│    │▓▓▓│    │     strips not touching ▓ are dropped
//!   └────┴────┴────┴────┴────┘ y_min
//! ```

use geo::{coord, Rect};
use tracing::debug;

use crate::error::{CsiError, CsiResult};
use crate::geometry::{km_per_degree_lat, km_per_degree_lon, GeometryIndex};

/// Default strip width across the track, in kilometres.
pub const DEFAULT_NARROW_KM: f64 = 15.0;

/// Default strip length along the track, in kilometres.
pub const DEFAULT_WIDE_KM: f64 = 60.0;

/// Default maximum number of strip columns.
pub const DEFAULT_MAX_COLUMNS: usize = 369;

/// Default maximum number of strip rows.
pub const DEFAULT_MAX_ROWS: usize = 853;

/// Smallest longitude scale used near the poles (km per degree).
const MIN_KM_PER_DEGREE: f64 = 1e-6;

/// Which axis the narrow side of a strip runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripOrientation {
    /// Narrow east-west, long north-south.
    #[default]
    NorthSouth,
    /// Narrow north-south, long east-west.
    EastWest,
}

impl StripOrientation {
    /// Parse from a config string.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "north_south" | "ns" => Some(StripOrientation::NorthSouth),
            "east_west" | "ew" => Some(StripOrientation::EastWest),
            _ => None,
        }
    }

    pub fn as_config_str(&self) -> &'static str {
        match self {
            StripOrientation::NorthSouth => "north_south",
            StripOrientation::EastWest => "east_west",
        }
    }
}

/// One cell of the strip grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    /// Column, counted from the west edge.
    pub column: usize,
    /// Row, counted from the north edge.
    pub row: usize,
    pub bounds: Rect<f64>,
}

/// Splits a footprint extent into bounded strips.
#[derive(Debug, Clone)]
pub struct Tiler {
    narrow_km: f64,
    wide_km: f64,
    max_columns: usize,
    max_rows: usize,
    orientation: StripOrientation,
}

impl Default for Tiler {
    fn default() -> Self {
        Self {
            narrow_km: DEFAULT_NARROW_KM,
            wide_km: DEFAULT_WIDE_KM,
            max_columns: DEFAULT_MAX_COLUMNS,
            max_rows: DEFAULT_MAX_ROWS,
            orientation: StripOrientation::default(),
        }
    }
}

impl Tiler {
    pub fn new(narrow_km: f64, wide_km: f64) -> Self {
        Self {
            narrow_km,
            wide_km,
            ..Default::default()
        }
    }

    /// Set the maximum grid extent in cells.
    pub fn with_max_grid(mut self, max_columns: usize, max_rows: usize) -> Self {
        self.max_columns = max_columns;
        self.max_rows = max_rows;
        self
    }

    pub fn with_orientation(mut self, orientation: StripOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Strip dimensions as (east-west km, north-south km).
    fn cell_km(&self) -> (f64, f64) {
        match self.orientation {
            StripOrientation::NorthSouth => (self.narrow_km, self.wide_km),
            StripOrientation::EastWest => (self.wide_km, self.narrow_km),
        }
    }

    /// Build the strips touching the indexed footprints.
    ///
    /// Returns an empty list when the index is empty.
    ///
    /// # Errors
    ///
    /// * [`CsiError::Config`] if a strip length is not positive
    /// * [`CsiError::GridTooLarge`] if the extent needs more cells than allowed
    pub fn strips(&self, footprints: &GeometryIndex) -> CsiResult<Vec<Strip>> {
        if !(self.narrow_km > 0.0 && self.wide_km > 0.0) {
            return Err(CsiError::Config(format!(
                "strip lengths must be positive (narrow {} km, wide {} km)",
                self.narrow_km, self.wide_km
            )));
        }

        let Some(bounds) = footprints.bounds() else {
            return Ok(Vec::new());
        };

        let mid_lat = (bounds.min().y + bounds.max().y) / 2.0;
        let (width_km, height_km) = self.cell_km();
        let cell_w = width_km / km_per_degree_lon(mid_lat).max(MIN_KM_PER_DEGREE);
        let cell_h = height_km / km_per_degree_lat();

        let columns = ((bounds.width() / cell_w).ceil() as usize).max(1);
        let rows = ((bounds.height() / cell_h).ceil() as usize).max(1);

        if columns > self.max_columns || rows > self.max_rows {
            return Err(CsiError::GridTooLarge {
                columns,
                rows,
                max_columns: self.max_columns,
                max_rows: self.max_rows,
            });
        }

        let x0 = bounds.min().x;
        let y_top = bounds.max().y;
        let strips: Vec<Strip> = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (column, row)))
            .map(|(column, row)| {
                let min_x = x0 + column as f64 * cell_w;
                let max_y = y_top - row as f64 * cell_h;
                Strip {
                    column,
                    row,
                    bounds: Rect::new(
                        coord! { x: min_x, y: max_y - cell_h },
                        coord! { x: min_x + cell_w, y: max_y },
                    ),
                }
            })
            .filter(|strip| !footprints.intersecting_rect(&strip.bounds).is_empty())
            .collect();

        debug!(columns, rows, kept = strips.len(), "Strip grid built");

        Ok(strips)
    }
}
