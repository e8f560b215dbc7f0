//! Error types for clear-sky valuation.
//!
//! Errors are split by blast radius:
//!
//! - [`CsiError::Domain`] and [`CsiError::Geometry`] are per-order. The
//!   pipeline skips the offending order, records it, and carries on.
//! - [`CsiError::Configuration`] and friends are per-run and abort the rev.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::GeometryError;
use crate::model::RevNumber;

/// Result type for clear-sky operations.
pub type CsiResult<T> = Result<T, CsiError>;

/// Errors that can occur while valuing a rev.
#[derive(Debug, Error)]
pub enum CsiError {
    /// Priority is outside the range the value formula is defined for.
    #[error("priority {priority} is outside the valuation domain ({min}..={max})")]
    Domain { priority: i32, min: i32, max: i32 },

    /// An input polygon cannot take part in the overlay.
    #[error("invalid geometry for {subject}: {source}")]
    Geometry {
        subject: String,
        #[source]
        source: GeometryError,
    },

    /// A required layer or resource is missing.
    #[error("{}required resource '{resource}' is unavailable: {reason}", rev_prefix(.rev))]
    Configuration {
        rev: Option<RevNumber>,
        resource: String,
        reason: String,
    },

    /// The strip grid would exceed the configured maximum extent.
    #[error("strip grid of {columns}x{rows} cells exceeds the {max_columns}x{max_rows} limit")]
    GridTooLarge {
        columns: usize,
        rows: usize,
        max_columns: usize,
        max_rows: usize,
    },

    /// Weather raster is malformed.
    #[error("invalid weather raster: {0}")]
    Raster(String),

    /// Failed to decode an input document.
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read or write a file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

fn rev_prefix(rev: &Option<RevNumber>) -> String {
    match rev {
        Some(rev) => format!("rev {}: ", rev),
        None => String::new(),
    }
}

impl CsiError {
    /// Build a configuration error for a missing resource.
    pub fn missing(
        rev: Option<RevNumber>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CsiError::Configuration {
            rev,
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}
