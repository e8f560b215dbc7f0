//! Clear Sky Insight - clear-sky order valuation for satellite revisit passes
//!
//! This library computes, for one revisit pass ("rev"), how much priced
//! imaging-order value is both reachable by the sensor and free of cloud.
//!
//! # Architecture
//!
//! ```text
//! VisibilitySelector ──► ValueAssigner ──► Tiler ──► OverlayAggregator ──► CloudMasker
//!  (ONA-tiered subset)    (priority→value)  (strips)   (disjoint regions)    (erase clouds)
//!                                                                              │
//!                                                                              ▼
//!                                                                     ClearValueSurface
//!
//! OrderGeometryResolver ──► per-order extents + width/height (km)
//! MetricsCollector      ──► clear / cloudy inventory counts
//! ```
//!
//! Every component takes its inputs explicitly; [`pipeline::RevPipeline`]
//! wires them together for a rev and [`source::DataSource`] supplies the
//! layers.

pub mod cloud;
pub mod config;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod metrics;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod tiler;
pub mod value;
pub mod visibility;

pub use error::{CsiError, CsiResult};
pub use model::{
    ClearValueSurface, CloudPolygon, InventoryRecord, Order, OrderId, OverlayRegion,
    ResolvedOrder, RevNumber, ValuedOrder, VisibilityCell,
};
