//! Per-rev valuation pipeline.
//!
//! # Architecture
//!
//! ```text
//! RevInputs ─► select ─► value ─► tile + aggregate ─► mask clouds ─► surface
//!     │                                                                │
//!     ├──────► explode + export + resolve ─────────────────────────────┤
//!     └──────► inventory metrics ──────────────────────────────────────┴─► RevReport
//! ```
//!
//! Each rev builds its own indexes from the shared, read-only [`RevInputs`],
//! so independent revs run in parallel without coordination.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::cloud::{CloudMasker, GridVectorizer, Vectorizer};
use crate::config::PipelineConfig;
use crate::error::{CsiError, CsiResult};
use crate::metrics::{CloudMetrics, MetricsCollector};
use crate::model::{ClearValueSurface, OrderId, ResolvedOrder, RevNumber};
use crate::overlay::{OverlayAggregator, RejectedGeometry};
use crate::resolver::{GeoJsonExporter, GeometryExporter, OrderGeometryResolver};
use crate::source::RevInputs;
use crate::tiler::Tiler;
use crate::value::{SkippedOrder, ValueAssigner};
use crate::visibility::{rev_footprint, VisibilitySelector};

/// Everything produced for one rev.
#[derive(Debug, Clone, Serialize)]
pub struct RevReport {
    pub rev: RevNumber,
    /// Orders touching the rev before ONA limits.
    pub candidate_count: usize,
    pub selected: Vec<OrderId>,
    pub locked_out: Vec<OrderId>,
    /// Orders whose priority has no value.
    pub skipped: Vec<SkippedOrder>,
    /// Footprint parts dropped as invalid geometry.
    pub rejected: Vec<RejectedGeometry>,
    /// Sum of `value_sum` over the clear surface.
    pub total_value: u64,
    pub surface: ClearValueSurface,
    pub resolved: Vec<ResolvedOrder>,
    pub metrics: CloudMetrics,
}

/// Runs the valuation steps for a rev.
#[derive(Debug, Clone)]
pub struct RevPipeline<V = GridVectorizer, E = GeoJsonExporter> {
    selector: VisibilitySelector,
    tiler: Tiler,
    aggregator: OverlayAggregator,
    masker: CloudMasker<V>,
    resolver: OrderGeometryResolver,
    exporter: E,
    metrics: MetricsCollector,
}

impl RevPipeline {
    /// Pipeline with the built-in vectorizer and in-memory GeoJSON export.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config, config.vectorizer(), GeoJsonExporter::new())
    }
}

impl<V: Vectorizer, E: GeometryExporter> RevPipeline<V, E> {
    /// # Arguments
    ///
    /// * `config` - Selection, strip and metrics settings
    /// * `vectorizer` - Raster-to-polygon service for cloud masking
    /// * `exporter` - Coordinate export used by the resolver
    pub fn new(config: &PipelineConfig, vectorizer: V, exporter: E) -> Self {
        Self {
            selector: config.selector(),
            tiler: config.tiler(),
            aggregator: OverlayAggregator::new(),
            masker: CloudMasker::new(vectorizer),
            resolver: OrderGeometryResolver::new(),
            exporter,
            metrics: config.metrics(),
        }
    }

    /// Value one rev.
    ///
    /// # Errors
    ///
    /// Fails with [`CsiError::Configuration`] when the rev has no visibility
    /// cells or no weather raster, and with [`CsiError::GridTooLarge`] when
    /// the selected footprints span too many strips. Per-order problems are
    /// reported in the [`RevReport`] instead.
    pub fn run(&self, inputs: &RevInputs, rev: RevNumber) -> CsiResult<RevReport> {
        let raster = inputs.weather(rev)?;
        let clip = rev_footprint(&inputs.cells, rev, self.selector.days_offset());
        if clip.0.is_empty() {
            return Err(CsiError::missing(
                Some(rev),
                "visibility cells",
                "no cells for this rev",
            ));
        }

        let selection = self.selector.select(&inputs.orders, &inputs.cells, rev);
        let valuation = ValueAssigner::assign_all(selection.orders.iter().cloned());
        debug!(
            rev,
            valued = valuation.valued.len(),
            skipped = valuation.skipped.len(),
            "Orders valued"
        );

        let outcome = self.aggregator.aggregate_tiled(&valuation.valued, &self.tiler)?;
        let surface = self.masker.mask(rev, outcome.regions, raster, &clip)?;
        let resolved = self.resolver.resolve_orders(&selection.orders, &self.exporter)?;
        let metrics = self.metrics.collect(&inputs.inventory, rev);

        let total_value = surface.total_value();
        info!(
            rev,
            selected = selection.orders.len(),
            locked_out = selection.locked_out.len(),
            regions = surface.regions.len(),
            total_value,
            clear = metrics.clear_count,
            cloudy = metrics.cloudy_count,
            "Rev valued"
        );

        Ok(RevReport {
            rev,
            candidate_count: selection.candidate_count,
            selected: selection.orders.iter().map(|o| o.id.clone()).collect(),
            locked_out: selection.locked_out.into_iter().collect(),
            skipped: valuation.skipped,
            rejected: outcome.rejected,
            total_value,
            surface,
            resolved,
            metrics,
        })
    }
}

impl<V, E> RevPipeline<V, E>
where
    V: Vectorizer,
    E: GeometryExporter + Sync,
{
    /// Value several revs in parallel.
    ///
    /// Reports come back in the order of `revs`. The first failing rev aborts
    /// the batch.
    pub fn run_revs(&self, inputs: &RevInputs, revs: &[RevNumber]) -> CsiResult<Vec<RevReport>> {
        revs.par_iter().map(|&rev| self.run(inputs, rev)).collect()
    }
}
