//! Clear / cloudy collection counts from the inventory log.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{InventoryRecord, RevNumber};

/// Default cloud-cover percentage splitting clear from cloudy collections.
pub const DEFAULT_CLOUD_THRESHOLD: f64 = 15.0;

/// Collection counts for one rev.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CloudMetrics {
    pub rev: RevNumber,
    pub clear_count: usize,
    pub cloudy_count: usize,
}

/// Buckets inventory records by cloud cover.
///
/// A record exactly at the threshold is in neither bucket.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    threshold: f64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLOUD_THRESHOLD,
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Count clear and cloudy collections for `rev`.
    pub fn collect(&self, records: &[InventoryRecord], rev: RevNumber) -> CloudMetrics {
        let metrics = records
            .iter()
            .filter(|r| r.acquisition_rev_number == rev)
            .fold(CloudMetrics::empty(rev), |m, r| self.count(m, r));

        debug!(
            rev,
            clear = metrics.clear_count,
            cloudy = metrics.cloudy_count,
            "Inventory metrics collected"
        );
        metrics
    }

    /// Counts for every rev present in the inventory, sorted by rev.
    pub fn collect_all(&self, records: &[InventoryRecord]) -> Vec<CloudMetrics> {
        records
            .iter()
            .fold(BTreeMap::new(), |mut by_rev, r| {
                let rev = r.acquisition_rev_number;
                let m = by_rev.remove(&rev).unwrap_or_else(|| CloudMetrics::empty(rev));
                by_rev.insert(rev, self.count(m, r));
                by_rev
            })
            .into_values()
            .collect()
    }

    fn count(&self, mut metrics: CloudMetrics, record: &InventoryRecord) -> CloudMetrics {
        if record.cloud_cover < self.threshold {
            metrics.clear_count += 1;
        } else if record.cloud_cover > self.threshold {
            metrics.cloudy_count += 1;
        }
        metrics
    }
}

impl CloudMetrics {
    fn empty(rev: RevNumber) -> Self {
        Self {
            rev,
            clear_count: 0,
            cloudy_count: 0,
        }
    }
}
