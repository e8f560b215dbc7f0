//! Rev-scoped data model.
//!
//! All types here are plain values owned by the pipeline run that built them.
//! Derived data is attached by wrapping (e.g. [`ValuedOrder`]) rather than by
//! mutating the source record.

use std::collections::BTreeSet;
use std::fmt;

use geo::{Area, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize, Serializer};

/// Satellite revisit pass number.
pub type RevNumber = u32;

/// Sentinel written for extent fields whose coordinates could not be located.
pub const NOT_FOUND: &str = "Not found";

/// Stable external order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An imaging order as loaded from the order feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Tasking priority; drives the clear-sky value.
    pub priority: i32,
    /// Maximum off-nadir angle the order accepts, in degrees.
    pub max_ona: i32,
    /// Footprint in lon/lat degrees. May be multi-part.
    pub footprint: MultiPolygon<f64>,
}

impl Order {
    pub fn new(
        id: impl Into<OrderId>,
        priority: i32,
        max_ona: i32,
        footprint: impl Into<MultiPolygon<f64>>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            max_ona,
            footprint: footprint.into(),
        }
    }

    /// Number of parts in the footprint.
    pub fn part_count(&self) -> usize {
        self.footprint.0.len()
    }
}

/// An order tagged with its clear-sky value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuedOrder {
    pub order: Order,
    pub value: u32,
}

impl ValuedOrder {
    pub fn id(&self) -> &OrderId {
        &self.order.id
    }
}

/// A sensor visibility cell (one ONV record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityCell {
    pub rev_num: RevNumber,
    /// Off-nadir angle tier of the cell, in degrees.
    pub ona_tier: i32,
    /// Days from the current pass; 0 is the current pass.
    pub days_offset: i32,
    pub geometry: Polygon<f64>,
}

/// One piece of the flattened order surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRegion {
    pub geometry: Polygon<f64>,
    pub contributing_order_ids: BTreeSet<OrderId>,
    pub value_sum: u64,
}

impl OverlayRegion {
    /// A region owned by no order.
    pub fn unowned(geometry: Polygon<f64>) -> Self {
        Self {
            geometry,
            contributing_order_ids: BTreeSet::new(),
            value_sum: 0,
        }
    }

    pub fn is_owned_by(&self, id: &OrderId) -> bool {
        self.contributing_order_ids.contains(id)
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// A cloud polygon produced by raster vectorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudPolygon {
    pub geometry: Polygon<f64>,
}

impl From<Polygon<f64>> for CloudPolygon {
    fn from(geometry: Polygon<f64>) -> Self {
        Self { geometry }
    }
}

/// Valued regions left after cloud removal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearValueSurface {
    pub rev: RevNumber,
    pub regions: Vec<OverlayRegion>,
}

impl ClearValueSurface {
    pub fn new(rev: RevNumber, regions: Vec<OverlayRegion>) -> Self {
        Self { rev, regions }
    }

    /// Sum of `value_sum` over every region.
    pub fn total_value(&self) -> u64 {
        self.regions.iter().map(|r| r.value_sum).sum()
    }

    /// Total clear area in square degrees.
    pub fn area(&self) -> f64 {
        self.regions.iter().map(OverlayRegion::area).sum()
    }

    /// Orders that still own at least one clear region.
    pub fn order_ids(&self) -> BTreeSet<OrderId> {
        self.regions
            .iter()
            .flat_map(|r| r.contributing_order_ids.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Per-order bounding extent reconstructed from exploded parts.
///
/// Extent and dimension fields are `None` when no coordinate record could be
/// matched; they serialize as `"Not found"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOrder {
    pub id: OrderId,
    #[serde(serialize_with = "not_found_if_none")]
    pub x_min: Option<f64>,
    #[serde(serialize_with = "not_found_if_none")]
    pub x_max: Option<f64>,
    #[serde(serialize_with = "not_found_if_none")]
    pub y_min: Option<f64>,
    #[serde(serialize_with = "not_found_if_none")]
    pub y_max: Option<f64>,
    /// East-west extent in kilometres.
    #[serde(serialize_with = "not_found_if_none")]
    pub width: Option<f64>,
    /// North-south extent in kilometres.
    #[serde(serialize_with = "not_found_if_none")]
    pub height: Option<f64>,
    /// Number of exploded parts seen for this id.
    pub parts: usize,
    /// Parts with no matching coordinate record.
    pub missing_parts: usize,
}

impl ResolvedOrder {
    pub fn is_found(&self) -> bool {
        self.x_min.is_some()
    }
}

fn not_found_if_none<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str(NOT_FOUND),
    }
}

/// One collection record from the inventory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub acquisition_rev_number: RevNumber,
    /// Cloud cover percentage.
    pub cloud_cover: f64,
    /// Remaining attributes, carried through untouched.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl InventoryRecord {
    pub fn new(acquisition_rev_number: RevNumber, cloud_cover: f64) -> Self {
        Self {
            acquisition_rev_number,
            cloud_cover,
            attributes: serde_json::Map::new(),
        }
    }
}
