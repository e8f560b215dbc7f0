//! ONA-tiered visibility selection.
//!
//! Picks the orders a rev can reach. The candidate set is every order that
//! touches the rev's current-pass visibility cells; when ONA limits are
//! respected, the tiers are then swept from widest to narrowest:
//!
//! ```text
//! candidates ─► tier 35 ─► tier 30 ─► tier 25 ─► tier 20 ─► tier 15 ─► selection
//!               │ remove max_ona < t+1 (locked out for good)
//!               │ add orders touching tier-t cells (unless locked out)
//! ```
//!
//! Lockout is one-way: once an order is removed it stays out, no matter which
//! narrower tier's cells it touches afterwards.

use std::collections::BTreeSet;

use geo::MultiPolygon;
use tracing::debug;

use crate::geometry::{to_multi, GeometryIndex};
use crate::model::{Order, OrderId, RevNumber, VisibilityCell};

/// Default ONA tiers in degrees, widest first.
pub const DEFAULT_ONA_TIERS: [i32; 5] = [35, 30, 25, 20, 15];

/// Day offset of the current pass.
pub const CURRENT_PASS: i32 = 0;

/// Orders reachable on a rev.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub rev: RevNumber,
    /// Selected orders, sorted by id.
    pub orders: Vec<Order>,
    /// Orders touching the rev before ONA limits were applied.
    pub candidate_count: usize,
    /// Orders removed by an ONA tier.
    pub locked_out: BTreeSet<OrderId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Selects the orders a rev can image.
#[derive(Debug, Clone)]
pub struct VisibilitySelector {
    tiers: Vec<i32>,
    days_offset: i32,
    respect_ona: bool,
}

impl Default for VisibilitySelector {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_ONA_TIERS.to_vec(),
            days_offset: CURRENT_PASS,
            respect_ona: true,
        }
    }
}

impl VisibilitySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ONA tiers. They are swept widest first regardless of the order
    /// given here.
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = i32>) -> Self {
        let mut tiers: Vec<i32> = tiers.into_iter().collect();
        tiers.sort_unstable_by(|a, b| b.cmp(a));
        tiers.dedup();
        self.tiers = tiers;
        self
    }

    /// Set which day offset counts as the pass being valued.
    pub fn with_days_offset(mut self, days_offset: i32) -> Self {
        self.days_offset = days_offset;
        self
    }

    /// Enable or disable the ONA tier sweep.
    pub fn with_respect_ona(mut self, respect_ona: bool) -> Self {
        self.respect_ona = respect_ona;
        self
    }

    pub fn tiers(&self) -> &[i32] {
        &self.tiers
    }

    pub fn days_offset(&self) -> i32 {
        self.days_offset
    }

    /// Select the orders reachable on `rev`.
    ///
    /// # Arguments
    ///
    /// * `orders` - The full order feed
    /// * `cells` - Visibility cells for any number of revs
    /// * `rev` - The rev to select for
    pub fn select(&self, orders: &[Order], cells: &[VisibilityCell], rev: RevNumber) -> Selection {
        let rev_cells: Vec<&VisibilityCell> = cells
            .iter()
            .filter(|c| c.rev_num == rev && c.days_offset == self.days_offset)
            .collect();

        let index = GeometryIndex::new(orders.iter().map(|o| o.footprint.clone()));
        let candidates = touching(&index, rev_cells.iter().copied());
        debug!(
            rev,
            cells = rev_cells.len(),
            candidates = candidates.len(),
            "Orders touching rev"
        );

        let (selected, locked) = if self.respect_ona {
            self.tiers.iter().fold(
                (candidates.clone(), BTreeSet::new()),
                |(mut selected, mut locked), &tier| {
                    let removed: Vec<usize> = selected
                        .iter()
                        .copied()
                        .filter(|&i| orders[i].max_ona < tier + 1)
                        .collect();
                    for i in removed {
                        selected.remove(&i);
                        locked.insert(i);
                    }

                    let tier_cells = rev_cells.iter().copied().filter(|c| c.ona_tier == tier);
                    selected.extend(
                        touching(&index, tier_cells)
                            .into_iter()
                            .filter(|i| !locked.contains(i)),
                    );

                    debug!(
                        rev,
                        tier,
                        selected = selected.len(),
                        locked = locked.len(),
                        "ONA tier applied"
                    );
                    (selected, locked)
                },
            )
        } else {
            (candidates.clone(), BTreeSet::new())
        };

        let mut chosen: Vec<Order> = selected.into_iter().map(|i| orders[i].clone()).collect();
        chosen.sort_by(|a, b| a.id.cmp(&b.id));

        Selection {
            rev,
            orders: chosen,
            candidate_count: candidates.len(),
            locked_out: locked.into_iter().map(|i| orders[i].id.clone()).collect(),
        }
    }
}

/// Positions of indexed orders touching any of the cells.
fn touching<'a, I>(index: &GeometryIndex, cells: I) -> BTreeSet<usize>
where
    I: Iterator<Item = &'a VisibilityCell>,
{
    cells
        .flat_map(|c| index.intersecting(&to_multi(&c.geometry)))
        .collect()
}

/// Union footprint of a rev's current-pass cells.
pub fn rev_footprint(
    cells: &[VisibilityCell],
    rev: RevNumber,
    days_offset: i32,
) -> MultiPolygon<f64> {
    crate::geometry::union_all(
        cells
            .iter()
            .filter(|c| c.rev_num == rev && c.days_offset == days_offset)
            .map(|c| c.geometry.clone()),
    )
}

/// Sorted, de-duplicated rev numbers present in a visibility layer.
pub fn distinct_revs(cells: &[VisibilityCell]) -> BTreeSet<RevNumber> {
    cells.iter().map(|c| c.rev_num).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn cell(rev: RevNumber, tier: i32, days: i32, geometry: Polygon<f64>) -> VisibilityCell {
        VisibilityCell {
            rev_num: rev,
            ona_tier: tier,
            days_offset: days,
            geometry,
        }
    }

    fn order(id: &str, max_ona: i32, geometry: Polygon<f64>) -> Order {
        Order::new(id, 700, max_ona, geometry)
    }

    /// Five stacked tier bands for rev 1, tier 35 at the bottom.
    fn banded_cells() -> Vec<VisibilityCell> {
        DEFAULT_ONA_TIERS
            .iter()
            .enumerate()
            .map(|(i, &tier)| {
                let y = i as f64;
                cell(1, tier, 0, rect(0.0, y, 10.0, y + 1.0))
            })
            .collect()
    }

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_without_ona_selects_all_touching_orders() {
        let orders = vec![
            order("A", 10, rect(1.0, 0.2, 2.0, 0.8)),
            order("B", 45, rect(1.0, 3.2, 2.0, 3.8)),
            order("far", 45, rect(50.0, 50.0, 51.0, 51.0)),
        ];
        let selection = VisibilitySelector::new()
            .with_respect_ona(false)
            .select(&orders, &banded_cells(), 1);

        assert_eq!(ids(&selection), vec!["A", "B"]);
        assert_eq!(selection.candidate_count, 2);
        assert!(selection.locked_out.is_empty());
    }

    #[test]
    fn test_filters_by_rev_and_current_pass() {
        let cells = vec![
            cell(1, 35, 0, rect(0.0, 0.0, 1.0, 1.0)),
            cell(2, 35, 0, rect(5.0, 0.0, 6.0, 1.0)),
            cell(1, 35, 1, rect(10.0, 0.0, 11.0, 1.0)),
        ];
        let orders = vec![
            order("rev1", 45, rect(0.2, 0.2, 0.8, 0.8)),
            order("rev2", 45, rect(5.2, 0.2, 5.8, 0.8)),
            order("tomorrow", 45, rect(10.2, 0.2, 10.8, 0.8)),
        ];

        let selection = VisibilitySelector::new().select(&orders, &cells, 1);
        assert_eq!(ids(&selection), vec!["rev1"]);
    }

    #[test]
    fn test_wide_ona_orders_survive_every_tier() {
        let orders = vec![order("wide", 45, rect(1.0, 0.2, 2.0, 4.8))];
        let selection = VisibilitySelector::new().select(&orders, &banded_cells(), 1);

        assert_eq!(ids(&selection), vec!["wide"]);
        assert!(selection.locked_out.is_empty());
    }

    #[test]
    fn test_locked_out_order_never_readded_by_narrower_tiers() {
        // Touches the tier 20 and tier 15 bands, but max_ona 25 < 35 + 1.
        let orders = vec![
            order("narrow", 25, rect(1.0, 3.2, 2.0, 4.8)),
            order("wide", 40, rect(3.0, 3.2, 4.0, 4.8)),
        ];
        let selection = VisibilitySelector::new().select(&orders, &banded_cells(), 1);

        assert_eq!(ids(&selection), vec!["wide"]);
        assert!(selection.locked_out.contains(&OrderId::from("narrow")));
    }

    #[test]
    fn test_lockout_is_keyed_by_max_ona_per_tier() {
        let cells = vec![
            cell(1, 20, 0, rect(0.0, 0.0, 10.0, 1.0)),
            cell(1, 15, 0, rect(0.0, 1.0, 10.0, 2.0)),
        ];
        let orders = vec![
            // Survives both tiers: 25 >= 21 and 25 >= 16.
            order("A", 25, rect(1.0, 0.2, 2.0, 0.8)),
            // Removed at tier 20, then touches tier 15 only: stays out.
            order("B", 18, rect(3.0, 0.5, 4.0, 1.5)),
            // Removed at tier 20 too (20 < 21).
            order("C", 20, rect(5.0, 1.2, 6.0, 1.8)),
        ];

        let selection = VisibilitySelector::new()
            .with_tiers([20, 15])
            .select(&orders, &cells, 1);

        assert_eq!(ids(&selection), vec!["A"]);
        let locked: Vec<&str> = selection.locked_out.iter().map(OrderId::as_str).collect();
        assert_eq!(locked, vec!["B", "C"]);
    }

    #[test]
    fn test_tiers_are_swept_widest_first() {
        let selector = VisibilitySelector::new().with_tiers([15, 35, 25, 25]);
        assert_eq!(selector.tiers(), &[35, 25, 15]);
    }

    #[test]
    fn test_selection_independent_of_input_order() {
        let mut orders = vec![
            order("C", 45, rect(1.0, 0.2, 2.0, 0.8)),
            order("A", 45, rect(3.0, 1.2, 4.0, 1.8)),
            order("B", 30, rect(5.0, 2.2, 6.0, 2.8)),
        ];
        let cells = banded_cells();
        let forward = VisibilitySelector::new().select(&orders, &cells, 1);
        orders.reverse();
        let backward = VisibilitySelector::new().select(&orders, &cells, 1);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_unknown_rev_selects_nothing() {
        let orders = vec![order("A", 45, rect(1.0, 0.2, 2.0, 0.8))];
        let selection = VisibilitySelector::new().select(&orders, &banded_cells(), 99);
        assert!(selection.is_empty());
        assert_eq!(selection.candidate_count, 0);
    }

    #[test]
    fn test_distinct_revs() {
        let cells = vec![
            cell(3, 35, 0, rect(0.0, 0.0, 1.0, 1.0)),
            cell(1, 35, 0, rect(0.0, 0.0, 1.0, 1.0)),
            cell(3, 30, 1, rect(0.0, 0.0, 1.0, 1.0)),
        ];
        let revs: Vec<RevNumber> = distinct_revs(&cells).into_iter().collect();
        assert_eq!(revs, vec![1, 3]);
    }

    #[test]
    fn test_rev_footprint_unions_current_pass_cells() {
        use geo::Area;
        let footprint = rev_footprint(&banded_cells(), 1, CURRENT_PASS);
        assert!((footprint.unsigned_area() - 50.0).abs() < 1e-9);
    }
}
