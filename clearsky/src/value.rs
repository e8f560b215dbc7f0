//! Clear-sky value assignment.
//!
//! Maps an order's tasking priority to its clear-sky (CSI) value:
//!
//! ```text
//! value = floor((100 - (priority - 700)) ^ 1.5)
//! ```
//!
//! Priority 700 is worth 1000; the value falls to 0 at priority 800. Above 800
//! the base goes negative and the power is undefined. Below [`MIN_PRIORITY`]
//! the value no longer fits a `u32`. Both are rejected with
//! [`CsiError::Domain`].

use tracing::warn;

use crate::error::{CsiError, CsiResult};
use crate::model::{Order, OrderId, ValuedOrder};

/// Priority that maps to the maximum value.
pub const BASE_PRIORITY: i32 = 700;

/// Highest priority with a defined value.
pub const MAX_PRIORITY: i32 = 800;

/// Lowest priority whose value fits a `u32` (headroom 2_642_245).
pub const MIN_PRIORITY: i32 = MAX_PRIORITY - 2_642_245;

/// An order that could not be valued.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedOrder {
    pub id: OrderId,
    pub reason: String,
}

/// Orders tagged with values plus the ones rejected along the way.
#[derive(Debug, Clone, Default)]
pub struct Valuation {
    pub valued: Vec<ValuedOrder>,
    pub skipped: Vec<SkippedOrder>,
}

/// Stateless priority → value mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueAssigner;

impl ValueAssigner {
    /// Clear-sky value for a priority.
    ///
    /// Truncates toward zero, matching integer attribute storage:
    /// `value(750) == 353` (50^1.5 = 353.55).
    pub fn value(priority: i32) -> CsiResult<u32> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(CsiError::Domain {
                priority,
                min: MIN_PRIORITY,
                max: MAX_PRIORITY,
            });
        }

        // x^1.5 as x·√x stays exact for perfect squares (100 → 1000).
        let headroom = 100.0 - (f64::from(priority) - f64::from(BASE_PRIORITY));
        Ok((headroom * headroom.sqrt()).floor() as u32)
    }

    /// Tag one order with its value.
    pub fn assign(order: Order) -> CsiResult<ValuedOrder> {
        let value = Self::value(order.priority)?;
        Ok(ValuedOrder { order, value })
    }

    /// Tag every order, skipping (and reporting) the ones out of domain.
    pub fn assign_all<I>(orders: I) -> Valuation
    where
        I: IntoIterator<Item = Order>,
    {
        orders
            .into_iter()
            .fold(Valuation::default(), |mut valuation, order| {
                let id = order.id.clone();
                match Self::assign(order) {
                    Ok(valued) => valuation.valued.push(valued),
                    Err(e) => {
                        warn!(order = %id, error = %e, "Skipping order with undefined value");
                        valuation.skipped.push(SkippedOrder {
                            id,
                            reason: e.to_string(),
                        });
                    }
                }
                valuation
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn order(id: &str, priority: i32) -> Order {
        Order::new(
            id,
            priority,
            30,
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)],
        )
    }

    #[test]
    fn test_base_priority_is_worth_1000() {
        assert_eq!(ValueAssigner::value(700).unwrap(), 1000);
    }

    #[test]
    fn test_value_truncates() {
        assert_eq!(ValueAssigner::value(750).unwrap(), 353);
        assert_eq!(ValueAssigner::value(720).unwrap(), 715);
        assert_eq!(ValueAssigner::value(740).unwrap(), 464);
    }

    #[test]
    fn test_max_priority_is_worth_zero() {
        assert_eq!(ValueAssigner::value(800).unwrap(), 0);
    }

    #[test]
    fn test_priority_above_800_is_domain_error() {
        let err = ValueAssigner::value(801).unwrap_err();
        assert!(matches!(
            err,
            CsiError::Domain {
                priority: 801,
                max: 800,
                ..
            }
        ));
    }

    #[test]
    fn test_lowest_priority_fits_u32() {
        let value = ValueAssigner::value(MIN_PRIORITY).unwrap();
        assert!(value > u32::MAX - 10_000);
    }

    #[test]
    fn test_priority_below_min_is_domain_error() {
        let err = ValueAssigner::value(MIN_PRIORITY - 1).unwrap_err();
        assert!(matches!(err, CsiError::Domain { min: MIN_PRIORITY, .. }));
        assert!(ValueAssigner::value(i32::MIN).is_err());
    }

    #[test]
    fn test_priority_below_base_exceeds_1000() {
        // 110^1.5 = 1153.7
        assert_eq!(ValueAssigner::value(690).unwrap(), 1153);
    }

    #[test]
    fn test_assign_all_skips_out_of_domain() {
        let valuation = ValueAssigner::assign_all(vec![
            order("A", 700),
            order("B", 850),
            order("C", 750),
        ]);

        assert_eq!(valuation.valued.len(), 2);
        assert_eq!(valuation.valued[0].value, 1000);
        assert_eq!(valuation.valued[1].value, 353);
        assert_eq!(valuation.skipped.len(), 1);
        assert_eq!(valuation.skipped[0].id, OrderId::from("B"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_value_monotonic_in_priority(p in 600i32..800) {
                let lower = ValueAssigner::value(p)?;
                let higher = ValueAssigner::value(p + 1)?;
                prop_assert!(lower >= higher);
            }

            #[test]
            fn test_out_of_domain_always_errors(p in 801i32..10_000) {
                prop_assert!(ValueAssigner::value(p).is_err());
            }

            #[test]
            fn test_far_below_base_never_saturates(p in i32::MIN..MIN_PRIORITY) {
                prop_assert!(ValueAssigner::value(p).is_err());
            }
        }
    }
}
