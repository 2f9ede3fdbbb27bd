// src/services/categorization.rs
//
// Category resolution and bundle/correction normalization. Both are pure;
// every place that sums a line item's contribution must go through
// `normalized_net_value` - applying it inconsistently is the single largest
// source of reporting drift.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::config::RestaurantConfig;
use crate::models::bill::{Bill, LineItem};
use crate::models::report::{SalesCategory, SalesItemDetail};

/// Configured id sets the resolver works against.
#[derive(Debug, Clone, Default)]
pub struct CategoryConfig {
    pub kitchen_products: HashSet<i64>,
    pub buffet_products: HashSet<i64>,
    pub buffet_groups: HashSet<i32>,
    pub packaging_products: HashSet<i64>,
    pub delivery_products: HashSet<i64>,
}

impl CategoryConfig {
    pub fn from_config(config: &RestaurantConfig) -> Self {
        Self {
            kitchen_products: config.kitchen_products.iter().copied().collect(),
            buffet_products: config.buffet_products.iter().copied().collect(),
            buffet_groups: config.buffet_groups.iter().copied().collect(),
            packaging_products: config.packaging_products.iter().copied().collect(),
            delivery_products: config.delivery_products.iter().copied().collect(),
        }
    }
}

/// Assigns a sold product to a sales category.
///
/// The order is a contract, not an accident: packaging and delivery take
/// precedence over kitchen/buffet membership of the same product id, so a
/// product id reused across configured lists is never counted twice. A
/// product that matches nothing (or is unresolvable) ends up `Undefined`.
pub fn resolve_category(
    product_id: Option<i64>,
    group_id: Option<i32>,
    config: &CategoryConfig,
) -> SalesCategory {
    let Some(product_id) = product_id else {
        return SalesCategory::Undefined;
    };

    if config.packaging_products.contains(&product_id) {
        SalesCategory::Packaging
    } else if config.delivery_products.contains(&product_id) {
        SalesCategory::Delivery
    } else if config.kitchen_products.contains(&product_id) {
        SalesCategory::Kitchen
    } else if config.buffet_products.contains(&product_id) {
        SalesCategory::Buffet
    } else if group_id.is_some_and(|g| config.buffet_groups.contains(&g)) {
        SalesCategory::Buffet
    } else {
        SalesCategory::Undefined
    }
}

/// The net contribution of a line item to any sales sum.
///
/// A corrected child line (correction_no > 0) produced by exploding a "set"
/// product does not contribute its stored net value: the authoritative
/// quantity is the parent line's (same bill, same position_no,
/// correction_no = 0), so the contribution is
/// `child unit net value * parent quantity`. Without a parent, or with a
/// zero child quantity that makes the unit value undefined, the stored net
/// value stands. Original lines contribute their stored net value as-is.
pub fn normalized_net_value(item: &LineItem, siblings: &[LineItem]) -> Decimal {
    if item.correction_no == 0 {
        return item.net_value;
    }

    let parent = siblings.iter().find(|p| {
        p.id != item.id && p.position_no == item.position_no && p.correction_no == 0
    });

    match parent {
        Some(parent) if !item.quantity.is_zero() => {
            (item.net_value / item.quantity) * parent.quantity
        }
        _ => item.net_value,
    }
}

/// Categorizes every line of a bill, normalizing corrected lines.
pub fn categorize_bill_items(bill: &Bill, config: &CategoryConfig) -> Vec<SalesItemDetail> {
    bill.items
        .iter()
        .map(|item| SalesItemDetail {
            bill_id: bill.id,
            seller_id: bill.seller_id,
            seller_name: bill.seller_name.clone(),
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            group_id: item.group_id,
            quantity: item.quantity,
            net_value: normalized_net_value(item, &bill.items),
            category: resolve_category(item.product_id, item.group_id, config),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn config() -> CategoryConfig {
        CategoryConfig {
            kitchen_products: [10, 11].into_iter().collect(),
            buffet_products: [20].into_iter().collect(),
            buffet_groups: [7].into_iter().collect(),
            packaging_products: [30, 10].into_iter().collect(),
            delivery_products: [40, 11].into_iter().collect(),
        }
    }

    fn line(id: i64, position_no: i32, correction_no: i32, qty: Decimal, net: Decimal) -> LineItem {
        LineItem {
            id,
            bill_id: 1,
            product_id: Some(10),
            product_name: None,
            group_id: None,
            quantity: qty,
            net_value: net,
            correction_no,
            position_no,
        }
    }

    #[test]
    fn packaging_and_delivery_override_kitchen_membership() {
        let cfg = config();
        // product 10 is in both packaging and kitchen lists
        assert_eq!(resolve_category(Some(10), None, &cfg), SalesCategory::Packaging);
        // product 11 is in both delivery and kitchen lists
        assert_eq!(resolve_category(Some(11), None, &cfg), SalesCategory::Delivery);
    }

    #[test]
    fn resolves_kitchen_buffet_and_group_membership() {
        let cfg = config();
        assert_eq!(resolve_category(Some(20), None, &cfg), SalesCategory::Buffet);
        assert_eq!(resolve_category(Some(99), Some(7), &cfg), SalesCategory::Buffet);
        assert_eq!(resolve_category(Some(99), Some(8), &cfg), SalesCategory::Undefined);
        assert_eq!(resolve_category(None, Some(7), &cfg), SalesCategory::Undefined);
    }

    #[test]
    fn corrected_line_uses_parent_quantity() {
        let parent = line(1, 3, 0, dec!(4), dec!(100));
        // child stored quantity 2 is irrelevant; unit value 6 * parent qty 4
        let child = line(2, 3, 1, dec!(2), dec!(12));
        let siblings = vec![parent, child.clone()];

        assert_eq!(normalized_net_value(&child, &siblings), dec!(24));
    }

    #[test]
    fn corrected_value_is_independent_of_child_quantity() {
        let parent = line(1, 3, 0, dec!(5), dec!(100));
        for (qty, net) in [(dec!(1), dec!(6)), (dec!(2), dec!(12)), (dec!(4), dec!(24))] {
            let child = line(2, 3, 1, qty, net);
            let siblings = vec![parent.clone(), child.clone()];
            // unit value is 6 in every case, times parent qty 5
            assert_eq!(normalized_net_value(&child, &siblings), dec!(30));
        }
    }

    #[test]
    fn corrected_line_without_parent_falls_back_to_own_value() {
        let child = line(2, 3, 1, dec!(2), dec!(12));
        let other_position = line(1, 4, 0, dec!(9), dec!(90));
        let siblings = vec![other_position, child.clone()];

        assert_eq!(normalized_net_value(&child, &siblings), dec!(12));
    }

    #[test]
    fn original_line_keeps_stored_value() {
        let item = line(1, 3, 0, dec!(2), dec!(50));
        let child = line(2, 3, 1, dec!(1), dec!(5));
        let siblings = vec![item.clone(), child];

        assert_eq!(normalized_net_value(&item, &siblings), dec!(50));
    }

    #[test]
    fn zero_quantity_child_keeps_stored_value() {
        let parent = line(1, 3, 0, dec!(4), dec!(100));
        let child = line(2, 3, 1, dec!(0), dec!(12));
        let siblings = vec![parent, child.clone()];

        assert_eq!(normalized_net_value(&child, &siblings), dec!(12));
    }

    #[test]
    fn categorize_bill_items_normalizes_and_resolves() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut parent = line(1, 1, 0, dec!(3), dec!(60));
        parent.product_id = Some(20);
        let mut child = line(2, 1, 1, dec!(1), dec!(7));
        child.product_id = Some(10);

        let bill = Bill {
            id: 1,
            started_at: start,
            ended_at: start,
            net_total: dec!(81),
            gross_total: dec!(87),
            guest_count: 2,
            seller_id: Some(5),
            seller_name: Some("Anna".into()),
            items: vec![parent, child],
        };

        let details = categorize_bill_items(&bill, &config());
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].category, SalesCategory::Buffet);
        assert_eq!(details[0].net_value, dec!(60));
        assert_eq!(details[1].category, SalesCategory::Packaging);
        // unit 7 * parent qty 3
        assert_eq!(details[1].net_value, dec!(21));
    }
}
