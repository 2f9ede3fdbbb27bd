// src/services/food_cost.rs
//
// Purchase reconciliation per warehouse role and the food-cost percentage.
// The aggregate figures are computed from the same fetched document lists
// that form the audit trail, so the list always sums to the aggregate.

use chrono::{Days, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::common::AppError;
use crate::config::RestaurantConfig;
use crate::db::{BillRepository, DocumentRepository};
use crate::models::purchasing::{DocumentType, PurchaseDocument, WarehouseRole};
use crate::models::report::{FoodCostSummary, PurchaseDocumentEntry, WarehousePurchasesSummary};

/// Document lists feeding one reconciliation, one per flow.
#[derive(Debug, Clone, Default)]
pub struct DocumentFlows {
    pub standard_purchases: Vec<PurchaseDocument>,
    pub goods_receipts: Vec<PurchaseDocument>,
    pub corrected_purchases: Vec<PurchaseDocument>,
    pub inbound_transfers: Vec<PurchaseDocument>,
    pub outbound_transfers: Vec<PurchaseDocument>,
}

/// Folds the five document flows into the net-purchases summary.
///
/// Net purchases = FZ + standalone PZ + KFZ + inbound MMP - outbound MM.
/// The audit list carries outbound transfers with a negated value, so
/// summing `documents` reproduces `total_net` exactly, in any order.
pub fn reconcile_documents(
    from: NaiveDate,
    to: NaiveDate,
    role: WarehouseRole,
    warehouse_ids: Vec<i32>,
    flows: DocumentFlows,
) -> WarehousePurchasesSummary {
    let sum = |docs: &[PurchaseDocument]| -> Decimal {
        docs.iter().map(|d| d.net_value).sum()
    };

    let standard_purchases_net = sum(&flows.standard_purchases);
    let goods_receipts_net = sum(&flows.goods_receipts);
    let corrected_purchases_net = sum(&flows.corrected_purchases);
    let inbound_transfers_net = sum(&flows.inbound_transfers);
    let outbound_transfers_net = sum(&flows.outbound_transfers);

    let total_net = standard_purchases_net
        + goods_receipts_net
        + corrected_purchases_net
        + inbound_transfers_net
        - outbound_transfers_net;

    let mut documents: Vec<PurchaseDocumentEntry> = Vec::new();
    for doc in flows
        .standard_purchases
        .iter()
        .chain(&flows.goods_receipts)
        .chain(&flows.corrected_purchases)
        .chain(&flows.inbound_transfers)
        .chain(&flows.outbound_transfers)
    {
        let signed_value = if doc.doc_type == DocumentType::OutboundTransfer {
            -doc.net_value
        } else {
            doc.net_value
        };
        documents.push(PurchaseDocumentEntry {
            id: doc.id,
            doc_type: doc.doc_type,
            origin_document_id: doc.origin_document_id,
            external_reference: doc.external_reference.clone(),
            supplier_id: doc.supplier_id,
            counterparty_warehouse_id: doc.counterparty_warehouse_id,
            issue_date: doc.issue_date,
            full_number: doc.full_number.clone(),
            net_value: signed_value,
        });
    }
    documents.sort_by(|a, b| (a.issue_date, a.id).cmp(&(b.issue_date, b.id)));

    WarehousePurchasesSummary {
        from,
        to,
        role,
        warehouse_ids,
        standard_purchases_net,
        goods_receipts_net,
        corrected_purchases_net,
        inbound_transfers_net,
        outbound_transfers_net,
        total_net,
        documents,
    }
}

/// Food cost as a percentage of sales.
///
/// The ratio is rounded to four decimals half-up, scaled to percent and
/// rounded again to two decimals half-up, matching the accounting sheet the
/// figures are compared against. Zero sales give 0%, never an error.
pub fn food_cost_percent(purchases_net: Decimal, sales_net: Decimal) -> Decimal {
    if sales_net.is_zero() {
        return Decimal::ZERO;
    }
    let ratio = (purchases_net / sales_net)
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    (ratio * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone)]
pub struct FoodCostService {
    bill_repo: BillRepository,
    doc_repo: DocumentRepository,
    config: RestaurantConfig,
}

impl FoodCostService {
    pub fn new(
        bill_repo: BillRepository,
        doc_repo: DocumentRepository,
        config: RestaurantConfig,
    ) -> Self {
        Self {
            bill_repo,
            doc_repo,
            config,
        }
    }

    /// Net purchases of one warehouse role over [from, to], with the
    /// per-document audit trail.
    pub async fn warehouse_purchases(
        &self,
        role: WarehouseRole,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<WarehousePurchasesSummary, AppError> {
        let warehouse_ids = self.config.warehouses_for_role(role)?;
        let to_excl = next_day(to)?;

        let standard_purchases = self
            .doc_repo
            .list_standard_purchases(from, to_excl, &warehouse_ids)
            .await?;
        let goods_receipts = self
            .doc_repo
            .list_standalone_goods_receipts(from, to_excl, &warehouse_ids)
            .await?;
        let corrected_purchases = self
            .doc_repo
            .list_corrected_purchases(from, to_excl, &warehouse_ids)
            .await?;

        let mut inbound_transfers = Vec::new();
        for source in self.transfer_sources(role) {
            inbound_transfers.extend(
                self.doc_repo
                    .list_inbound_transfers(from, to_excl, &warehouse_ids, source)
                    .await?,
            );
        }

        let outbound_transfers = self
            .doc_repo
            .list_outbound_transfers(from, to_excl, &warehouse_ids)
            .await?;

        let summary = reconcile_documents(
            from,
            to,
            role,
            warehouse_ids,
            DocumentFlows {
                standard_purchases,
                goods_receipts,
                corrected_purchases,
                inbound_transfers,
                outbound_transfers,
            },
        );

        debug!(
            role = %role,
            %from,
            %to,
            total_net = %summary.total_net,
            documents = summary.documents.len(),
            "reconciled warehouse purchases"
        );

        Ok(summary)
    }

    /// Warehouses whose outbound MM transfers arrive as inbound MMP receipts
    /// for the given role. An unconfigured counterpart means no transfer
    /// flow for that role, not an error.
    fn transfer_sources(&self, role: WarehouseRole) -> Vec<i32> {
        match role {
            WarehouseRole::Kitchen => self.config.buffet_warehouses.first().copied().into_iter().collect(),
            WarehouseRole::Buffet => self.config.kitchen_warehouses.first().copied().into_iter().collect(),
            WarehouseRole::Costs => self
                .config
                .kitchen_warehouses
                .first()
                .into_iter()
                .chain(self.config.buffet_warehouses.first())
                .copied()
                .collect(),
        }
    }

    /// Net sales the role's purchases are compared against.
    pub async fn sales_for_role(
        &self,
        role: WarehouseRole,
        from: NaiveDate,
        to: NaiveDate,
        seller_ids: &[i32],
    ) -> Result<Decimal, AppError> {
        if !role.has_sales() {
            return Ok(Decimal::ZERO);
        }

        let from_dt = from.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let to_dt = next_day(to)?.and_hms_opt(0, 0, 0).expect("midnight is valid");

        match role {
            WarehouseRole::Kitchen => {
                if self.config.kitchen_products.is_empty() {
                    return Err(AppError::Configuration(
                        "no kitchen products configured (RESTAURANT_KITCHEN_PRODUCTS)".into(),
                    ));
                }
                self.bill_repo
                    .sum_product_sales(from_dt, to_dt, &self.config.kitchen_products, seller_ids)
                    .await
            }
            WarehouseRole::Buffet => self.residual_buffet_sales(from_dt, to_dt, seller_ids).await,
            WarehouseRole::Costs => Ok(Decimal::ZERO),
        }
    }

    /// Buffet sales are the residual of the total, never a configured list:
    /// total - kitchen - packaging - delivery.
    async fn residual_buffet_sales(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        seller_ids: &[i32],
    ) -> Result<Decimal, AppError> {
        let total = self.bill_repo.sum_total_sales(from, to, seller_ids).await?;
        let kitchen = self
            .bill_repo
            .sum_product_sales(from, to, &self.config.kitchen_products, seller_ids)
            .await?;
        let packaging = self
            .bill_repo
            .sum_product_sales(from, to, &self.config.packaging_products, seller_ids)
            .await?;
        let delivery = self
            .bill_repo
            .sum_product_sales(from, to, &self.config.delivery_products, seller_ids)
            .await?;

        Ok(total - kitchen - packaging - delivery)
    }

    /// Full food-cost summary for one role: reconciled purchases, matching
    /// sales and the resulting percentage.
    pub async fn calculate_food_cost(
        &self,
        role: WarehouseRole,
        from: NaiveDate,
        to: NaiveDate,
        seller_ids: &[i32],
    ) -> Result<FoodCostSummary, AppError> {
        let purchases = self.warehouse_purchases(role, from, to).await?;
        let sales_net = self.sales_for_role(role, from, to, seller_ids).await?;
        let percent = if role.has_sales() {
            food_cost_percent(purchases.total_net, sales_net)
        } else {
            Decimal::ZERO
        };

        Ok(FoodCostSummary {
            from,
            to,
            role,
            seller_ids: seller_ids.to_vec(),
            sales_net,
            purchases,
            food_cost_percent: percent,
            has_sales: role.has_sales(),
        })
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, AppError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::InvalidInput(format!("date out of range: {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn doc(id: i64, doc_type: DocumentType, net: Decimal) -> PurchaseDocument {
        PurchaseDocument {
            id,
            doc_type,
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            warehouse_id: 1,
            counterparty_warehouse_id: None,
            net_value: net,
            origin_document_id: None,
            external_reference: None,
            supplier_id: None,
            full_number: None,
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[test]
    fn reconciliation_sums_flows_and_subtracts_outbound() {
        let (from, to) = range();
        let flows = DocumentFlows {
            standard_purchases: vec![doc(1, DocumentType::StandardPurchase, dec!(100))],
            goods_receipts: vec![doc(2, DocumentType::GoodsReceipt, dec!(40))],
            corrected_purchases: vec![doc(3, DocumentType::CorrectedPurchase, dec!(-15))],
            inbound_transfers: vec![doc(4, DocumentType::InboundTransfer, dec!(25))],
            outbound_transfers: vec![doc(5, DocumentType::OutboundTransfer, dec!(30))],
        };

        let summary = reconcile_documents(from, to, WarehouseRole::Kitchen, vec![1], flows);

        assert_eq!(summary.standard_purchases_net, dec!(100));
        assert_eq!(summary.goods_receipts_net, dec!(40));
        assert_eq!(summary.corrected_purchases_net, dec!(-15));
        assert_eq!(summary.inbound_transfers_net, dec!(25));
        assert_eq!(summary.outbound_transfers_net, dec!(30));
        assert_eq!(summary.total_net, dec!(120));
    }

    #[test]
    fn audit_list_sums_to_the_aggregate() {
        let (from, to) = range();
        let flows = DocumentFlows {
            standard_purchases: vec![
                doc(1, DocumentType::StandardPurchase, dec!(100)),
                doc(2, DocumentType::StandardPurchase, dec!(55.55)),
            ],
            goods_receipts: vec![doc(3, DocumentType::GoodsReceipt, dec!(40.10))],
            corrected_purchases: vec![doc(4, DocumentType::CorrectedPurchase, dec!(-15.25))],
            inbound_transfers: vec![doc(5, DocumentType::InboundTransfer, dec!(25))],
            outbound_transfers: vec![
                doc(6, DocumentType::OutboundTransfer, dec!(30)),
                doc(7, DocumentType::OutboundTransfer, dec!(12.40)),
            ],
        };

        let summary = reconcile_documents(from, to, WarehouseRole::Buffet, vec![2], flows);
        let list_sum: Decimal = summary.documents.iter().map(|d| d.net_value).sum();

        assert_eq!(list_sum, summary.total_net);
        // outbound entries appear negated in the audit trail
        let outbound = summary
            .documents
            .iter()
            .find(|d| d.id == 6)
            .unwrap();
        assert_eq!(outbound.net_value, dec!(-30));
    }

    #[test]
    fn empty_flows_reconcile_to_zero() {
        let (from, to) = range();
        let summary = reconcile_documents(
            from,
            to,
            WarehouseRole::Costs,
            vec![3],
            DocumentFlows::default(),
        );
        assert_eq!(summary.total_net, Decimal::ZERO);
        assert!(summary.documents.is_empty());
    }

    #[test]
    fn percent_rounds_half_up_at_both_steps() {
        // 1/3 = 0.33333... -> 0.3333 -> 33.33
        assert_eq!(food_cost_percent(dec!(1), dec!(3)), dec!(33.33));
        // 2/3 = 0.66666... -> 0.6667 -> 66.67
        assert_eq!(food_cost_percent(dec!(2), dec!(3)), dec!(66.67));
        // exact midpoint at the fourth decimal rounds away from zero
        assert_eq!(food_cost_percent(dec!(0.00005), dec!(1)), dec!(0.01));
    }

    #[test]
    fn zero_sales_give_zero_percent() {
        assert_eq!(food_cost_percent(dec!(500), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn negative_purchases_give_negative_percent() {
        assert_eq!(food_cost_percent(dec!(-50), dec!(200)), dec!(-25.00));
    }
}
