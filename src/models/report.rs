// src/models/report.rs
//
// Derived report value objects. All of them are pure functions of the query
// inputs and the read-only source rows; none are persisted or mutated.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::models::purchasing::{DocumentType, WarehouseRole};

/// The sales category a sold line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesCategory {
    Kitchen,
    Buffet,
    Packaging,
    Delivery,
    /// Product not present in any configured list; kept visible rather than
    /// failing the whole report.
    Undefined,
}

impl fmt::Display for SalesCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SalesCategory::Kitchen => "kitchen",
            SalesCategory::Buffet => "buffet",
            SalesCategory::Packaging => "packaging",
            SalesCategory::Delivery => "delivery",
            SalesCategory::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

/// One calendar day's sales split into the four categories.
/// Buffet is the residual: `total - kitchen - packaging - delivery`, so the
/// four categories always sum to `total`.
#[derive(Debug, Clone, Serialize)]
pub struct DailyCategorySplit {
    pub date: NaiveDate,
    pub kitchen: Decimal,
    pub buffet: Decimal,
    pub packaging: Decimal,
    pub delivery: Decimal,
    pub total: Decimal,
}

/// Category totals for a whole period.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotals {
    pub kitchen: Decimal,
    pub buffet: Decimal,
    pub packaging: Decimal,
    pub delivery: Decimal,
    pub total: Decimal,
}

/// One categorized line item, with its bundle-normalized net value.
#[derive(Debug, Clone, Serialize)]
pub struct SalesItemDetail {
    pub bill_id: i64,
    pub seller_id: Option<i32>,
    pub seller_name: Option<String>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub group_id: Option<i32>,
    pub quantity: Decimal,
    pub net_value: Decimal,
    pub category: SalesCategory,
}

/// One purchase document as it appears in the reconciliation audit trail.
/// Outbound transfers carry a negated `net_value` here, so the list always
/// sums to the aggregate net-purchases figure.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDocumentEntry {
    pub id: i64,
    pub doc_type: DocumentType,
    pub origin_document_id: Option<i64>,
    pub external_reference: Option<String>,
    pub supplier_id: Option<i32>,
    /// Other side of a transfer; None for purchase documents.
    pub counterparty_warehouse_id: Option<i32>,
    pub issue_date: NaiveDate,
    pub full_number: Option<String>,
    pub net_value: Decimal,
}

/// Net purchases of one warehouse role over a date range, broken down by
/// document flow, with the per-document audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct WarehousePurchasesSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub role: WarehouseRole,
    pub warehouse_ids: Vec<i32>,
    pub standard_purchases_net: Decimal,
    pub goods_receipts_net: Decimal,
    pub corrected_purchases_net: Decimal,
    pub inbound_transfers_net: Decimal,
    pub outbound_transfers_net: Decimal,
    pub total_net: Decimal,
    pub documents: Vec<PurchaseDocumentEntry>,
}

/// Purchases vs. categorized sales for one warehouse role.
/// `food_cost_percent` is 0 when `has_sales` is false (costs warehouse) or
/// when sales are exactly zero - never an error.
#[derive(Debug, Clone, Serialize)]
pub struct FoodCostSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub role: WarehouseRole,
    pub seller_ids: Vec<i32>,
    pub sales_net: Decimal,
    pub purchases: WarehousePurchasesSummary,
    pub food_cost_percent: Decimal,
    pub has_sales: bool,
}

/// One calendar day of the gross/net margin report.
#[derive(Debug, Clone, Serialize)]
pub struct DailyGrossMargin {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub kitchen_sales: Decimal,
    pub buffet_sales: Decimal,
    pub packaging_sales: Decimal,
    pub delivery_sales: Decimal,
    pub kitchen_cost: Decimal,
    pub buffet_cost: Decimal,
    pub total_food_cost: Decimal,
    /// Allocated share of overhead costs; 0 on days without any sale.
    pub overhead_cost: Decimal,
    pub gross_margin: Decimal,
    pub net_margin: Decimal,
    pub is_profit: bool,
}

/// Month-level rollup of the daily margin report. Days with zero total
/// sales are excluded from counts, totals and averages.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyMarginSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub point_of_sale: String,
    pub seller_ids: Vec<i32>,
    pub kitchen_food_cost_percent: Decimal,
    pub buffet_food_cost_percent: Decimal,
    pub daily_margins: Vec<DailyGrossMargin>,
    pub profit_days: u32,
    pub loss_days: u32,
    pub total_sales: Decimal,
    pub total_food_cost: Decimal,
    pub total_overhead: Decimal,
    pub total_gross_margin: Decimal,
    pub total_net_margin: Decimal,
    pub average_daily_net_margin: Decimal,
    pub best_day: Option<DailyGrossMargin>,
    pub worst_day: Option<DailyGrossMargin>,
}

/// Severity of a flagged bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Suspicious,
    VerySuspicious,
    DateError,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Suspicious => "PODEJRZANY",
            Severity::VerySuspicious => "BARDZO PODEJRZANY",
            Severity::DateError => "BŁĄD DATY",
        };
        f.write_str(s)
    }
}

/// A bill flagged by the anomaly heuristic.
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousBill {
    pub bill_id: i64,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub amount: Decimal,
    pub seller_id: Option<i32>,
    pub seller_name: Option<String>,
    pub reason: String,
    pub severity: Severity,
}

/// Aggregate stats over a list of flagged bills.
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousBillStats {
    pub total_count: u32,
    pub very_suspicious_count: u32,
    pub total_amount: Decimal,
    pub high_amount_count: u32,
    pub short_duration_count: u32,
}

/// Full sales report for a period: per-day category splits, period totals
/// and the suspicious-bill section.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub seller_ids: Vec<i32>,
    pub totals: CategoryTotals,
    pub daily_sales: Vec<DailyCategorySplit>,
    pub suspicious_bills: Vec<SuspiciousBill>,
    pub suspicious_stats: SuspiciousBillStats,
}
