// src/models/purchasing.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Purchase/stock document types the reconciliation cares about, keyed by
/// the POS document codes (`DOKUMENTY.TYP_DOK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentType {
    /// FZ - purchase invoice
    StandardPurchase,
    /// PZ - goods receipt (only standalone ones count, see reconciliation)
    GoodsReceipt,
    /// KFZ - correction to a purchase invoice
    CorrectedPurchase,
    /// MMP - inter-warehouse transfer, receiving side
    InboundTransfer,
    /// MM - inter-warehouse transfer, issuing side
    OutboundTransfer,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::StandardPurchase => "FZ",
            DocumentType::GoodsReceipt => "PZ",
            DocumentType::CorrectedPurchase => "KFZ",
            DocumentType::InboundTransfer => "MMP",
            DocumentType::OutboundTransfer => "MM",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of `DOKUMENTY`, read-only. `warehouse_id` is the owning warehouse
/// (`ID_MA`); for transfers `counterparty_warehouse_id` (`ID_MA_2`) is the
/// other side of the movement.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDocument {
    pub id: i64,
    pub doc_type: DocumentType,
    pub issue_date: NaiveDate,
    pub warehouse_id: i32,
    pub counterparty_warehouse_id: Option<i32>,
    pub net_value: Decimal,
    /// Origin document id (`ID_POCHOD`), e.g. the PZ an FZ was created from.
    pub origin_document_id: Option<i64>,
    /// Supplier's own document number (`NR_ORYGIN`).
    pub external_reference: Option<String>,
    /// Supplier/contractor id (`ID_FI`).
    pub supplier_id: Option<i32>,
    /// Full internal document number (`CALY_NR`).
    pub full_number: Option<String>,
}

/// Role a warehouse plays in the reporting model. Routes purchase-document
/// queries and decides whether a food-cost percentage makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarehouseRole {
    Kitchen,
    Buffet,
    /// Overhead-costs warehouse: purchases only, no associated sales.
    Costs,
}

impl WarehouseRole {
    pub fn name(&self) -> &'static str {
        match self {
            WarehouseRole::Kitchen => "Kuchnia",
            WarehouseRole::Buffet => "Bufet",
            WarehouseRole::Costs => "Koszty",
        }
    }

    /// Whether this role has sales to compare purchases against.
    pub fn has_sales(&self) -> bool {
        !matches!(self, WarehouseRole::Costs)
    }
}

impl fmt::Display for WarehouseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
