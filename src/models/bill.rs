// src/models/bill.rs

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

/// One closed bill from the POS (`RACHUNKI` table), fully materialized with
/// its line items. Historical, read-only; the engine never mutates it.
#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub id: i64,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub net_total: Decimal,
    pub gross_total: Decimal,
    pub guest_count: i32,
    pub seller_id: Option<i32>,
    pub seller_name: Option<String>,
    pub items: Vec<LineItem>,
}

impl Bill {
    /// How long the bill stayed open.
    pub fn duration(&self) -> Duration {
        self.ended_at - self.started_at
    }

    pub fn duration_formatted(&self) -> String {
        let minutes = self.duration().num_minutes();
        if minutes < 60 {
            format!("{minutes} min")
        } else {
            format!("{}h {}min", minutes / 60, minutes % 60)
        }
    }
}

/// A sold line on a bill (`POZRACH`).
///
/// `correction_no` = 0 marks an original line; > 0 marks a corrected child
/// produced when a bundled "set" product is exploded into components. Parent
/// and children share `position_no` within the same bill, and the parent's
/// quantity is the authoritative one for value recomputation.
#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub id: i64,
    pub bill_id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub group_id: Option<i32>,
    pub quantity: Decimal,
    pub net_value: Decimal,
    pub correction_no: i32,
    pub position_no: i32,
}
