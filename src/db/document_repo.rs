// src/db/document_repo.rs
//
// Read-only queries over the purchase/stock documents table (dokumenty).
// Each method fetches exactly one document flow; the reconciliation sums
// and signs the flows itself, so the audit list and the aggregate can never
// disagree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::common::AppError;
use crate::models::purchasing::{DocumentType, PurchaseDocument};

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// FZ purchase invoices received into the given warehouses, issue date
    /// in [from, to).
    pub async fn list_standard_purchases(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        warehouse_ids: &[i32],
    ) -> Result<Vec<PurchaseDocument>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT d.id_dok, d.data_wst, d.id_ma, d.id_ma_2, d.wart_nu, \
                    d.id_pochod, d.nr_orygin, d.id_fi, d.caly_nr \
             FROM dokumenty d \
             WHERE d.typ_dok = 'FZ' \
               AND d.id_ma = ANY($1) \
               AND d.data_wst >= $2 AND d.data_wst < $3 \
             ORDER BY d.data_wst, d.id_dok",
        )
        .bind(warehouse_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_documents(rows, DocumentType::StandardPurchase))
    }

    /// PZ goods receipts with no FZ invoice created from them. A PZ already
    /// converted into an FZ (the FZ's id_pochod points back at it) would be
    /// double-counted, so only standalone ones qualify.
    pub async fn list_standalone_goods_receipts(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        warehouse_ids: &[i32],
    ) -> Result<Vec<PurchaseDocument>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT d.id_dok, d.data_wst, d.id_ma, d.id_ma_2, d.wart_nu, \
                    d.id_pochod, d.nr_orygin, d.id_fi, d.caly_nr \
             FROM dokumenty d \
             WHERE d.typ_dok = 'PZ' \
               AND d.id_ma = ANY($1) \
               AND d.data_wst >= $2 AND d.data_wst < $3 \
               AND NOT EXISTS (SELECT 1 FROM dokumenty fz \
                               WHERE fz.typ_dok = 'FZ' \
                                 AND fz.id_pochod = d.id_dok) \
             ORDER BY d.data_wst, d.id_dok",
        )
        .bind(warehouse_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_documents(rows, DocumentType::GoodsReceipt))
    }

    /// KFZ purchase corrections (usually negative values).
    pub async fn list_corrected_purchases(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        warehouse_ids: &[i32],
    ) -> Result<Vec<PurchaseDocument>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT d.id_dok, d.data_wst, d.id_ma, d.id_ma_2, d.wart_nu, \
                    d.id_pochod, d.nr_orygin, d.id_fi, d.caly_nr \
             FROM dokumenty d \
             WHERE d.typ_dok = 'KFZ' \
               AND d.id_ma = ANY($1) \
               AND d.data_wst >= $2 AND d.data_wst < $3 \
             ORDER BY d.data_wst, d.id_dok",
        )
        .bind(warehouse_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_documents(rows, DocumentType::CorrectedPurchase))
    }

    /// MMP receipts into the target warehouses coming from a specific source
    /// warehouse.
    pub async fn list_inbound_transfers(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        target_warehouse_ids: &[i32],
        source_warehouse_id: i32,
    ) -> Result<Vec<PurchaseDocument>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT d.id_dok, d.data_wst, d.id_ma, d.id_ma_2, d.wart_nu, \
                    d.id_pochod, d.nr_orygin, d.id_fi, d.caly_nr \
             FROM dokumenty d \
             WHERE d.typ_dok = 'MMP' \
               AND d.id_ma = ANY($1) \
               AND d.id_ma_2 = $2 \
               AND d.data_wst >= $3 AND d.data_wst < $4 \
             ORDER BY d.data_wst, d.id_dok",
        )
        .bind(target_warehouse_ids)
        .bind(source_warehouse_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_documents(rows, DocumentType::InboundTransfer))
    }

    /// MM issues out of the source warehouses, to any destination.
    pub async fn list_outbound_transfers(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        source_warehouse_ids: &[i32],
    ) -> Result<Vec<PurchaseDocument>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT d.id_dok, d.data_wst, d.id_ma, d.id_ma_2, d.wart_nu, \
                    d.id_pochod, d.nr_orygin, d.id_fi, d.caly_nr \
             FROM dokumenty d \
             WHERE d.typ_dok = 'MM' \
               AND d.id_ma = ANY($1) \
               AND d.data_wst >= $2 AND d.data_wst < $3 \
             ORDER BY d.data_wst, d.id_dok",
        )
        .bind(source_warehouse_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_documents(rows, DocumentType::OutboundTransfer))
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id_dok: i64,
    data_wst: NaiveDate,
    id_ma: i32,
    id_ma_2: Option<i32>,
    wart_nu: Decimal,
    id_pochod: Option<i64>,
    nr_orygin: Option<String>,
    id_fi: Option<i32>,
    caly_nr: Option<String>,
}

fn into_documents(rows: Vec<DocumentRow>, doc_type: DocumentType) -> Vec<PurchaseDocument> {
    rows.into_iter()
        .map(|row| PurchaseDocument {
            id: row.id_dok,
            doc_type,
            issue_date: row.data_wst,
            warehouse_id: row.id_ma,
            counterparty_warehouse_id: row.id_ma_2.filter(|id| *id != 0),
            net_value: row.wart_nu,
            // the POS writes 0 instead of NULL for "no origin"
            origin_document_id: row.id_pochod.filter(|id| *id != 0),
            external_reference: row.nr_orygin,
            supplier_id: row.id_fi,
            full_number: row.caly_nr,
        })
        .collect()
}
