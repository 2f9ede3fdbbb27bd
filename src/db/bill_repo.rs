// src/db/bill_repo.rs
//
// Read-only queries over the POS bill tables (rachunki / pozrach / towary /
// uzytkownicy). Rows are mapped into fully-materialized value objects here,
// at the boundary; the services never see partially-loaded entities.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::common::AppError;
use crate::models::bill::{Bill, LineItem};

/// Single SQL definition of the bundle-normalized net value of a sold line,
/// used by every aggregate query. Mirrors
/// `categorization::normalized_net_value`, which is the single definition
/// for lines already materialized in memory.
const NORMALIZED_NET_VALUE: &str = "\
    CASE WHEN p.nr_korekty > 0 AND par.ilosc IS NOT NULL AND p.ilosc <> 0 \
         THEN (p.wart_nu / p.ilosc) * par.ilosc \
         ELSE p.wart_nu END";

/// Join locating the parent (original) line of a corrected one: same bill,
/// same position, correction number zero.
const PARENT_LINE_JOIN: &str = "\
    LEFT JOIN pozrach par \
           ON par.id_rach = p.id_rach \
          AND par.lp = p.lp \
          AND par.nr_korekty = 0 \
          AND par.id_pozrach <> p.id_pozrach";

#[derive(Clone)]
pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Net sales total over [from, to) for the given sellers, from the bill
    /// headers.
    pub async fn sum_total_sales(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        seller_ids: &[i32],
    ) -> Result<Decimal, AppError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(r.wart_nu), 0) \
             FROM rachunki r \
             WHERE r.data_roz >= $1 AND r.data_roz < $2 \
               AND r.id_uz = ANY($3)",
        )
        .bind(from)
        .bind(to)
        .bind(seller_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Bundle-aware net sales of the given products over [from, to).
    pub async fn sum_product_sales(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        product_ids: &[i64],
        seller_ids: &[i32],
    ) -> Result<Decimal, AppError> {
        if product_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let sql = format!(
            "SELECT COALESCE(SUM({NORMALIZED_NET_VALUE}), 0) \
             FROM pozrach p \
             JOIN rachunki r ON r.id_rach = p.id_rach \
             {PARENT_LINE_JOIN} \
             WHERE r.data_roz >= $1 AND r.data_roz < $2 \
               AND r.id_uz = ANY($3) \
               AND p.id_tw = ANY($4)"
        );

        let total: Decimal = sqlx::query_scalar(&sql)
            .bind(from)
            .bind(to)
            .bind(seller_ids)
            .bind(product_ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// Number of distinct calendar days with at least one bill in [from, to)
    /// for the given sellers.
    pub async fn count_days_with_sales(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        seller_ids: &[i32],
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT CAST(r.data_roz AS DATE)) \
             FROM rachunki r \
             WHERE r.data_roz >= $1 AND r.data_roz < $2 \
               AND r.id_uz = ANY($3)",
        )
        .bind(from)
        .bind(to)
        .bind(seller_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// The most recent date with any recorded sale in the given year, across
    /// all sellers. `None` when the year has no sales at all.
    pub async fn last_sales_date_in_year(&self, year: i32) -> Result<Option<NaiveDate>, AppError> {
        let date: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(CAST(r.data_roz AS DATE)) \
             FROM rachunki r \
             WHERE EXTRACT(YEAR FROM r.data_roz) = $1",
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(date)
    }

    /// All bills started in [from, to), materialized with their line items
    /// and seller names.
    pub async fn find_bills_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Bill>, AppError> {
        let rows: Vec<BillWithItemRow> = sqlx::query_as(
            "SELECT r.id_rach, r.data_roz, r.data_zak, r.wart_nu, r.wart_bu, r.il_osob, \
                    r.id_uz, u.nazwa_uz, \
                    p.id_pozrach, p.id_tw, t.nazwa_tw, t.id_gr, \
                    p.ilosc, p.wart_nu AS poz_wart_nu, p.nr_korekty, p.lp \
             FROM rachunki r \
             LEFT JOIN uzytkownicy u ON u.id_uz = r.id_uz \
             LEFT JOIN pozrach p ON p.id_rach = r.id_rach \
             LEFT JOIN towary t ON t.id_tw = p.id_tw \
             WHERE r.data_roz >= $1 AND r.data_roz < $2 \
             ORDER BY r.id_rach, p.lp, p.nr_korekty",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_bills(rows))
    }
}

#[derive(FromRow)]
struct BillWithItemRow {
    id_rach: i64,
    data_roz: NaiveDateTime,
    data_zak: NaiveDateTime,
    wart_nu: Decimal,
    wart_bu: Decimal,
    il_osob: Option<i32>,
    id_uz: Option<i32>,
    nazwa_uz: Option<String>,
    // line-item columns are NULL for bills without positions (LEFT JOIN)
    id_pozrach: Option<i64>,
    id_tw: Option<i64>,
    nazwa_tw: Option<String>,
    id_gr: Option<i32>,
    ilosc: Option<Decimal>,
    poz_wart_nu: Option<Decimal>,
    nr_korekty: Option<i32>,
    lp: Option<i32>,
}

/// Groups the joined rows (ordered by bill id) into bills with their items.
fn assemble_bills(rows: Vec<BillWithItemRow>) -> Vec<Bill> {
    let mut bills: Vec<Bill> = Vec::new();

    for row in rows {
        if bills.last().map(|b| b.id) != Some(row.id_rach) {
            bills.push(Bill {
                id: row.id_rach,
                started_at: row.data_roz,
                ended_at: row.data_zak,
                net_total: row.wart_nu,
                gross_total: row.wart_bu,
                guest_count: row.il_osob.unwrap_or(0),
                seller_id: row.id_uz,
                seller_name: row.nazwa_uz.clone(),
                items: Vec::new(),
            });
        }

        if let Some(item_id) = row.id_pozrach {
            let bill = bills.last_mut().expect("bill pushed above");
            bill.items.push(LineItem {
                id: item_id,
                bill_id: row.id_rach,
                product_id: row.id_tw,
                product_name: row.nazwa_tw,
                group_id: row.id_gr,
                quantity: row.ilosc.unwrap_or_default(),
                net_value: row.poz_wart_nu.unwrap_or_default(),
                correction_no: row.nr_korekty.unwrap_or(0),
                position_no: row.lp.unwrap_or(0),
            });
        }
    }

    bills
}
