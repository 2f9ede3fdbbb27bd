// src/services/sales_analysis.rs
//
// Per-day categorized sales and the period sales report. Aggregate figures
// come from bundle-aware SQL sums; item-level detail is materialized and
// normalized in memory through the categorization core.

use chrono::{Days, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::info;

use crate::common::AppError;
use crate::config::RestaurantConfig;
use crate::db::BillRepository;
use crate::models::report::{
    CategoryTotals, DailyCategorySplit, RestaurantReport, SalesItemDetail,
};
use crate::services::categorization::{categorize_bill_items, CategoryConfig};
use crate::services::validation::BillValidationService;

#[derive(Clone)]
pub struct SalesAnalysisService {
    bill_repo: BillRepository,
    validation: BillValidationService,
    config: RestaurantConfig,
}

impl SalesAnalysisService {
    pub fn new(
        bill_repo: BillRepository,
        validation: BillValidationService,
        config: RestaurantConfig,
    ) -> Self {
        Self {
            bill_repo,
            validation,
            config,
        }
    }

    /// One day's sales split into the four categories. Buffet is the
    /// residual, so the categories always sum to the day's total.
    pub async fn daily_category_split(
        &self,
        date: NaiveDate,
        seller_ids: &[i32],
    ) -> Result<DailyCategorySplit, AppError> {
        let from = start_of_day(date);
        let to = start_of_day(next_day(date)?);

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

        Ok(DailyCategorySplit {
            date,
            kitchen,
            buffet: total - kitchen - packaging - delivery,
            packaging,
            delivery,
            total,
        })
    }

    /// Full report for [from, to] inclusive: daily splits, period totals and
    /// the suspicious-bill section. Totals are summed from the daily splits,
    /// so the report is internally consistent by construction.
    pub async fn generate_sales_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        seller_ids: &[i32],
    ) -> Result<RestaurantReport, AppError> {
        if to < from {
            return Err(AppError::InvalidInput(format!(
                "report range end {to} before start {from}"
            )));
        }

        let mut daily_sales = Vec::new();
        let mut date = from;
        while date <= to {
            daily_sales.push(self.daily_category_split(date, seller_ids).await?);
            date = next_day(date)?;
        }

        let totals = sum_daily_splits(&daily_sales);

        let suspicious_bills = self
            .validation
            .find_suspicious_bills(start_of_day(from), start_of_day(next_day(to)?))
            .await?;
        let suspicious_stats = self.validation.stats(&suspicious_bills);

        info!(
            %from,
            %to,
            total = %totals.total,
            flagged = suspicious_bills.len(),
            "sales report generated"
        );

        Ok(RestaurantReport {
            from,
            to,
            seller_ids: seller_ids.to_vec(),
            totals,
            daily_sales,
            suspicious_bills,
            suspicious_stats,
        })
    }

    /// Every categorized line item sold on one day, bundle-normalized. The
    /// drill-down behind a daily split figure.
    pub async fn daily_sales_details(
        &self,
        date: NaiveDate,
        seller_ids: &[i32],
    ) -> Result<Vec<SalesItemDetail>, AppError> {
        let from = start_of_day(date);
        let to = start_of_day(next_day(date)?);

        let bills = self.bill_repo.find_bills_in_range(from, to).await?;
        let category_config = CategoryConfig::from_config(&self.config);

        let details = bills
            .iter()
            .filter(|bill| bill.seller_id.is_some_and(|id| seller_ids.contains(&id)))
            .flat_map(|bill| categorize_bill_items(bill, &category_config))
            .collect();

        Ok(details)
    }
}

fn sum_daily_splits(days: &[DailyCategorySplit]) -> CategoryTotals {
    let mut totals = CategoryTotals {
        kitchen: Decimal::ZERO,
        buffet: Decimal::ZERO,
        packaging: Decimal::ZERO,
        delivery: Decimal::ZERO,
        total: Decimal::ZERO,
    };
    for day in days {
        totals.kitchen += day.kitchen;
        totals.buffet += day.buffet;
        totals.packaging += day.packaging;
        totals.delivery += day.delivery;
        totals.total += day.total;
    }
    totals
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is valid")
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, AppError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::InvalidInput(format!("date out of range: {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn split(date: NaiveDate, kitchen: Decimal, buffet: Decimal) -> DailyCategorySplit {
        DailyCategorySplit {
            date,
            kitchen,
            buffet,
            packaging: dec!(5),
            delivery: dec!(10),
            total: kitchen + buffet + dec!(15),
        }
    }

    #[test]
    fn daily_splits_sum_into_consistent_totals() {
        let d1 = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let days = vec![split(d1, dec!(100), dec!(200)), split(d2, dec!(50), dec!(75))];

        let totals = sum_daily_splits(&days);
        assert_eq!(totals.kitchen, dec!(150));
        assert_eq!(totals.buffet, dec!(275));
        assert_eq!(totals.packaging, dec!(10));
        assert_eq!(totals.delivery, dec!(20));
        assert_eq!(totals.total, dec!(455));
        assert_eq!(
            totals.total,
            totals.kitchen + totals.buffet + totals.packaging + totals.delivery
        );
    }

    #[test]
    fn empty_period_sums_to_zero() {
        let totals = sum_daily_splits(&[]);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.buffet, Decimal::ZERO);
    }
}
