// src/services/cost_allocation.rs
//
// Splits the overhead (costs-warehouse purchases) across points of sale.
// The year-to-date average daily overhead is expensive to compute and
// stable within a run, so it is memoized per year.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::common::AppError;
use crate::db::BillRepository;
use crate::config::RestaurantConfig;
use crate::models::point_of_sale::PointOfSale;
use crate::models::purchasing::WarehouseRole;
use crate::services::food_cost::FoodCostService;
use crate::services::point_of_sale::PointOfSaleRegistry;

/// How a point's share of the overhead is determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationStrategy {
    /// Share of net sales in the allocation month.
    ProportionalToSales,
    /// Share of posted weekly opening hours.
    ProportionalToHours,
    /// Weighted blend of the two shares.
    Hybrid {
        sales_weight: Decimal,
        hours_weight: Decimal,
    },
}

impl AllocationStrategy {
    /// Weights must sum to exactly 1; anything else silently over- or
    /// under-allocates the overhead.
    pub fn hybrid(sales_weight: Decimal, hours_weight: Decimal) -> Result<Self, AppError> {
        if sales_weight + hours_weight != Decimal::ONE {
            return Err(AppError::Configuration(format!(
                "hybrid allocation weights must sum to 1, got {sales_weight} + {hours_weight}"
            )));
        }
        Ok(Self::Hybrid {
            sales_weight,
            hours_weight,
        })
    }
}

/// The point's share of the whole, in [0, 1], rounded to four decimals
/// half-up. A zero denominator gives a zero share.
pub fn allocation_share(
    strategy: AllocationStrategy,
    point_sales: Decimal,
    total_sales: Decimal,
    point_hours: i64,
    total_hours: i64,
) -> Decimal {
    let sales_share = ratio(point_sales, total_sales);
    let hours_share = ratio(Decimal::from(point_hours), Decimal::from(total_hours));

    match strategy {
        AllocationStrategy::ProportionalToSales => sales_share,
        AllocationStrategy::ProportionalToHours => hours_share,
        AllocationStrategy::Hybrid {
            sales_weight,
            hours_weight,
        } => (sales_weight * sales_share + hours_weight * hours_share)
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero),
    }
}

fn ratio(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole).round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Overhead charged to a point for a whole month, rounded to cents.
pub fn monthly_overhead(average_daily: Decimal, days_in_month: u32, share: Decimal) -> Decimal {
    round_money(average_daily * Decimal::from(days_in_month) * share)
}

/// The month's overhead spread over the days that actually traded, rounded
/// to cents. No trading days, no overhead.
pub fn spread_over_sale_days(monthly: Decimal, days_with_sales: i64) -> Decimal {
    if days_with_sales == 0 {
        return Decimal::ZERO;
    }
    round_money(monthly / Decimal::from(days_with_sales))
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone)]
pub struct CostAllocationService {
    bill_repo: BillRepository,
    food_cost: FoodCostService,
    registry: PointOfSaleRegistry,
    config: RestaurantConfig,
    // year -> average daily overhead
    overhead_cache: Arc<Mutex<HashMap<i32, Decimal>>>,
}

impl CostAllocationService {
    pub fn new(
        bill_repo: BillRepository,
        food_cost: FoodCostService,
        registry: PointOfSaleRegistry,
        config: RestaurantConfig,
    ) -> Self {
        Self {
            bill_repo,
            food_cost,
            registry,
            config,
            overhead_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The configured default strategy.
    pub fn default_strategy(&self) -> Result<AllocationStrategy, AppError> {
        AllocationStrategy::hybrid(
            self.config.allocation_sales_weight,
            self.config.allocation_hours_weight,
        )
    }

    /// Average overhead per calendar day, year to date: costs-warehouse net
    /// purchases from January 1st through the last sale date of the year,
    /// divided by the calendar days elapsed. A year with no sales has no
    /// overhead to spread and yields zero.
    pub async fn average_daily_overhead(&self, year: i32) -> Result<Decimal, AppError> {
        if let Some(cached) = self.overhead_cache.lock().expect("cache lock").get(&year) {
            return Ok(*cached);
        }

        let average = match self.bill_repo.last_sales_date_in_year(year).await? {
            None => Decimal::ZERO,
            Some(last_sale) => {
                let jan_first =
                    NaiveDate::from_ymd_opt(year, 1, 1).expect("january 1st is valid");
                let purchases = self
                    .food_cost
                    .warehouse_purchases(WarehouseRole::Costs, jan_first, last_sale)
                    .await?;
                let calendar_days = Decimal::from(last_sale.ordinal());
                purchases.total_net / calendar_days
            }
        };

        debug!(year, average = %average, "average daily overhead computed");
        self.overhead_cache
            .lock()
            .expect("cache lock")
            .insert(year, average);
        Ok(average)
    }

    /// Overhead charged to one point for a whole month:
    /// average daily overhead x days in the month x the point's share.
    pub async fn monthly_point_overhead(
        &self,
        year: i32,
        month: u32,
        point: &PointOfSale,
        strategy: AllocationStrategy,
    ) -> Result<Decimal, AppError> {
        let average_daily = self.average_daily_overhead(year).await?;
        let days = days_in_month(year, month)?;
        let share = self.point_share(year, month, point, strategy).await?;
        Ok(monthly_overhead(average_daily, days, share))
    }

    /// The month's overhead spread over the point's days that actually had
    /// sales. A month without a single sale carries no daily overhead.
    pub async fn daily_point_overhead(
        &self,
        year: i32,
        month: u32,
        point: &PointOfSale,
        strategy: AllocationStrategy,
    ) -> Result<Decimal, AppError> {
        let monthly = self
            .monthly_point_overhead(year, month, point, strategy)
            .await?;
        let (from, to_excl) = month_bounds(year, month)?;
        let days_with_sales = self
            .bill_repo
            .count_days_with_sales(
                from.and_hms_opt(0, 0, 0).expect("midnight is valid"),
                to_excl.and_hms_opt(0, 0, 0).expect("midnight is valid"),
                &point.seller_ids,
            )
            .await?;

        Ok(spread_over_sale_days(monthly, days_with_sales))
    }

    async fn point_share(
        &self,
        year: i32,
        month: u32,
        point: &PointOfSale,
        strategy: AllocationStrategy,
    ) -> Result<Decimal, AppError> {
        let (from, to_excl) = month_bounds(year, month)?;
        let from_dt = from.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let to_dt = to_excl.and_hms_opt(0, 0, 0).expect("midnight is valid");

        let point_sales = self
            .bill_repo
            .sum_total_sales(from_dt, to_dt, &point.seller_ids)
            .await?;
        let total_sales = self
            .bill_repo
            .sum_total_sales(from_dt, to_dt, &self.config.all_sellers)
            .await?;

        Ok(allocation_share(
            strategy,
            point_sales,
            total_sales,
            point.working_hours.weekly_hours(),
            self.registry.total_weekly_hours(),
        ))
    }
}

fn days_in_month(year: i32, month: u32) -> Result<u32, AppError> {
    let (first, next_first) = month_bounds(year, month)?;
    Ok((next_first - first).num_days() as u32)
}

/// First day of the month and first day of the following month.
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidInput(format!("invalid month {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidInput(format!("invalid month {year}-{month:02}")))?;
    Ok((first, next_first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hybrid_weights_must_sum_to_one() {
        assert!(AllocationStrategy::hybrid(dec!(0.5), dec!(0.5)).is_ok());
        assert!(AllocationStrategy::hybrid(dec!(0.7), dec!(0.3)).is_ok());

        let err = AllocationStrategy::hybrid(dec!(0.6), dec!(0.5)).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn sales_share_ignores_hours() {
        let share = allocation_share(
            AllocationStrategy::ProportionalToSales,
            dec!(250),
            dec!(1000),
            0,
            0,
        );
        assert_eq!(share, dec!(0.25));
    }

    #[test]
    fn hours_share_ignores_sales() {
        let share = allocation_share(
            AllocationStrategy::ProportionalToHours,
            Decimal::ZERO,
            Decimal::ZERO,
            38,
            101,
        );
        // 38/101 = 0.37623... -> 0.3762
        assert_eq!(share, dec!(0.3762));
    }

    #[test]
    fn hybrid_blends_both_shares() {
        let strategy = AllocationStrategy::hybrid(dec!(0.5), dec!(0.5)).unwrap();
        // sales share 0.25, hours share 0.5 -> 0.375
        let share = allocation_share(strategy, dec!(250), dec!(1000), 50, 100);
        assert_eq!(share, dec!(0.375));
    }

    #[test]
    fn zero_denominators_give_zero_share() {
        let share = allocation_share(
            AllocationStrategy::ProportionalToSales,
            dec!(250),
            Decimal::ZERO,
            0,
            0,
        );
        assert_eq!(share, Decimal::ZERO);

        let strategy = AllocationStrategy::hybrid(dec!(0.5), dec!(0.5)).unwrap();
        assert_eq!(
            allocation_share(strategy, Decimal::ZERO, Decimal::ZERO, 0, 0),
            Decimal::ZERO
        );
    }

    #[test]
    fn share_rounds_to_four_decimals_half_up() {
        // 1/3 -> 0.3333, 2/3 -> 0.6667
        assert_eq!(
            allocation_share(AllocationStrategy::ProportionalToSales, dec!(1), dec!(3), 0, 0),
            dec!(0.3333)
        );
        assert_eq!(
            allocation_share(AllocationStrategy::ProportionalToSales, dec!(2), dec!(3), 0, 0),
            dec!(0.6667)
        );
    }

    #[test]
    fn monthly_overhead_rounds_to_cents_half_up() {
        // 123.4567 * 30 * 0.3333 = 1234.4535... -> 1234.45
        assert_eq!(
            monthly_overhead(dec!(123.4567), 30, dec!(0.3333)),
            dec!(1234.45)
        );
        // midpoint at the third decimal rounds away from zero
        assert_eq!(monthly_overhead(dec!(0.005), 1, dec!(1)), dec!(0.01));
    }

    #[test]
    fn daily_spread_rounds_to_cents_and_handles_idle_months() {
        // 1000 / 22 = 45.4545... -> 45.45
        assert_eq!(spread_over_sale_days(dec!(1000), 22), dec!(45.45));
        // 100 / 3 = 33.3333... -> 33.33
        assert_eq!(spread_over_sale_days(dec!(100), 3), dec!(33.33));
        assert_eq!(spread_over_sale_days(dec!(1000), 0), Decimal::ZERO);
    }

    #[test]
    fn month_lengths_are_calendar_correct() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2024, 12).unwrap(), 31);
        assert!(days_in_month(2024, 13).is_err());
    }
}
