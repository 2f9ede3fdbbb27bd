// src/services/margin.rs
//
// Daily gross/net margin for one point of sale over a month, and the
// combined view across points. The month's food-cost percentages are
// computed once and applied to every day; recomputing them per day would
// let rounding drift between the daily lines and the month figure.

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::common::AppError;
use crate::models::point_of_sale::PointOfSale;
use crate::models::purchasing::WarehouseRole;
use crate::models::report::{DailyCategorySplit, DailyGrossMargin, MonthlyMarginSummary};
use crate::services::cost_allocation::{AllocationStrategy, CostAllocationService};
use crate::services::food_cost::FoodCostService;
use crate::services::sales_analysis::SalesAnalysisService;

/// The margin report always spreads overhead by sales share; the other
/// allocation strategies serve the explicit cost-split view, not this
/// report.
const OVERHEAD_STRATEGY: AllocationStrategy = AllocationStrategy::ProportionalToSales;

#[derive(Clone)]
pub struct MarginService {
    sales: SalesAnalysisService,
    food_cost: FoodCostService,
    allocation: CostAllocationService,
}

impl MarginService {
    pub fn new(
        sales: SalesAnalysisService,
        food_cost: FoodCostService,
        allocation: CostAllocationService,
    ) -> Self {
        Self {
            sales,
            food_cost,
            allocation,
        }
    }

    /// The month's margin report for one point of sale.
    ///
    /// `food_cost_seller_ids` drives the food-cost percentages and is
    /// normally the full seller list: purchases are booked restaurant-wide,
    /// so the percentage only makes sense against restaurant-wide sales.
    pub async fn calculate_daily_gross_margin(
        &self,
        year: i32,
        month: u32,
        point: &PointOfSale,
        food_cost_seller_ids: &[i32],
    ) -> Result<MonthlyMarginSummary, AppError> {
        let (from, to) = month_range(year, month)?;

        let kitchen = self
            .food_cost
            .calculate_food_cost(WarehouseRole::Kitchen, from, to, food_cost_seller_ids)
            .await?;
        let buffet = self
            .food_cost
            .calculate_food_cost(WarehouseRole::Buffet, from, to, food_cost_seller_ids)
            .await?;
        let kitchen_fraction = percent_to_fraction(kitchen.food_cost_percent);
        let buffet_fraction = percent_to_fraction(buffet.food_cost_percent);

        let daily_overhead = self
            .allocation
            .daily_point_overhead(year, month, point, OVERHEAD_STRATEGY)
            .await?;

        let mut daily_margins = Vec::new();
        let mut date = from;
        while date <= to {
            let split = self
                .sales
                .daily_category_split(date, &point.seller_ids)
                .await?;
            let overhead = if split.total.is_zero() {
                Decimal::ZERO
            } else {
                daily_overhead
            };
            daily_margins.push(daily_margin_from_split(
                &split,
                kitchen_fraction,
                buffet_fraction,
                overhead,
            ));
            date = date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| AppError::InvalidInput(format!("date out of range: {date}")))?;
        }

        let summary = rollup(
            from,
            to,
            point.name.clone(),
            point.seller_ids.clone(),
            kitchen.food_cost_percent,
            buffet.food_cost_percent,
            daily_margins,
        );

        info!(
            point = %summary.point_of_sale,
            %from,
            %to,
            net_margin = %summary.total_net_margin,
            profit_days = summary.profit_days,
            loss_days = summary.loss_days,
            "monthly margin calculated"
        );

        Ok(summary)
    }

    /// Adds two per-point summaries for the same period into a whole-house
    /// view. Days are summed position by position; the food-cost
    /// percentages are re-derived from the combined costs and sales.
    pub fn combine_summaries(
        &self,
        a: &MonthlyMarginSummary,
        b: &MonthlyMarginSummary,
    ) -> Result<MonthlyMarginSummary, AppError> {
        combine(a, b)
    }
}

/// One day's margin line from the categorized sales split.
///
/// Packaging and delivery carry no food cost (pure-margin items); kitchen
/// and buffet are costed at the month's percentage, rounded to cents per
/// day.
pub fn daily_margin_from_split(
    split: &DailyCategorySplit,
    kitchen_fraction: Decimal,
    buffet_fraction: Decimal,
    overhead_cost: Decimal,
) -> DailyGrossMargin {
    let kitchen_cost = round_money(split.kitchen * kitchen_fraction);
    let buffet_cost = round_money(split.buffet * buffet_fraction);
    let total_food_cost = kitchen_cost + buffet_cost;
    let gross_margin = split.total - total_food_cost;
    let net_margin = gross_margin - overhead_cost;

    DailyGrossMargin {
        date: split.date,
        total_sales: split.total,
        kitchen_sales: split.kitchen,
        buffet_sales: split.buffet,
        packaging_sales: split.packaging,
        delivery_sales: split.delivery,
        kitchen_cost,
        buffet_cost,
        total_food_cost,
        overhead_cost,
        gross_margin,
        net_margin,
        is_profit: net_margin > Decimal::ZERO,
    }
}

/// Month rollup over the daily lines. Days without any sale stay in the
/// list for calendar continuity but are excluded from the counts, the
/// average and the best/worst picks.
fn rollup(
    from: NaiveDate,
    to: NaiveDate,
    point_of_sale: String,
    seller_ids: Vec<i32>,
    kitchen_food_cost_percent: Decimal,
    buffet_food_cost_percent: Decimal,
    daily_margins: Vec<DailyGrossMargin>,
) -> MonthlyMarginSummary {
    let active: Vec<&DailyGrossMargin> = daily_margins
        .iter()
        .filter(|d| !d.total_sales.is_zero())
        .collect();

    let profit_days = active.iter().filter(|d| d.is_profit).count() as u32;
    let loss_days = active.len() as u32 - profit_days;

    let total_sales: Decimal = active.iter().map(|d| d.total_sales).sum();
    let total_food_cost: Decimal = active.iter().map(|d| d.total_food_cost).sum();
    let total_overhead: Decimal = active.iter().map(|d| d.overhead_cost).sum();
    let total_gross_margin: Decimal = active.iter().map(|d| d.gross_margin).sum();
    let total_net_margin: Decimal = active.iter().map(|d| d.net_margin).sum();

    let average_daily_net_margin = if active.is_empty() {
        Decimal::ZERO
    } else {
        round_money(total_net_margin / Decimal::from(active.len() as i64))
    };

    let best_day = active
        .iter()
        .max_by_key(|d| d.net_margin)
        .map(|d| (*d).clone());
    let worst_day = active
        .iter()
        .min_by_key(|d| d.net_margin)
        .map(|d| (*d).clone());

    MonthlyMarginSummary {
        from,
        to,
        point_of_sale,
        seller_ids,
        kitchen_food_cost_percent,
        buffet_food_cost_percent,
        daily_margins,
        profit_days,
        loss_days,
        total_sales,
        total_food_cost,
        total_overhead,
        total_gross_margin,
        total_net_margin,
        average_daily_net_margin,
        best_day,
        worst_day,
    }
}

fn combine(
    a: &MonthlyMarginSummary,
    b: &MonthlyMarginSummary,
) -> Result<MonthlyMarginSummary, AppError> {
    if a.from != b.from || a.to != b.to {
        return Err(AppError::InvalidInput(format!(
            "cannot combine summaries over different periods: {}..{} vs {}..{}",
            a.from, a.to, b.from, b.to
        )));
    }
    if a.daily_margins.len() != b.daily_margins.len() {
        return Err(AppError::InvalidInput(
            "cannot combine summaries with different day counts".into(),
        ));
    }

    let daily_margins: Vec<DailyGrossMargin> = a
        .daily_margins
        .iter()
        .zip(&b.daily_margins)
        .map(|(x, y)| {
            let gross_margin = x.gross_margin + y.gross_margin;
            let net_margin = x.net_margin + y.net_margin;
            DailyGrossMargin {
                date: x.date,
                total_sales: x.total_sales + y.total_sales,
                kitchen_sales: x.kitchen_sales + y.kitchen_sales,
                buffet_sales: x.buffet_sales + y.buffet_sales,
                packaging_sales: x.packaging_sales + y.packaging_sales,
                delivery_sales: x.delivery_sales + y.delivery_sales,
                kitchen_cost: x.kitchen_cost + y.kitchen_cost,
                buffet_cost: x.buffet_cost + y.buffet_cost,
                total_food_cost: x.total_food_cost + y.total_food_cost,
                overhead_cost: x.overhead_cost + y.overhead_cost,
                gross_margin,
                net_margin,
                is_profit: net_margin > Decimal::ZERO,
            }
        })
        .collect();

    let kitchen_sales: Decimal = daily_margins.iter().map(|d| d.kitchen_sales).sum();
    let kitchen_cost: Decimal = daily_margins.iter().map(|d| d.kitchen_cost).sum();
    let buffet_sales: Decimal = daily_margins.iter().map(|d| d.buffet_sales).sum();
    let buffet_cost: Decimal = daily_margins.iter().map(|d| d.buffet_cost).sum();

    let mut seller_ids = a.seller_ids.clone();
    seller_ids.extend(&b.seller_ids);

    Ok(rollup(
        a.from,
        a.to,
        format!("{} + {}", a.point_of_sale, b.point_of_sale),
        seller_ids,
        derived_percent(kitchen_cost, kitchen_sales),
        derived_percent(buffet_cost, buffet_sales),
        daily_margins,
    ))
}

/// Effective percentage implied by summed costs and sales; 0 on zero sales.
fn derived_percent(cost: Decimal, sales: Decimal) -> Decimal {
    if sales.is_zero() {
        return Decimal::ZERO;
    }
    round_money(cost / sales * Decimal::ONE_HUNDRED)
}

/// A food-cost percentage as the fraction applied to sales.
fn percent_to_fraction(percent: Decimal) -> Decimal {
    (percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidInput(format!("invalid month {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidInput(format!("invalid month {year}-{month:02}")))?;
    let last = next_first
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| AppError::InvalidInput(format!("invalid month {year}-{month:02}")))?;
    Ok((first, last))
}
