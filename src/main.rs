// src/main.rs

mod common;
mod config;
mod db;
mod models;
mod services;

use anyhow::Context;
use chrono::{Datelike, Local};
use tracing::{info, warn};

use crate::config::AppState;
use crate::db::{BillRepository, DocumentRepository};
use crate::models::purchasing::WarehouseRole;
use crate::models::report::SalesCategory;
use crate::services::cost_allocation::CostAllocationService;
use crate::services::food_cost::FoodCostService;
use crate::services::margin::MarginService;
use crate::services::point_of_sale::PointOfSaleRegistry;
use crate::services::sales_analysis::SalesAnalysisService;
use crate::services::validation::BillValidationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soga_analytics=info".into()),
        )
        .init();

    let (year, month) = report_month()?;
    info!(year, month, "running monthly report");

    let state = AppState::new().await?;
    let config = state.config.clone();

    let bill_repo = BillRepository::new(state.db_pool.clone());
    let doc_repo = DocumentRepository::new(state.db_pool.clone());

    let validation = BillValidationService::new(bill_repo.clone(), config.clone());
    let sales = SalesAnalysisService::new(bill_repo.clone(), validation, config.clone());
    let food_cost = FoodCostService::new(bill_repo.clone(), doc_repo, config.clone());
    let registry = PointOfSaleRegistry::from_config(&config);
    let allocation = CostAllocationService::new(
        bill_repo.clone(),
        food_cost.clone(),
        registry.clone(),
        config.clone(),
    );
    let margin = MarginService::new(sales.clone(), food_cost.clone(), allocation.clone());

    // food cost per warehouse role, restaurant-wide
    let (from, to) = month_span(year, month)?;
    for role in [WarehouseRole::Kitchen, WarehouseRole::Buffet, WarehouseRole::Costs] {
        let summary = food_cost
            .calculate_food_cost(role, from, to, &config.all_sellers)
            .await?;
        info!(
            role = %role,
            purchases = %summary.purchases.total_net,
            sales = %summary.sales_net,
            food_cost_percent = %summary.food_cost_percent,
            documents = summary.purchases.documents.len(),
            "food cost"
        );
    }

    // overhead split between the points under the configured strategy
    let split_strategy = allocation.default_strategy()?;
    for point in registry.points() {
        let monthly = allocation
            .monthly_point_overhead(year, month, point, split_strategy)
            .await?;
        info!(point = %point.name, overhead = %monthly, "monthly overhead split");
    }

    // margin per point of sale, then combined
    let mut summaries = Vec::new();
    for point in registry.points() {
        let summary = margin
            .calculate_daily_gross_margin(year, month, point, &config.all_sellers)
            .await?;
        summaries.push(summary);
    }
    let combined = summaries
        .iter()
        .skip(1)
        .try_fold(summaries[0].clone(), |acc, next| {
            margin.combine_summaries(&acc, next)
        })?;

    // period sales report with the suspicious-bill section
    let report_sellers = if config.default_sellers.is_empty() {
        &config.all_sellers
    } else {
        &config.default_sellers
    };
    let report = sales
        .generate_sales_report(from, to, report_sellers)
        .await?;
    if report.suspicious_stats.total_count > 0 {
        warn!(
            flagged = report.suspicious_stats.total_count,
            very_suspicious = report.suspicious_stats.very_suspicious_count,
            amount = %report.suspicious_stats.total_amount,
            "suspicious bills in period"
        );
    }

    // item-level drill-down for the combined best day
    if let Some(best) = &combined.best_day {
        let details = sales.daily_sales_details(best.date, &config.all_sellers).await?;
        let undefined = details
            .iter()
            .filter(|d| d.category == SalesCategory::Undefined)
            .count();
        info!(
            date = %best.date,
            items = details.len(),
            undefined,
            "best day line items"
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&combined).context("serializing combined summary")?
    );

    Ok(())
}

/// Report month from argv (`soga-analytics [year month]`), defaulting to the
/// current calendar month.
fn report_month() -> anyhow::Result<(i32, u32)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {
            let today = Local::now().date_naive();
            Ok((today.year(), today.month()))
        }
        [year, month] => Ok((
            year.parse().context("invalid year argument")?,
            month.parse().context("invalid month argument")?,
        )),
        _ => anyhow::bail!("usage: soga-analytics [year month]"),
    }
}

fn month_span(year: i32, month: u32) -> anyhow::Result<(chrono::NaiveDate, chrono::NaiveDate)> {
    let first = chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {year}-{month:02}"))?;
    let next_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .with_context(|| format!("invalid month {year}-{month:02}"))?;
    Ok((first, next_first - chrono::Days::new(1)))
}
