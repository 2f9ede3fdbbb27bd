// src/config.rs

use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{collections::HashSet, env, str::FromStr, time::Duration};

use crate::common::AppError;

/// Shared application state: the read-only POS pool plus the restaurant
/// configuration loaded from the environment.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: RestaurantConfig,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("connected to the POS database");

        Ok(Self {
            db_pool,
            config: RestaurantConfig::from_env()?,
        })
    }
}

/// Product/group/warehouse/seller id lists that drive categorization and
/// reconciliation. All lists come from comma-separated env vars, same keys
/// as the original `restaurant.*` properties.
#[derive(Debug, Clone)]
pub struct RestaurantConfig {
    /// Product ids (ID_TW) counted as kitchen sales.
    pub kitchen_products: Vec<i64>,
    /// Product ids counted as buffet sales (item-level detail only; the
    /// aggregate buffet figure is always the residual).
    pub buffet_products: Vec<i64>,
    /// Product group ids (ID_GR) counted as buffet.
    pub buffet_groups: Vec<i32>,
    pub packaging_products: Vec<i64>,
    pub delivery_products: Vec<i64>,

    pub kitchen_warehouses: Vec<i32>,
    pub buffet_warehouses: Vec<i32>,
    pub cost_warehouses: Vec<i32>,

    pub default_sellers: Vec<i32>,
    pub all_sellers: Vec<i32>,

    /// Subscription/voucher product ids that suppress the suspicious-bill
    /// flag: large legitimate prepaid sales must not be flagged.
    pub subscription_products: Vec<i64>,

    pub validation: ValidationConfig,

    /// Weights for the hybrid cost-allocation strategy.
    pub allocation_sales_weight: Decimal,
    pub allocation_hours_weight: Decimal,
}

/// Thresholds of the suspicious-bill heuristic.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub suspicious_amount: Decimal,
    pub suspicious_duration_minutes: i64,
    pub very_suspicious_amount: Decimal,
    pub very_suspicious_duration_minutes: i64,
}

impl RestaurantConfig {
    /// A malformed value in any `RESTAURANT_*` variable is a configuration
    /// error, never silently dropped or defaulted; only an *unset* variable
    /// falls back to its default.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            kitchen_products: parse_ids("RESTAURANT_KITCHEN_PRODUCTS")?,
            buffet_products: parse_ids("RESTAURANT_BUFFET_PRODUCTS")?,
            buffet_groups: parse_ids("RESTAURANT_BUFFET_GROUPS")?,
            packaging_products: parse_ids("RESTAURANT_PACKAGING_PRODUCTS")?,
            delivery_products: parse_ids("RESTAURANT_DELIVERY_PRODUCTS")?,
            kitchen_warehouses: parse_ids("RESTAURANT_WAREHOUSES_KITCHEN")?,
            buffet_warehouses: parse_ids("RESTAURANT_WAREHOUSES_BUFFET")?,
            cost_warehouses: parse_ids("RESTAURANT_WAREHOUSES_COSTS")?,
            default_sellers: parse_ids("RESTAURANT_SELLERS_DEFAULT")?,
            all_sellers: parse_ids("RESTAURANT_SELLERS_ALL")?,
            subscription_products: parse_ids_or("RESTAURANT_SUBSCRIPTION_PRODUCTS", "4794,4468")?,
            validation: ValidationConfig {
                enabled: parse_or("RESTAURANT_VALIDATION_ENABLED", true)?,
                suspicious_amount: parse_or("RESTAURANT_SUSPICIOUS_AMOUNT", Decimal::from(1000))?,
                suspicious_duration_minutes: parse_or("RESTAURANT_SUSPICIOUS_DURATION", 10)?,
                very_suspicious_amount: parse_or(
                    "RESTAURANT_VERY_SUSPICIOUS_AMOUNT",
                    Decimal::from(2000),
                )?,
                very_suspicious_duration_minutes: parse_or(
                    "RESTAURANT_VERY_SUSPICIOUS_DURATION",
                    5,
                )?,
            },
            allocation_sales_weight: parse_or(
                "RESTAURANT_ALLOCATION_SALES_WEIGHT",
                Decimal::new(5, 1),
            )?,
            allocation_hours_weight: parse_or(
                "RESTAURANT_ALLOCATION_HOURS_WEIGHT",
                Decimal::new(5, 1),
            )?,
        })
    }

    /// Warehouse ids for a role; configuration error when the list is empty,
    /// since reconciliation cannot run against nothing.
    pub fn warehouses_for_role(
        &self,
        role: crate::models::purchasing::WarehouseRole,
    ) -> Result<Vec<i32>, AppError> {
        use crate::models::purchasing::WarehouseRole;
        let (ids, key) = match role {
            WarehouseRole::Kitchen => (&self.kitchen_warehouses, "RESTAURANT_WAREHOUSES_KITCHEN"),
            WarehouseRole::Buffet => (&self.buffet_warehouses, "RESTAURANT_WAREHOUSES_BUFFET"),
            WarehouseRole::Costs => (&self.cost_warehouses, "RESTAURANT_WAREHOUSES_COSTS"),
        };
        if ids.is_empty() {
            return Err(AppError::Configuration(format!(
                "no warehouses configured for role {} ({key})",
                role.name()
            )));
        }
        Ok(ids.clone())
    }

    pub fn subscription_product_set(&self) -> HashSet<i64> {
        self.subscription_products.iter().copied().collect()
    }
}

fn parse_ids<T: FromStr>(key: &str) -> Result<Vec<T>, AppError> {
    parse_id_list::<T>(&env::var(key).unwrap_or_default())
        .map_err(|token| AppError::Configuration(format!("invalid id '{token}' in {key}")))
}

fn parse_ids_or<T: FromStr>(key: &str, default: &str) -> Result<Vec<T>, AppError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_id_list::<T>(&raw)
        .map_err(|token| AppError::Configuration(format!("invalid id '{token}' in {key}")))
}

/// Parses a comma-separated id list; empty segments are tolerated, anything
/// non-numeric is returned as the offending token.
fn parse_id_list<T: FromStr>(raw: &str) -> Result<Vec<T>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|_| s.to_string()))
        .collect()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Configuration(format!("invalid value '{raw}' for {key}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_tolerate_spacing_and_empty_segments() {
        assert_eq!(parse_id_list::<i64>("1, 2,,3 ").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list::<i32>("").unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn malformed_id_token_is_reported_not_dropped() {
        let err = parse_id_list::<i64>("1,abc,3").unwrap_err();
        assert_eq!(err, "abc");
    }
}
