// src/services/validation.rs
//
// The suspicious-bill heuristic: large amounts rung up in implausibly short
// sittings. Purely an alerting aid for the owner; nothing here blocks or
// mutates a bill.

use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::info;

use crate::common::AppError;
use crate::config::{RestaurantConfig, ValidationConfig};
use crate::db::BillRepository;
use crate::models::bill::Bill;
use crate::models::report::{Severity, SuspiciousBill, SuspiciousBillStats};

#[derive(Clone)]
pub struct BillValidationService {
    bill_repo: BillRepository,
    config: RestaurantConfig,
}

impl BillValidationService {
    pub fn new(bill_repo: BillRepository, config: RestaurantConfig) -> Self {
        Self { bill_repo, config }
    }

    /// Scans all bills started in [from, to) and returns the flagged ones.
    /// Empty when validation is disabled.
    pub async fn find_suspicious_bills(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SuspiciousBill>, AppError> {
        if !self.config.validation.enabled {
            return Ok(Vec::new());
        }

        let bills = self.bill_repo.find_bills_in_range(from, to).await?;
        let subscription_products = self.config.subscription_product_set();
        let now = chrono::Local::now().naive_local();

        let flagged: Vec<SuspiciousBill> = bills
            .iter()
            .flat_map(|bill| {
                validate_bill(
                    bill,
                    &self.config.validation,
                    &subscription_products,
                    &self.config.all_sellers,
                    now,
                )
            })
            .collect();

        if !flagged.is_empty() {
            info!(
                flagged = flagged.len(),
                scanned = bills.len(),
                "suspicious bills found"
            );
        }

        Ok(flagged)
    }

    pub fn stats(&self, flagged: &[SuspiciousBill]) -> SuspiciousBillStats {
        compute_stats(flagged, &self.config.validation)
    }
}

/// Applies the heuristic to one bill against a fixed `now`. A bill can
/// carry more than one flag.
///
/// A bill started in the future is a clock problem in the POS and is always
/// reported, independent of every other check. Separately, a bill
/// containing any subscription product is never flagged as suspicious:
/// prepaid vouchers are large, instant and legitimate. What remains is
/// flagged when the amount exceeds the threshold, the sitting was shorter
/// than the minimum and the seller is one of the known accounts.
pub fn validate_bill(
    bill: &Bill,
    thresholds: &ValidationConfig,
    subscription_products: &HashSet<i64>,
    known_sellers: &[i32],
    now: NaiveDateTime,
) -> Vec<SuspiciousBill> {
    let mut flags = Vec::new();

    if bill.started_at > now {
        flags.push(flagged(
            bill,
            Severity::DateError,
            format!("bill start {} is in the future", bill.started_at),
        ));
    }

    let has_subscription = bill
        .items
        .iter()
        .any(|item| item.product_id.is_some_and(|id| subscription_products.contains(&id)));
    if has_subscription {
        return flags;
    }

    let duration_minutes = bill.duration().num_minutes();
    let known_seller = bill
        .seller_id
        .is_some_and(|id| known_sellers.contains(&id));

    let suspicious = bill.net_total > thresholds.suspicious_amount
        && duration_minutes < thresholds.suspicious_duration_minutes
        && known_seller;
    if !suspicious {
        return flags;
    }

    let severity = if bill.net_total > thresholds.very_suspicious_amount
        && duration_minutes < thresholds.very_suspicious_duration_minutes
    {
        Severity::VerySuspicious
    } else {
        Severity::Suspicious
    };

    flags.push(flagged(
        bill,
        severity,
        format!(
            "{} net in {} (threshold {} in under {} min)",
            bill.net_total,
            bill.duration_formatted(),
            thresholds.suspicious_amount,
            thresholds.suspicious_duration_minutes
        ),
    ));

    flags
}

fn flagged(bill: &Bill, severity: Severity, reason: String) -> SuspiciousBill {
    SuspiciousBill {
        bill_id: bill.id,
        started_at: bill.started_at,
        ended_at: bill.ended_at,
        duration_minutes: bill.duration().num_minutes(),
        amount: bill.net_total,
        seller_id: bill.seller_id,
        seller_name: bill.seller_name.clone(),
        reason,
        severity,
    }
}

/// Aggregates the flagged list for the report header.
pub fn compute_stats(flagged: &[SuspiciousBill], thresholds: &ValidationConfig) -> SuspiciousBillStats {
    SuspiciousBillStats {
        total_count: flagged.len() as u32,
        very_suspicious_count: flagged
            .iter()
            .filter(|b| b.severity == Severity::VerySuspicious)
            .count() as u32,
        total_amount: flagged.iter().map(|b| b.amount).sum(),
        high_amount_count: flagged
            .iter()
            .filter(|b| b.amount > thresholds.very_suspicious_amount)
            .count() as u32,
        short_duration_count: flagged
            .iter()
            .filter(|b| b.duration_minutes < thresholds.very_suspicious_duration_minutes)
            .count() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bill::LineItem;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn thresholds() -> ValidationConfig {
        ValidationConfig {
            enabled: true,
            suspicious_amount: dec!(1000),
            suspicious_duration_minutes: 10,
            very_suspicious_amount: dec!(2000),
            very_suspicious_duration_minutes: 5,
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn bill(net: Decimal, minutes: i64, seller: i32) -> Bill {
        let started_at = at(13, 0);
        Bill {
            id: 42,
            started_at,
            ended_at: started_at + chrono::Duration::minutes(minutes),
            net_total: net,
            gross_total: net,
            guest_count: 2,
            seller_id: Some(seller),
            seller_name: Some("Ewa".into()),
            items: Vec::new(),
        }
    }

    fn line_with_product(product_id: i64) -> LineItem {
        LineItem {
            id: 1,
            bill_id: 42,
            product_id: Some(product_id),
            product_name: None,
            group_id: None,
            quantity: dec!(1),
            net_value: dec!(10),
            correction_no: 0,
            position_no: 1,
        }
    }

    fn now() -> NaiveDateTime {
        at(23, 0)
    }

    #[test]
    fn large_fast_bill_from_known_seller_is_flagged() {
        let b = bill(dec!(1500), 8, 11);
        let flags = validate_bill(&b, &thresholds(), &HashSet::new(), &[11, 12], now());
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::Suspicious);
        assert_eq!(flags[0].duration_minutes, 8);
    }

    #[test]
    fn very_large_very_fast_bill_escalates() {
        let b = bill(dec!(2500), 4, 11);
        let flags = validate_bill(&b, &thresholds(), &HashSet::new(), &[11], now());
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::VerySuspicious);
        assert_eq!(flags[0].severity.to_string(), "BARDZO PODEJRZANY");
    }

    #[test]
    fn very_large_but_slow_bill_stays_plain_suspicious() {
        // over the escalation amount but not under the escalation duration
        let b = bill(dec!(2500), 8, 11);
        let flags = validate_bill(&b, &thresholds(), &HashSet::new(), &[11], now());
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::Suspicious);
    }

    #[test]
    fn all_three_conditions_are_required() {
        let cfg = thresholds();
        let sellers = [11];
        // amount under threshold
        assert!(validate_bill(&bill(dec!(900), 4, 11), &cfg, &HashSet::new(), &sellers, now()).is_empty());
        // duration at/over threshold
        assert!(validate_bill(&bill(dec!(1500), 10, 11), &cfg, &HashSet::new(), &sellers, now()).is_empty());
        // unknown seller
        assert!(validate_bill(&bill(dec!(1500), 4, 99), &cfg, &HashSet::new(), &sellers, now()).is_empty());
    }

    #[test]
    fn subscription_product_suppresses_the_flag() {
        let mut b = bill(dec!(3000), 2, 11);
        b.items.push(line_with_product(4794));
        let subs: HashSet<i64> = [4794, 4468].into_iter().collect();
        assert!(validate_bill(&b, &thresholds(), &subs, &[11], now()).is_empty());
    }

    #[test]
    fn future_start_is_a_date_error_even_with_subscription() {
        let mut b = bill(dec!(50), 30, 11);
        b.items.push(line_with_product(4794));
        let subs: HashSet<i64> = [4794].into_iter().collect();
        // "now" before the bill's start time
        let flags = validate_bill(&b, &thresholds(), &subs, &[11], at(9, 0));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::DateError);
        assert_eq!(flags[0].severity.to_string(), "BŁĄD DATY");
    }

    #[test]
    fn future_start_keeps_the_suspicious_flag_too() {
        // a large fast bill with a broken clock reports both problems
        let b = bill(dec!(1500), 8, 11);
        let flags = validate_bill(&b, &thresholds(), &HashSet::new(), &[11], at(9, 0));
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].severity, Severity::DateError);
        assert_eq!(flags[1].severity, Severity::Suspicious);
    }

    #[test]
    fn stats_count_severities_and_thresholds() {
        let cfg = thresholds();
        let subs = HashSet::new();
        let flagged: Vec<SuspiciousBill> = [
            bill(dec!(1500), 8, 11),
            bill(dec!(2500), 4, 11),
            bill(dec!(1200), 3, 11),
        ]
        .iter()
        .flat_map(|b| validate_bill(b, &cfg, &subs, &[11], now()))
        .collect();

        let stats = compute_stats(&flagged, &cfg);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.very_suspicious_count, 1);
        assert_eq!(stats.total_amount, dec!(5200));
        assert_eq!(stats.high_amount_count, 1);
        assert_eq!(stats.short_duration_count, 2);
    }
}
