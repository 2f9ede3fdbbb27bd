// src/services/point_of_sale.rs
//
// Static registry of the restaurant's points of sale. The POS database has
// no notion of a "point": the split is external knowledge (which seller
// accounts ring up where, and the opening hours of each spot).

use chrono::{NaiveTime, Weekday};
use std::collections::HashMap;

use crate::config::RestaurantConfig;
use crate::models::point_of_sale::{PointOfSale, TimeRange, WorkingHours};

/// Seller account dedicated to the KD kiosk; everything else sells at the
/// main RATUSZOWA restaurant.
const KD_SELLER_ID: i32 = 11;

#[derive(Debug, Clone)]
pub struct PointOfSaleRegistry {
    points: Vec<PointOfSale>,
}

impl PointOfSaleRegistry {
    pub fn from_config(config: &RestaurantConfig) -> Self {
        let ratuszowa_sellers: Vec<i32> = config
            .all_sellers
            .iter()
            .copied()
            .filter(|id| *id != KD_SELLER_ID)
            .collect();

        Self {
            points: vec![
                PointOfSale {
                    id: "ratuszowa".into(),
                    name: "RATUSZOWA".into(),
                    seller_ids: ratuszowa_sellers,
                    working_hours: daily_hours(12, 21),
                },
                PointOfSale {
                    id: "kd".into(),
                    name: "KD".into(),
                    seller_ids: vec![KD_SELLER_ID],
                    working_hours: kd_hours(),
                },
            ],
        }
    }

    pub fn points(&self) -> &[PointOfSale] {
        &self.points
    }

    pub fn find(&self, id: &str) -> Option<&PointOfSale> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn point_for_seller(&self, seller_id: i32) -> Option<&PointOfSale> {
        self.points.iter().find(|p| p.has_seller(seller_id))
    }

    /// Combined weekly open hours of every point; the denominator of the
    /// hours-based allocation share.
    pub fn total_weekly_hours(&self) -> i64 {
        self.points.iter().map(|p| p.working_hours.weekly_hours()).sum()
    }
}

fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("whole hour is valid")
}

/// Same open-to-close range every day of the week.
fn daily_hours(open: u32, close: u32) -> WorkingHours {
    let range = TimeRange::new(time(open), time(close));
    let all_days = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    WorkingHours::new(all_days.into_iter().map(|d| (d, range)).collect())
}

/// KD runs weekdays 11-18 and Saturday 11-14, closed Sunday.
fn kd_hours() -> WorkingHours {
    let weekday = TimeRange::new(time(11), time(18));
    let saturday = TimeRange::new(time(11), time(14));
    let mut hours: HashMap<Weekday, TimeRange> = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
    .into_iter()
    .map(|d| (d, weekday))
    .collect();
    hours.insert(Weekday::Sat, saturday);
    WorkingHours::new(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PointOfSaleRegistry {
        let mut config = RestaurantConfig::from_env().unwrap();
        config.all_sellers = vec![3, 7, 11, 15];
        PointOfSaleRegistry::from_config(&config)
    }

    #[test]
    fn kd_owns_its_seller_and_the_rest_belong_to_ratuszowa() {
        let reg = registry();
        assert_eq!(reg.point_for_seller(11).unwrap().name, "KD");
        assert_eq!(reg.point_for_seller(3).unwrap().name, "RATUSZOWA");
        assert_eq!(reg.point_for_seller(15).unwrap().name, "RATUSZOWA");
        assert!(reg.point_for_seller(99).is_none());
    }

    #[test]
    fn weekly_hours_match_the_posted_schedules() {
        let reg = registry();
        // RATUSZOWA: 9h * 7 days
        assert_eq!(reg.find("ratuszowa").unwrap().working_hours.weekly_hours(), 63);
        // KD: 7h * 5 weekdays + 3h Saturday
        assert_eq!(reg.find("kd").unwrap().working_hours.weekly_hours(), 38);
        assert_eq!(reg.total_weekly_hours(), 101);
    }

    #[test]
    fn kd_is_closed_on_sunday() {
        let reg = registry();
        let kd = reg.find("kd").unwrap();
        assert!(!kd.working_hours.is_open_on(Weekday::Sun));
        assert!(kd.working_hours.is_open(Weekday::Sat, time(12)));
        assert!(!kd.working_hours.is_open(Weekday::Sat, time(15)));
    }
}
