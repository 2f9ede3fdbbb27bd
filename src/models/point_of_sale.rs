// src/models/point_of_sale.rs

use chrono::{Duration, NaiveTime, Weekday};
use std::collections::HashMap;

/// Opening hours of a point of sale, per weekday. A weekday missing from the
/// map means closed that day.
#[derive(Debug, Clone)]
pub struct WorkingHours {
    hours_by_day: HashMap<Weekday, TimeRange>,
}

impl WorkingHours {
    pub fn new(hours_by_day: HashMap<Weekday, TimeRange>) -> Self {
        Self { hours_by_day }
    }

    pub fn is_open(&self, day: Weekday, time: NaiveTime) -> bool {
        self.hours_by_day
            .get(&day)
            .is_some_and(|range| range.contains(time))
    }

    pub fn is_open_on(&self, day: Weekday) -> bool {
        self.hours_by_day.contains_key(&day)
    }

    /// Total open hours over one week; drives the hours-based cost
    /// allocation strategy.
    pub fn weekly_hours(&self) -> i64 {
        self.hours_by_day.values().map(TimeRange::hours).sum()
    }
}

/// An open-to-close time range within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TimeRange {
    /// Panics if `close` is before `open`; the registry is built from
    /// literals at startup, so this is a programming error, not input.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        assert!(close >= open, "close time before open time");
        Self { open, close }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time <= self.close
    }

    pub fn hours(&self) -> i64 {
        Duration::seconds((self.close - self.open).num_seconds()).num_hours()
    }
}

/// A named grouping of sellers used for cost allocation and per-point
/// reporting. External configuration, not derived from POS data.
#[derive(Debug, Clone)]
pub struct PointOfSale {
    pub id: String,
    pub name: String,
    pub seller_ids: Vec<i32>,
    pub working_hours: WorkingHours,
}

impl PointOfSale {
    pub fn has_seller(&self, seller_id: i32) -> bool {
        self.seller_ids.contains(&seller_id)
    }
}
