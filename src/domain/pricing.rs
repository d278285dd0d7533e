//! Booking price calculation
//!
//! Price is a pure function of the booked interval: the first started hour
//! is charged at `first_hour_rate`, every further started hour at
//! `additional_hour_rate`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Hourly pricing rates, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    pub first_hour_rate: i32,
    pub additional_hour_rate: i32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            first_hour_rate: 3000,
            additional_hour_rate: 2000,
        }
    }
}

impl PricingPolicy {
    pub fn new(first_hour_rate: i32, additional_hour_rate: i32) -> Self {
        Self {
            first_hour_rate,
            additional_hour_rate,
        }
    }

    /// Started hours covered by `[start, end]`; 0 for empty or inverted intervals.
    pub fn billable_hours(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        let millis = (end - start).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR
    }

    pub fn compute_price(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
        match self.billable_hours(start, end) {
            0 => 0,
            hours => {
                let extra = hours - 1;
                let total = i64::from(self.first_hour_rate)
                    + extra * i64::from(self.additional_hour_rate);
                i32::try_from(total).unwrap_or(i32::MAX)
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
