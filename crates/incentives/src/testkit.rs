//! Shared fixtures for unit tests.

use chrono::{DateTime, TimeZone, Utc};
use dsh_core::incentives::{IncentiveContext, IncentivesSnapshot};

const DEFAULT_SNAPSHOT: &str = include_str!("../../../config/incentives.toml");

pub fn default_snapshot() -> IncentivesSnapshot {
    IncentivesSnapshot::from_toml_str(DEFAULT_SNAPSHOT).unwrap()
}

/// Monday 2025-06-16, noon in Aden. No time-scoped default rule matches.
pub fn weekday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap()
}

/// Friday 2025-06-13, 21:00 in Aden.
pub fn friday_evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 13, 18, 0, 0).unwrap()
}

pub fn context(subtotal: i64, delivery_fee: i64) -> IncentiveContext {
    IncentiveContext {
        timestamp: Some(weekday_noon()),
        ..IncentiveContext::new(subtotal, delivery_fee)
    }
}
