//! Human-readable duration reporting for balance runway estimates.

use crate::constants::{calendar, TICK_DURATION_SECONDS};
use crate::types::{Balance, StreamRef};

/// How long a balance lasts at the current total cost per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRemaining {
    pub ticks: u128,
    pub seconds: u128,
    pub formatted: String,
}

/// Formats a second count as a tiered, calendar-approximate string.
///
/// First matching tier wins: `"{y} years, {m} months"`, then
/// `"{d} days, {h} hours"`, then `"{m} minutes"`. No sub-minute
/// granularity is ever reported.
pub fn format_duration(total_seconds: u64) -> String {
    let years = total_seconds / calendar::SECONDS_PER_YEAR;
    if years > 0 {
        let months = (total_seconds % calendar::SECONDS_PER_YEAR) / calendar::SECONDS_PER_MONTH;
        return format!("{years} years, {months} months");
    }

    let days = total_seconds / calendar::SECONDS_PER_DAY;
    if days > 0 {
        let hours = (total_seconds % calendar::SECONDS_PER_DAY) / calendar::SECONDS_PER_HOUR;
        return format!("{days} days, {hours} hours");
    }

    let minutes = total_seconds / calendar::SECONDS_PER_MINUTE;
    format!("{minutes} minutes")
}

/// Estimates how long `balance` funds the given payment streams.
///
/// With a zero total cost per tick there is nothing to fund, reported as
/// zero ticks, zero seconds and the literal `"No active streams"`.
pub fn calculate_time_remaining(balance: Balance, streams: &[StreamRef]) -> TimeRemaining {
    let total_cost_per_tick: u128 = streams
        .iter()
        .fold(0u128, |sum, s| sum.saturating_add(s.cost_per_tick));

    if total_cost_per_tick == 0 {
        return TimeRemaining {
            ticks: 0,
            seconds: 0,
            formatted: "No active streams".to_string(),
        };
    }

    let ticks = balance / total_cost_per_tick;
    let seconds = ticks.saturating_mul(TICK_DURATION_SECONDS as u128);

    TimeRemaining {
        ticks,
        seconds,
        formatted: format_duration(u64::try_from(seconds).unwrap_or(u64::MAX)),
    }
}
