//! Protocol constants shared across the SDK.

/// Wall-clock seconds per network tick (one tick per block).
pub const TICK_DURATION_SECONDS: u64 = 6;

/// Fixed-point scale factor applied to price-index units.
///
/// Price index increments stay representable as integers while debt
/// resolves to native currency units: `debt = delta * amount / 2^30`.
pub const PRICE_INDEX_SCALE: u128 = 1 << 30;

/// Calendar-approximation constants used by duration formatting.
pub mod calendar {
    pub const SECONDS_PER_MINUTE: u64 = 60;
    pub const SECONDS_PER_HOUR: u64 = 3_600;
    pub const SECONDS_PER_DAY: u64 = 86_400;
    /// ~30.44 days.
    pub const SECONDS_PER_MONTH: u64 = 2_629_746;
    /// ~365.25 days.
    pub const SECONDS_PER_YEAR: u64 = 31_556_952;
}

/// Default reconciliation budgets.
pub mod polling {
    use std::time::Duration;

    /// Attempts for "backend record exists" checks (~20s ceiling).
    pub const BACKEND_LOOKUP_ATTEMPTS: u32 = 10;
    pub const BACKEND_LOOKUP_INTERVAL: Duration = Duration::from_secs(2);

    /// Attempts for "full replication achieved" checks. BSPs have around
    /// 11 minutes to reach the required replication level, so the budget
    /// is 144 x 5s (~12 minutes).
    pub const REPLICATION_ATTEMPTS: u32 = 144;
    pub const REPLICATION_INTERVAL: Duration = Duration::from_secs(5);
}
