//! Shared thresholds and window maths for the level and zone detectors.

use chrono::{DateTime, Utc};

// ============================================================
// THRESHOLDS
// ============================================================

/// Bars that must remain past the scan position for a new consolidation
/// search to start (on top of `min_consolidation_weeks`)
pub const ZONE_SCAN_TAIL: usize = 5;

/// Breakout: close > level * BREAKOUT_FACTOR
pub const BREAKOUT_FACTOR: f64 = 1.02;
/// Bars required after the last resistance test before a breakout is judged
pub const MIN_BARS_AFTER_LAST_TEST: usize = 5;
/// Support test: low <= level * (1 + SUPPORT_TOUCH_FACTOR * tolerance)
pub const SUPPORT_TOUCH_FACTOR: f64 = 1.5;
/// Support test: close > level * SUPPORT_CLOSE_FLOOR
pub const SUPPORT_CLOSE_FLOOR: f64 = 0.98;
/// Bars after a support test searched for the bounce high; the window also
/// includes the support-test bar itself, spanning `BOUNCE_WINDOW + 1` bars
pub const BOUNCE_WINDOW: usize = 5;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Percentage move from `from` to `to`
#[inline]
pub fn pct_change(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

/// True if `price` is within `tolerance` (fraction) of `reference`
#[inline]
pub fn within_tolerance(price: f64, reference: f64, tolerance: f64) -> bool {
    reference > 0.0 && (price - reference).abs() / reference <= tolerance
}

/// Whole weeks elapsed between two timestamps (floored)
#[inline]
pub fn weeks_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days().div_euclid(7)
}
