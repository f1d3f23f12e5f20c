//! Resistance-to-support flip detection
//!
//! A clustered resistance level qualifies when, after its last rejection,
//! price closed decisively above it. The first later bar that dips back to
//! the level and holds is recorded as the support test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::helpers::{
    pct_change, weeks_between, BOUNCE_WINDOW, BREAKOUT_FACTOR, MIN_BARS_AFTER_LAST_TEST,
    SUPPORT_CLOSE_FLOOR, SUPPORT_TOUCH_FACTOR,
};
use super::swing::{cluster_swing_points, find_swing_highs, ResistanceCluster};
use super::PatternDetector;
use crate::{config::ScanConfig, series::PriceSeries};

/// Resistance level that broke out and was (possibly) retested as support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlippedLevel {
    pub level: f64,
    pub resistance_tests: usize,
    pub resistance_touch_dates: Vec<DateTime<Utc>>,
    pub last_resistance_date: DateTime<Utc>,
    pub breakout_date: DateTime<Utc>,
    /// None when price never came back to the level after the breakout
    pub support_test_date: Option<DateTime<Utc>>,
    pub support_bounce_pct: Option<f64>,
    /// Whole weeks from the last resistance test to the last bar
    pub weeks_old: i64,
    /// Resistance tests, plus one when the support test was confirmed
    pub strength: usize,
}

impl FlippedLevel {
    #[inline]
    pub fn has_support_test(&self) -> bool {
        self.support_test_date.is_some()
    }
}

/// Validates clustered resistance levels against breakout and retest rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ResistanceFlipDetector;

impl ResistanceFlipDetector {
    /// Apply the breakout and support-test rules to one cluster.
    ///
    /// Returns None when fewer than five bars follow the last test or no
    /// close ever clears the breakout threshold.
    pub fn evaluate_cluster(
        series: &PriceSeries,
        cluster: &ResistanceCluster,
        tolerance: f64,
    ) -> Option<FlippedLevel> {
        let level = cluster.level;
        let last_test = cluster.last_touch()?;
        let bars = series.bars();

        if bars.len().saturating_sub(last_test.index + 1) < MIN_BARS_AFTER_LAST_TEST {
            return None;
        }

        let breakout = (last_test.index + 1..bars.len())
            .find(|&i| bars[i].close > level * BREAKOUT_FACTOR)?;

        let touch_ceiling = level * (1.0 + SUPPORT_TOUCH_FACTOR * tolerance);
        let close_floor = level * SUPPORT_CLOSE_FLOOR;
        let support = (breakout + 1..bars.len())
            .find(|&i| bars[i].low <= touch_ceiling && bars[i].close > close_floor);

        // TODO: levels without a support test are still emitted; revisit once
        // it is settled whether an unconfirmed flip should be reported at all.
        let support_bounce_pct = support.and_then(|s| {
            series
                .max_high(s, s.saturating_add(BOUNCE_WINDOW + 1))
                .map(|high| pct_change(level, high))
        });

        Some(FlippedLevel {
            level,
            resistance_tests: cluster.count,
            resistance_touch_dates: cluster.touches.iter().map(|p| p.timestamp).collect(),
            last_resistance_date: last_test.timestamp,
            breakout_date: bars[breakout].timestamp,
            support_test_date: support.map(|s| bars[s].timestamp),
            support_bounce_pct,
            weeks_old: weeks_between(last_test.timestamp, series.last_timestamp()),
            strength: cluster.count + usize::from(support.is_some()),
        })
    }
}

impl PatternDetector for ResistanceFlipDetector {
    type Candidate = FlippedLevel;

    fn id(&self) -> &'static str {
        "RESISTANCE_FLIP"
    }

    fn min_bars(&self, config: &ScanConfig) -> usize {
        config
            .swing_order
            .get()
            .saturating_mul(2)
            .saturating_add(1 + MIN_BARS_AFTER_LAST_TEST)
    }

    fn detect(&self, series: &PriceSeries, config: &ScanConfig) -> Vec<FlippedLevel> {
        let swings = find_swing_highs(series, config.swing_order.get());
        let clusters = cluster_swing_points(&swings, config.cluster_tolerance);

        clusters
            .iter()
            .filter(|c| c.count >= config.min_resistance_tests)
            .filter_map(|c| {
                let flipped = Self::evaluate_cluster(series, c, config.cluster_tolerance);
                match &flipped {
                    Some(f) => tracing::debug!(level = f.level, strength = f.strength, "flipped level"),
                    None => tracing::debug!(level = c.level, touches = c.count, "cluster did not flip"),
                }
                flipped
            })
            .collect()
    }
}
