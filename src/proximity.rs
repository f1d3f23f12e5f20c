//! Proximity matching of the current price against zones and levels
//!
//! Both policies are first-match-wins over the candidates in the order given;
//! they do not look for the nearest or most recent candidate.
//!
//! `distance_pct` is signed: positive when price is above the zone high or the
//! level, zero inside a zone, negative below.

use serde::Serialize;

use crate::{
    config::ScanConfig,
    detectors::{pct_change, weeks_between, Candidates, DemandZone, FlippedLevel},
    series::PriceSeries,
};

/// Price may sit this far above a flipped level and still match
pub const LEVEL_MAX_ABOVE: f64 = 0.05;
/// Retest variant: minimum zone age in weeks
pub const RETEST_MIN_AGE_WEEKS: i64 = 4;
/// Retest variant: minimum rally above the zone high after formation
pub const RETEST_MIN_RALLY_PCT: f64 = 10.0;

/// Demand zone the current price is at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedZone {
    #[serde(flatten)]
    pub zone: DemandZone,
    pub current_price: f64,
    pub distance_pct: f64,
}

/// Flipped level the current price is at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLevel {
    #[serde(flatten)]
    pub level: FlippedLevel,
    pub current_price: f64,
    pub distance_pct: f64,
}

/// Active zone or level for a ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matched {
    Zone(MatchedZone),
    Level(MatchedLevel),
}

impl Matched {
    pub fn distance_pct(&self) -> f64 {
        match self {
            Matched::Zone(z) => z.distance_pct,
            Matched::Level(l) => l.distance_pct,
        }
    }

    pub fn current_price(&self) -> f64 {
        match self {
            Matched::Zone(z) => z.current_price,
            Matched::Level(l) => l.current_price,
        }
    }

    /// Lower and upper price of the matched zone, or the level twice
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Matched::Zone(z) => (z.zone.low, z.zone.high),
            Matched::Level(l) => (l.level.level, l.level.level),
        }
    }
}

/// Signed distance from `price` to the nearer zone bound, relative to price
pub fn zone_distance_pct(price: f64, zone: &DemandZone) -> f64 {
    if price < zone.low {
        -(zone.low - price) / price * 100.0
    } else if price > zone.high {
        (price - zone.high) / price * 100.0
    } else {
        0.0
    }
}

/// True if the zone is old enough and price already rallied away from it
fn zone_was_retested(zone: &DemandZone, series: &PriceSeries) -> bool {
    let old_enough =
        weeks_between(zone.formed_at, series.last_timestamp()) >= RETEST_MIN_AGE_WEEKS;
    let rallied = series
        .max_high(zone.end_index + 1, series.len())
        .is_some_and(|high| pct_change(zone.high, high) >= RETEST_MIN_RALLY_PCT);
    old_enough && rallied
}

/// First zone whose tolerance band contains `price`
pub fn match_zone(
    price: f64,
    zones: &[DemandZone],
    series: &PriceSeries,
    config: &ScanConfig,
) -> Option<MatchedZone> {
    let tol = config.zone_tolerance;
    zones
        .iter()
        .filter(|z| (z.low * (1.0 - tol)..=z.high * (1.0 + tol)).contains(&price))
        .find(|z| !config.require_zone_retest || zone_was_retested(z, series))
        .map(|zone| MatchedZone {
            zone: zone.clone(),
            current_price: price,
            distance_pct: zone_distance_pct(price, zone),
        })
}

/// First level with `level * (1 - tol) <= price <= level * 1.05`
pub fn match_level(price: f64, levels: &[FlippedLevel], config: &ScanConfig) -> Option<MatchedLevel> {
    let tol = config.level_tolerance;
    levels
        .iter()
        .find(|l| (l.level * (1.0 - tol)..=l.level * (1.0 + LEVEL_MAX_ABOVE)).contains(&price))
        .map(|level| MatchedLevel {
            level: level.clone(),
            current_price: price,
            distance_pct: pct_change(level.level, price),
        })
}

/// Dispatch to the policy for the candidates' family
pub fn match_candidates(
    price: f64,
    candidates: &Candidates,
    series: &PriceSeries,
    config: &ScanConfig,
) -> Option<Matched> {
    match candidates {
        Candidates::Zones(zones) => match_zone(price, zones, series, config).map(Matched::Zone),
        Candidates::Levels(levels) => match_level(price, levels, config).map(Matched::Level),
    }
}
