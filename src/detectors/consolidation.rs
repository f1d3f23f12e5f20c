//! Consolidation-zone ("demand zone") detection
//!
//! A demand zone is a run of consecutive tight-range weeks followed, within a
//! look-ahead window, by a rally of at least `min_rally_pct` above the run's
//! high. The scan is a single left-to-right pass; every qualifying run moves
//! the scan position past its last bar, so consolidation ranges never overlap.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::helpers::{pct_change, ZONE_SCAN_TAIL};
use super::PatternDetector;
use crate::{config::ScanConfig, series::PriceSeries};

/// Price range where consolidation preceded a qualifying rally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandZone {
    pub low: f64,
    pub high: f64,
    pub mid: f64,
    /// Timestamp of the last consolidation bar
    pub formed_at: DateTime<Utc>,
    pub rally_pct: f64,
    /// Number of consolidation bars
    pub strength: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl DemandZone {
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        (self.low..=self.high).contains(&price)
    }
}

/// Finds sideways-then-rally regions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidationZoneDetector;

impl ConsolidationZoneDetector {
    /// Next qualifying run of tight bars at or after `from`.
    ///
    /// A wide bar ends a run that already reached the minimum length;
    /// otherwise it resets the run and the search continues.
    fn next_run(series: &PriceSeries, from: usize, config: &ScanConfig) -> Option<Range<usize>> {
        let min_len = config.min_consolidation_weeks.get();
        let max_len = config.max_consolidation_weeks.get();
        let ceiling = config.max_consolidation_range_pct;

        let mut start = from;
        let mut len = 0;
        let mut j = from;
        while j < series.len() && len < max_len {
            if series.range_pct(j) < ceiling {
                if len == 0 {
                    start = j;
                }
                len += 1;
            } else if len >= min_len {
                break;
            } else {
                len = 0;
            }
            j += 1;
        }

        (len >= min_len).then(|| start..start + len)
    }

    fn zone_for_run(
        series: &PriceSeries,
        run: Range<usize>,
        config: &ScanConfig,
    ) -> Option<DemandZone> {
        let high = series.max_high(run.start, run.end)?;
        let low = series.min_low(run.start, run.end)?;
        let end_index = run.end - 1;

        // Clipped to the series; an empty window cannot confirm a rally.
        let lookahead = config.rally_lookahead_weeks.get();
        let max_after = series.max_high(run.end, run.end.saturating_add(lookahead))?;
        let rally_pct = pct_change(high, max_after);
        if rally_pct < config.min_rally_pct {
            return None;
        }

        Some(DemandZone {
            low,
            high,
            mid: (low + high) / 2.0,
            formed_at: series.bar(end_index).timestamp,
            rally_pct,
            strength: run.len(),
            start_index: run.start,
            end_index,
        })
    }
}

impl PatternDetector for ConsolidationZoneDetector {
    type Candidate = DemandZone;

    fn id(&self) -> &'static str {
        "DEMAND_ZONE"
    }

    fn min_bars(&self, config: &ScanConfig) -> usize {
        config.min_consolidation_weeks.get().saturating_add(ZONE_SCAN_TAIL + 1)
    }

    fn detect(&self, series: &PriceSeries, config: &ScanConfig) -> Vec<DemandZone> {
        let tail = config.min_consolidation_weeks.get().saturating_add(ZONE_SCAN_TAIL);
        let mut zones = Vec::new();
        let mut i: usize = 0;

        while i.saturating_add(tail) < series.len() {
            // No qualifying run from `i` means none from any later start.
            let Some(run) = Self::next_run(series, i, config) else {
                break;
            };
            let next = run.end;
            if let Some(zone) = Self::zone_for_run(series, run, config) {
                tracing::debug!(
                    start = zone.start_index,
                    end = zone.end_index,
                    rally_pct = zone.rally_pct,
                    "demand zone"
                );
                zones.push(zone);
            }
            i = next;
        }

        zones
    }
}
