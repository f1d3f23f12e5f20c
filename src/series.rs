//! Weekly price series with per-bar derived fields

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Bar, OHLCVExt, PatternError, Result, OHLCV};

/// Ordered weekly bars annotated with `range_pct`.
///
/// Read-only after construction. Timestamps are strictly increasing and
/// every bar passed [`OHLCVExt::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
    range_pct: Vec<f64>,
}

impl PriceSeries {
    /// Preprocess raw bars.
    ///
    /// Returns [`PatternError::InsufficientHistory`] when fewer than
    /// `min_bars` bars are supplied; callers treat that as "no pattern".
    pub fn new(bars: Vec<Bar>, min_bars: usize) -> Result<Self> {
        let need = min_bars.max(1);
        if bars.len() < need {
            return Err(PatternError::InsufficientHistory { need, got: bars.len() });
        }

        let mut range_pct = Vec::with_capacity(bars.len());
        for (index, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidBar { reason, .. } => PatternError::InvalidBar { index, reason },
                other => other,
            })?;
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(PatternError::InvalidBar {
                    index,
                    reason: "timestamps not strictly increasing",
                });
            }
            // validate() guarantees low > 0
            range_pct.push(bar.range_pct().unwrap_or(f64::INFINITY));
        }

        Ok(Self { bars, range_pct })
    }

    /// Preprocess any OHLCV implementor
    pub fn from_ohlcv<T: OHLCV>(bars: &[T], min_bars: usize) -> Result<Self> {
        Self::new(bars.iter().map(Bar::from_ohlcv).collect(), min_bars)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn bar(&self, index: usize) -> &Bar {
        &self.bars[index]
    }

    #[inline]
    pub fn range_pct(&self, index: usize) -> f64 {
        self.range_pct[index]
    }

    pub fn last(&self) -> &Bar {
        // non-empty by construction
        &self.bars[self.bars.len() - 1]
    }

    /// Close of the most recent bar
    pub fn current_price(&self) -> f64 {
        self.last().close
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.last().timestamp
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Highest high over `start..end`, clipped to the series. None if empty.
    pub fn max_high(&self, start: usize, end: usize) -> Option<f64> {
        let end = end.min(self.bars.len());
        if start >= end {
            return None;
        }
        self.bars[start..end].iter().map(|b| b.high).reduce(f64::max)
    }

    /// Lowest low over `start..end`, clipped to the series. None if empty.
    pub fn min_low(&self, start: usize, end: usize) -> Option<f64> {
        let end = end.min(self.bars.len());
        if start >= end {
            return None;
        }
        self.bars[start..end].iter().map(|b| b.low).reduce(f64::min)
    }
}
