//! # zonescan - weekly demand zone and resistance flip scanner
//!
//! Scans weekly OHLCV series for two price-action families:
//!
//! - **Demand zones**: tight sideways consolidation followed by a rally.
//! - **Resistance-to-support flips**: a level rejected several times that later
//!   broke out and was retested from above.
//!
//! and reports tickers whose current price sits at a qualifying zone or level.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use zonescan::prelude::*;
//!
//! let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
//! let bars: Vec<Bar> = (0..30i64)
//!     .map(|i| {
//!         let base = 100.0 + i as f64;
//!         Bar::new(start + Duration::weeks(i), base, base + 4.0, base - 4.0, base + 1.0, 1_000.0)
//!     })
//!     .collect();
//!
//! let config = ScanConfig::default();
//! config.validate().unwrap();
//!
//! // Wide weekly ranges never consolidate, so nothing is reported.
//! let outcome = scan_series("DEMO", bars, &config, None).unwrap();
//! assert!(outcome.is_none());
//! ```

use chrono::{DateTime, Utc};

pub mod alerts;
pub mod config;
pub mod detectors;
pub mod indicators;
pub mod proximity;
pub mod scan;
pub mod series;

pub mod prelude {
    pub use crate::{
        // Alerts
        alerts::{detect_price_alerts, summarize, AlertKind, PriceAlert, ScanSummary, SeenTickers},
        // Configuration
        config::{FetchPolicy, ParamMeta, ParamType, ScanConfig},
        // Detectors
        detectors::*,
        // Indicators
        indicators::{IndicatorProvider, Indicators, MacdTrend, RsiSignal, SimpleIndicators},
        // Matching
        proximity::{
            match_candidates, match_level, match_zone, Matched, MatchedLevel, MatchedZone,
        },
        // Orchestration
        scan::{
            scan_parallel, scan_series, CancellationToken, DataSource, FetchError, Progress,
            ScanReport, ScanResult, Scanner, TickerError, TickerUniverse,
        },
        // Series
        series::PriceSeries,
        // Core types
        Bar,
        OHLCVExt,
        PatternError,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while configuring or running a scan
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient history: need {need} bars, got {got}")]
    InsufficientHistory { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("No data for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Ticker universe unavailable: {0}")]
    UniverseUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PatternError {
    /// True for failures scoped to a single ticker. These never abort a batch;
    /// they only remove the ticker from the result set.
    pub fn is_per_ticker(&self) -> bool {
        matches!(
            self,
            PatternError::InsufficientHistory { .. }
                | PatternError::InvalidBar { .. }
                | PatternError::DataUnavailable { .. }
        )
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Bar count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Weekly OHLCV bar as delivered by a data source
pub trait OHLCV {
    fn timestamp(&self) -> DateTime<Utc>;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// `(high - low) / low * 100`. Returns None if low <= 0
    #[inline]
    fn range_pct(&self) -> Option<f64> {
        let low = self.low();
        (low > 0.0).then(|| self.range() / low * 100.0)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.low() <= 0.0 {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "non-positive low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One weekly bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Copy any OHLCV implementor into a concrete bar
    pub fn from_ohlcv<T: OHLCV>(bar: &T) -> Self {
        Self::new(
            bar.timestamp(),
            bar.open(),
            bar.high(),
            bar.low(),
            bar.close(),
            bar.volume(),
        )
    }
}

impl OHLCV for Bar {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// TESTS
// ============================================================
