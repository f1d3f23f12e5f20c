//! New-ticker detection and indicator-driven price alerts
//!
//! Detection never reads any of this. [`SeenTickers`] is the only state that
//! outlives a scan: the symbols reported last time, persisted as JSON.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    indicators::{MacdTrend, RsiSignal},
    scan::ScanResult,
    PatternError, Result,
};

pub const STRONG_OVERSOLD_RSI: f64 = 30.0;
pub const LOW_RSI: f64 = 40.0;
pub const VOLUME_SPIKE_RATIO: f64 = 2.0;

// ============================================================
// SEEN TICKERS
// ============================================================

/// Tickers reported by the previous scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeenTickers {
    #[serde(default)]
    pub tickers: BTreeSet<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SeenTickers {
    /// Load the previous set. A missing file is an empty set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(PatternError::Persistence(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&text)
            .map_err(|e| PatternError::Persistence(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PatternError::Persistence(e.to_string()))?;
        fs::write(path, json).map_err(|e| PatternError::Persistence(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), tickers = self.tickers.len(), "saved seen tickers");
        Ok(())
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Results whose ticker was not reported last time, in input order
    pub fn new_results<'a>(&self, results: &'a [ScanResult]) -> Vec<&'a ScanResult> {
        results.iter().filter(|r| !self.contains(&r.ticker)).collect()
    }

    /// Replace the set with the tickers in `results`
    pub fn record(&mut self, results: &[ScanResult]) {
        self.tickers = results.iter().map(|r| r.ticker.clone()).collect();
        self.timestamp = Some(Utc::now());
    }
}

// ============================================================
// PRICE ALERTS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// RSI below 30
    StrongOversold,
    /// Bullish MACD with RSI below 40
    BullishMacdLowRsi,
    /// Volume more than twice its 20-week average
    VolumeSpike,
}

impl AlertKind {
    pub fn title(self) -> &'static str {
        match self {
            AlertKind::StrongOversold => "Strong Oversold Signal",
            AlertKind::BullishMacdLowRsi => "Bullish MACD + Low RSI",
            AlertKind::VolumeSpike => "High Volume Spike",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAlert {
    pub ticker: String,
    pub kind: AlertKind,
    pub current_price: f64,
    pub rsi: Option<f64>,
    pub volume_ratio: f64,
}

/// Alerts for results carrying indicators. One result may raise several.
pub fn detect_price_alerts(results: &[ScanResult]) -> Vec<PriceAlert> {
    let mut alerts = Vec::new();

    for result in results {
        let Some(ind) = &result.indicators else {
            continue;
        };
        let alert = |kind| PriceAlert {
            ticker: result.ticker.clone(),
            kind,
            current_price: result.current_price,
            rsi: ind.rsi,
            volume_ratio: ind.volume_ratio,
        };

        if ind.rsi.is_some_and(|rsi| rsi < STRONG_OVERSOLD_RSI) {
            alerts.push(alert(AlertKind::StrongOversold));
        }
        if ind.macd_trend == MacdTrend::Bullish && ind.rsi.is_some_and(|rsi| rsi < LOW_RSI) {
            alerts.push(alert(AlertKind::BullishMacdLowRsi));
        }
        if ind.volume_ratio > VOLUME_SPIKE_RATIO {
            alerts.push(alert(AlertKind::VolumeSpike));
        }
    }

    alerts
}

/// Aggregate indicator readings over one scan's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    /// Mean RSI over results that have one
    pub avg_rsi: Option<f64>,
    pub oversold: usize,
    pub bullish_macd: usize,
}

pub fn summarize(results: &[ScanResult]) -> ScanSummary {
    let readings: Vec<_> = results.iter().filter_map(|r| r.indicators.as_ref()).collect();
    let rsis: Vec<f64> = readings.iter().filter_map(|i| i.rsi).collect();

    ScanSummary {
        total: results.len(),
        avg_rsi: (!rsis.is_empty()).then(|| rsis.iter().sum::<f64>() / rsis.len() as f64),
        oversold: readings.iter().filter(|i| i.rsi_signal == Some(RsiSignal::Oversold)).count(),
        bullish_macd: readings.iter().filter(|i| i.macd_trend == MacdTrend::Bullish).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Candidates, FlippedLevel};
    use crate::indicators::Indicators;
    use crate::proximity::{Matched, MatchedLevel};
    use crate::series::PriceSeries;
    use crate::Bar;
    use chrono::TimeZone;

    fn result(ticker: &str, rsi: Option<f64>, trend: MacdTrend, volume_ratio: f64) -> ScanResult {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = PriceSeries::new(vec![Bar::new(ts, 100.0, 101.0, 99.0, 100.0, 1.0)], 1).unwrap();
        let level = FlippedLevel {
            level: 100.0,
            resistance_tests: 3,
            resistance_touch_dates: vec![ts],
            last_resistance_date: ts,
            breakout_date: ts,
            support_test_date: None,
            support_bounce_pct: None,
            weeks_old: 0,
            strength: 3,
        };
        ScanResult {
            ticker: ticker.to_string(),
            current_price: 100.0,
            matched: Matched::Level(MatchedLevel { level: level.clone(), current_price: 100.0, distance_pct: 0.0 }),
            all_candidates: Candidates::Levels(vec![level]),
            series,
            indicators: Some(Indicators {
                rsi,
                rsi_signal: rsi.map(RsiSignal::classify),
                macd: 0.0,
                macd_signal: 0.0,
                macd_histogram: 0.0,
                macd_trend: trend,
                ma_50: 100.0,
                ma_200: None,
                above_ma50: false,
                above_ma200: None,
                current_volume: 1.0,
                avg_volume_20: 1.0,
                volume_ratio,
            }),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let seen = SeenTickers::load(dir.path().join("last_scan.json")).unwrap();
        assert!(seen.is_empty());
        assert_eq!(seen.timestamp, None);
    }

    #[test]
    fn test_record_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_scan.json");

        let mut seen = SeenTickers::default();
        seen.record(&[result("AAA", None, MacdTrend::Bearish, 1.0), result("BBB", None, MacdTrend::Bearish, 1.0)]);
        seen.save(&path).unwrap();

        let loaded = SeenTickers::load(&path).unwrap();
        assert_eq!(loaded, seen);
        assert!(loaded.contains("AAA"));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_loads_plain_ticker_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_scan.json");
        fs::write(&path, r#"{"tickers": ["MSFT", "AAPL"]}"#).unwrap();
        let seen = SeenTickers::load(&path).unwrap();
        assert!(seen.contains("MSFT"));
        assert_eq!(seen.timestamp, None);
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_scan.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(SeenTickers::load(&path), Err(PatternError::Persistence(_))));
    }

    #[test]
    fn test_new_results_keeps_order() {
        let mut seen = SeenTickers::default();
        seen.record(&[result("BBB", None, MacdTrend::Bearish, 1.0)]);

        let current = [
            result("CCC", None, MacdTrend::Bearish, 1.0),
            result("BBB", None, MacdTrend::Bearish, 1.0),
            result("AAA", None, MacdTrend::Bearish, 1.0),
        ];
        let fresh: Vec<_> = seen.new_results(&current).iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(fresh, vec!["CCC", "AAA"]);
    }

    #[test]
    fn test_price_alerts() {
        let results = [
            result("OVERSOLD", Some(25.0), MacdTrend::Bullish, 2.5),
            result("LOWRSI", Some(35.0), MacdTrend::Bullish, 1.0),
            result("BEARISH", Some(35.0), MacdTrend::Bearish, 2.0),
        ];
        let kinds: Vec<_> = detect_price_alerts(&results).iter().map(|a| (a.ticker.clone(), a.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("OVERSOLD".to_string(), AlertKind::StrongOversold),
                ("OVERSOLD".to_string(), AlertKind::BullishMacdLowRsi),
                ("OVERSOLD".to_string(), AlertKind::VolumeSpike),
                ("LOWRSI".to_string(), AlertKind::BullishMacdLowRsi),
            ]
        );
    }

    #[test]
    fn test_no_indicators_no_alerts() {
        let mut r = result("X", Some(10.0), MacdTrend::Bullish, 5.0);
        r.indicators = None;
        assert!(detect_price_alerts(&[r]).is_empty());
    }

    #[test]
    fn test_summary() {
        let results = [
            result("A", Some(20.0), MacdTrend::Bullish, 1.0),
            result("B", Some(60.0), MacdTrend::Bearish, 1.0),
            result("C", None, MacdTrend::Bullish, 1.0),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.avg_rsi, Some(40.0));
        assert_eq!(summary.oversold, 1);
        assert_eq!(summary.bullish_macd, 2);
        assert_eq!(summarize(&[]).avg_rsi, None);
    }
}
