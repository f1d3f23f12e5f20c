//! Per-ticker scan pipeline and batch orchestration
//!
//! `fetch -> preprocess -> detect -> match -> enrich`, one ticker at a time.
//! Detection itself is synchronous; only the data source boundary is async.
//!
//! Two batch entry points:
//!
//! - [`scan_parallel`] runs detection over series already in memory on the
//!   rayon pool.
//! - [`Scanner::scan_many`] fetches through a [`DataSource`] with a bounded
//!   number of tickers in flight, a per-attempt timeout and a retry budget.
//!
//! Per-ticker failures never abort a batch. They are collected in
//! [`ScanReport::skipped`] or counted, and the batch continues.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{FetchPolicy, ScanConfig},
    detectors::Candidates,
    indicators::{IndicatorProvider, Indicators, SimpleIndicators},
    proximity::{match_candidates, Matched},
    series::PriceSeries,
    Bar, PatternError, Result, OHLCV,
};

// ============================================================
// EXTERNAL INTERFACES
// ============================================================

/// Failure reported by a [`DataSource`] or [`TickerUniverse`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("no data returned")]
    NoData,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("source error: {0}")]
    Source(String),
}

/// Weekly bar provider
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Weekly bars covering roughly `lookback_years`, oldest first
    async fn fetch_weekly_series(
        &self,
        ticker: &str,
        lookback_years: u32,
    ) -> std::result::Result<Vec<Bar>, FetchError>;
}

/// Provider of the symbols to scan
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    async fn list_universe_tickers(&self) -> std::result::Result<Vec<String>, FetchError>;
}

// ============================================================
// RESULTS
// ============================================================

/// Ticker whose current price sits at a qualifying zone or level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub ticker: String,
    pub current_price: f64,
    pub matched: Matched,
    /// Every zone or level the detector found, matched or not
    pub all_candidates: Candidates,
    pub series: PriceSeries,
    pub indicators: Option<Indicators>,
}

/// Per-ticker failure that removed the ticker from the result set
#[derive(Debug, Clone, thiserror::Error)]
#[error("{ticker}: {error}")]
pub struct TickerError {
    pub ticker: String,
    pub error: PatternError,
}

/// Outcome of a batch scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Matches in input order
    pub results: Vec<ScanResult>,
    /// Tickers dropped because their data could not be used
    pub skipped: Vec<TickerError>,
    pub insufficient_history: usize,
    /// Tickers scanned successfully without a match
    pub no_match: usize,
    /// Tickers never started because the batch was cancelled
    pub cancelled: usize,
}

impl ScanReport {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    /// Tickers that ran to completion, matched or not
    pub fn scanned(&self) -> usize {
        self.results.len() + self.skipped.len() + self.insufficient_history + self.no_match
    }
}

/// Progress notification, sent once per finished ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub ticker: &'a str,
}

/// Cooperative cancellation flag shared between a batch and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================
// SINGLE SERIES
// ============================================================

/// Run the detection pipeline over already-fetched bars.
///
/// Returns `Ok(None)` when nothing was detected or the current price is not
/// at any candidate. [`PatternError::InsufficientHistory`] is returned as an
/// error so batch callers can count it; treat it as "no pattern".
pub fn scan_series(
    ticker: &str,
    bars: Vec<Bar>,
    config: &ScanConfig,
    indicators: Option<&dyn IndicatorProvider>,
) -> Result<Option<ScanResult>> {
    let series = PriceSeries::new(bars, config.min_data_points.get())?;

    let min_bars = config.pattern.min_bars(config);
    if series.len() < min_bars {
        debug!(ticker, bars = series.len(), min_bars, "too few bars for pattern");
        return Ok(None);
    }

    let candidates = config.pattern.detect(&series, config);
    if candidates.is_empty() {
        debug!(ticker, pattern = config.pattern.as_str(), "no candidates");
        return Ok(None);
    }

    let price = series.current_price();
    let Some(matched) = match_candidates(price, &candidates, &series, config) else {
        debug!(ticker, candidates = candidates.len(), price, "price not at any candidate");
        return Ok(None);
    };

    debug!(
        ticker,
        candidates = candidates.len(),
        price,
        distance_pct = matched.distance_pct(),
        "matched"
    );

    let indicators = indicators.and_then(|p| p.compute(&series));
    Ok(Some(ScanResult {
        ticker: ticker.to_string(),
        current_price: price,
        matched,
        all_candidates: candidates,
        series,
        indicators,
    }))
}

/// Parallel scanning of instruments already in memory.
///
/// Tickers with too little history are dropped silently; every other
/// failure is returned alongside the successes.
pub fn scan_parallel<'a, T, I>(
    config: &ScanConfig,
    instruments: I,
    indicators: Option<&dyn IndicatorProvider>,
) -> (Vec<ScanResult>, Vec<TickerError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let outcomes: Vec<_> = instruments
        .into_par_iter()
        .map(|(ticker, bars)| {
            let bars = bars.iter().map(Bar::from_ohlcv).collect();
            scan_series(ticker, bars, config, indicators).map_err(|error| TickerError {
                ticker: ticker.to_string(),
                error,
            })
        })
        .collect();

    let mut results = Vec::new();
    let mut errors = Vec::new();

    for outcome in outcomes {
        match outcome {
            Ok(Some(r)) => results.push(r),
            Ok(None) => {}
            Err(TickerError { error: PatternError::InsufficientHistory { .. }, .. }) => {}
            Err(e) => errors.push(e),
        }
    }

    (results, errors)
}

// ============================================================
// SCANNER
// ============================================================

/// Async scan driver over an external data source
pub struct Scanner {
    config: ScanConfig,
    source: Arc<dyn DataSource>,
    indicators: Option<Arc<dyn IndicatorProvider>>,
    fetch: FetchPolicy,
}

impl Scanner {
    /// Validates `config` up front; an invalid config never starts a scan.
    pub fn new(config: ScanConfig, source: Arc<dyn DataSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            indicators: Some(Arc::new(SimpleIndicators)),
            fetch: FetchPolicy::default(),
        })
    }

    /// Replace the indicator provider, or disable enrichment with None
    pub fn with_indicators(mut self, provider: Option<Arc<dyn IndicatorProvider>>) -> Self {
        self.indicators = provider;
        self
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch = policy;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn fetch_policy(&self) -> &FetchPolicy {
        &self.fetch
    }

    /// Fetch with a per-attempt timeout, retrying up to the policy budget
    async fn fetch(&self, ticker: &str) -> Result<Vec<Bar>> {
        let mut last_error = FetchError::NoData;

        for attempt in 1..=self.fetch.attempts() {
            if attempt > 1 {
                tokio::time::sleep(self.fetch.retry_delay).await;
            }

            let request = self.source.fetch_weekly_series(ticker, self.config.lookback_years);
            last_error = match tokio::time::timeout(self.fetch.timeout, request).await {
                Ok(Ok(bars)) if !bars.is_empty() => return Ok(bars),
                Ok(Ok(_)) => FetchError::NoData,
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout(self.fetch.timeout),
            };
            debug!(ticker, attempt, error = %last_error, "fetch attempt failed");
        }

        warn!(ticker, attempts = self.fetch.attempts(), error = %last_error, "giving up on ticker");
        Err(PatternError::DataUnavailable { ticker: ticker.to_string(), reason: last_error.to_string() })
    }

    async fn run(&self, ticker: &str) -> Result<Option<ScanResult>> {
        let bars = self.fetch(ticker).await?;
        scan_series(ticker, bars, &self.config, self.indicators.as_deref())
    }

    /// Scan a single ticker. Insufficient history is reported as no match.
    pub async fn scan_one(&self, ticker: &str) -> Result<Option<ScanResult>> {
        match self.run(ticker).await {
            Err(PatternError::InsufficientHistory { need, got }) => {
                debug!(ticker, need, got, "insufficient history");
                Ok(None)
            }
            other => other,
        }
    }

    /// Scan `tickers` with at most `concurrency` in flight.
    ///
    /// Results keep input order. `cancel` is checked before each ticker
    /// starts; tickers already in flight finish normally.
    pub async fn scan_many<S, F>(
        &self,
        tickers: &[S],
        concurrency: usize,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> ScanReport
    where
        S: AsRef<str>,
        F: FnMut(Progress<'_>),
    {
        let total = tickers.len();
        info!(total, concurrency, pattern = self.config.pattern.as_str(), "scan started");

        let mut outcomes = stream::iter(tickers.iter().map(AsRef::<str>::as_ref))
            .map(|ticker| async move {
                if cancel.is_cancelled() {
                    return (ticker, None);
                }
                (ticker, Some(self.run(ticker).await))
            })
            .buffered(concurrency.max(1));

        let mut report = ScanReport::default();
        let mut completed = 0;

        while let Some((ticker, outcome)) = outcomes.next().await {
            let Some(outcome) = outcome else {
                report.cancelled += 1;
                continue;
            };

            match outcome {
                Ok(Some(result)) => report.results.push(result),
                Ok(None) => report.no_match += 1,
                Err(PatternError::InsufficientHistory { .. }) => report.insufficient_history += 1,
                Err(error) => {
                    warn!(ticker, %error, "ticker skipped");
                    report.skipped.push(TickerError { ticker: ticker.to_string(), error });
                }
            }

            completed += 1;
            on_progress(Progress { completed, total, ticker });
        }

        info!(
            matched = report.results.len(),
            skipped = report.skipped.len(),
            insufficient_history = report.insufficient_history,
            no_match = report.no_match,
            cancelled = report.cancelled,
            "scan finished"
        );
        report
    }

    /// List the universe, then scan it.
    ///
    /// Fails with [`PatternError::UniverseUnavailable`] when the list cannot
    /// be obtained or is empty. A scan with zero matches is still `Ok`.
    pub async fn scan_universe<F>(
        &self,
        universe: &dyn TickerUniverse,
        concurrency: usize,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(Progress<'_>),
    {
        let tickers = universe
            .list_universe_tickers()
            .await
            .map_err(|e| PatternError::UniverseUnavailable(e.to_string()))?;
        if tickers.is_empty() {
            return Err(PatternError::UniverseUnavailable("empty ticker list".to_string()));
        }

        Ok(self.scan_many(&tickers, concurrency, cancel, on_progress).await)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("fetch", &self.fetch)
            .field("indicators", &self.indicators.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::PatternKind;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar::new(start + ChronoDuration::weeks(i as i64), base, base + 4.0, base - 4.0, base, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_short_series_is_insufficient_history() {
        let err = scan_series("X", bars(5), &ScanConfig::default(), None).unwrap_err();
        assert!(matches!(err, PatternError::InsufficientHistory { need: 20, got: 5 }));
        assert!(err.is_per_ticker());
    }

    #[test]
    fn test_no_candidates_is_none() {
        let config = ScanConfig::default().with_pattern(PatternKind::ResistanceFlip);
        assert!(scan_series("X", bars(30), &config, None).unwrap().is_none());
    }

    #[test]
    fn test_series_shorter_than_pattern_window_is_none() {
        let config = ScanConfig {
            swing_order: crate::Period::new_const(10),
            ..ScanConfig::default().with_pattern(PatternKind::ResistanceFlip)
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.pattern.min_bars(&config), 26);

        // enough for min_data_points, too short for the swing window
        assert!(scan_series("X", bars(24), &config, None).unwrap().is_none());
    }

    #[test]
    fn test_parallel_separates_errors() {
        let good = bars(30);
        let short = bars(3);
        let mut bad = bars(30);
        bad[4].low = -1.0;

        let instruments: Vec<(&str, &[Bar])> =
            vec![("GOOD", &good[..]), ("SHORT", &short[..]), ("BAD", &bad[..])];
        let (results, errors) = scan_parallel(&ScanConfig::default(), instruments, None);

        assert!(results.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].ticker, "BAD");
        assert!(matches!(errors[0].error, PatternError::InvalidBar { index: 4, .. }));
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_report_counts() {
        let report = ScanReport { no_match: 2, insufficient_history: 1, ..ScanReport::default() };
        assert_eq!(report.scanned(), 3);
        assert!(!report.was_cancelled());
    }
}
