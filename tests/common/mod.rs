//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use zonescan::prelude::*;

/// Minimal bar type supplied by a caller, converted through `OHLCV`
#[derive(Debug, Clone, Copy)]
pub struct TestBar {
    pub t: DateTime<Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
}

impl OHLCV for TestBar {
    fn timestamp(&self) -> DateTime<Utc> {
        self.t
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

pub fn week(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap() + Duration::weeks(i as i64)
}

/// Bars from (high, low, close) triples, open = close
pub fn bars_hlc(specs: &[(f64, f64, f64)]) -> Vec<Bar> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(h, l, c))| Bar::new(week(i), c, h, l, c, 1000.0))
        .collect()
}

/// Five tight weeks (range < 5%, high 102) followed by wide weeks and a 12%
/// rally at bar 14. Closes at 103.
pub fn demand_zone_bars() -> Vec<Bar> {
    let mut specs = vec![(102.0, 100.0, 101.0); 5];
    specs.extend(std::iter::repeat((106.0, 100.0, 103.0)).take(15));
    specs[14] = (102.0 * 1.12, 105.0, 110.0);
    bars_hlc(&specs)
}

/// Wide weeks only, never consolidating
pub fn wide_bars(n: usize) -> Vec<Bar> {
    bars_hlc(&vec![(106.0, 100.0, 103.0); n])
}

/// Three swing highs averaging 100 (indices 3, 10, 17), a breakout close of
/// 103 at bar 21 and a support test (low 101, close 102) at bar 23.
pub fn resistance_flip_bars() -> Vec<Bar> {
    const BASE: (f64, f64, f64) = (95.0, 90.0, 93.0);
    let mut specs = vec![BASE; 21];
    specs[3] = (99.0, 92.0, 94.0);
    specs[10] = (100.0, 92.0, 94.0);
    specs[17] = (101.0, 92.0, 94.0);
    specs.extend([
        (104.0, 97.0, 103.0),  // 21: breakout
        (106.0, 103.5, 105.0), // 22: stays above the touch ceiling
        (103.5, 101.0, 102.0), // 23: support test
        (104.0, 103.5, 103.8),
        (106.0, 104.0, 105.0),
        (108.0, 105.0, 107.0),
        (107.0, 104.0, 105.0),
        (105.0, 103.5, 104.0),
        (105.0, 103.5, 104.0),
        (105.0, 103.5, 104.0),
        (105.0, 103.5, 104.0),
    ]);
    bars_hlc(&specs)
}
