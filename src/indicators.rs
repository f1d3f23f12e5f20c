//! Supplementary indicators attached to scan results
//!
//! Purely informational: detection and proximity matching never read these
//! values. Only the alerting layer consumes them.

use serde::{Deserialize, Serialize};

use crate::series::PriceSeries;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const MA_SHORT: usize = 50;
pub const MA_LONG: usize = 200;
pub const VOLUME_WINDOW: usize = 20;

/// Bars required before any indicator is reported
pub const MIN_INDICATOR_BARS: usize = MA_SHORT;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiSignal {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiSignal {
    pub fn classify(rsi: f64) -> Self {
        if rsi < RSI_OVERSOLD {
            RsiSignal::Oversold
        } else if rsi > RSI_OVERBOUGHT {
            RsiSignal::Overbought
        } else {
            RsiSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacdTrend {
    Bullish,
    Bearish,
}

/// Latest indicator readings for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// None when the window had neither gains nor losses
    pub rsi: Option<f64>,
    pub rsi_signal: Option<RsiSignal>,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub macd_trend: MacdTrend,
    pub ma_50: f64,
    /// Only with at least 200 bars
    pub ma_200: Option<f64>,
    pub above_ma50: bool,
    pub above_ma200: Option<bool>,
    pub current_volume: f64,
    pub avg_volume_20: f64,
    /// 1.0 when the average volume is zero
    pub volume_ratio: f64,
}

/// Computes supplementary indicators for a validated series
pub trait IndicatorProvider: Send + Sync {
    /// None when the series is too short
    fn compute(&self, series: &PriceSeries) -> Option<Indicators>;
}

/// Rolling-mean RSI, first-value-seeded EMA MACD, simple moving averages
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleIndicators;

impl IndicatorProvider for SimpleIndicators {
    fn compute(&self, series: &PriceSeries) -> Option<Indicators> {
        if series.len() < MIN_INDICATOR_BARS {
            return None;
        }

        let closes = series.closes();
        let volumes = series.volumes();
        let price = series.current_price();

        let rsi = rsi(&closes, RSI_PERIOD);

        let fast = ema(&closes, MACD_FAST);
        let slow = ema(&closes, MACD_SLOW);
        let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal_line = ema(&macd_line, MACD_SIGNAL);
        let macd = *macd_line.last()?;
        let macd_signal = *signal_line.last()?;

        let ma_50 = sma_last(&closes, MA_SHORT)?;
        let ma_200 = sma_last(&closes, MA_LONG);

        let current_volume = *volumes.last()?;
        let avg_volume_20 = sma_last(&volumes, VOLUME_WINDOW)?;
        let volume_ratio = if avg_volume_20 > 0.0 { current_volume / avg_volume_20 } else { 1.0 };

        Some(Indicators {
            rsi,
            rsi_signal: rsi.map(RsiSignal::classify),
            macd,
            macd_signal,
            macd_histogram: macd - macd_signal,
            macd_trend: if macd > macd_signal { MacdTrend::Bullish } else { MacdTrend::Bearish },
            ma_50,
            ma_200,
            above_ma50: price > ma_50,
            above_ma200: ma_200.map(|ma| price > ma),
            current_volume,
            avg_volume_20,
            volume_ratio,
        })
    }
}

// ============================================================
// SERIES MATH
// ============================================================

/// EMA with `alpha = 2 / (span + 1)`, seeded with the first value
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Mean of the last `period` values, None if there are fewer
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// RSI from simple means of the last `period` gains and losses
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let deltas = closes[closes.len() - period - 1..].windows(2).map(|w| w[1] - w[0]);
    let (gain, loss) = deltas.fold((0.0, 0.0), |(g, l), d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });
    let (gain, loss) = (gain / period as f64, loss / period as f64);

    match (gain > 0.0, loss > 0.0) {
        (false, false) => None,
        (_, false) => Some(100.0),
        _ => Some(100.0 - 100.0 / (1.0 + gain / loss)),
    }
}
