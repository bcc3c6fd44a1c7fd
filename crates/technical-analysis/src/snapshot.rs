use analysis_core::{indicator_keys as keys, AnalysisError, Bar, IndicatorVector};
use chrono::Datelike;

use crate::indicators::*;

pub const SMA_SHORT: usize = 50;
pub const SMA_LONG: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 5;
pub const BB_STD_DEV: f64 = 2.0;
pub const WEEKLY_EMA_SPAN: usize = 200;

pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Indicator state as of the last bar.
    ///
    /// Bars must be in chronological order. Indicators whose lookback is
    /// longer than the history are left out of the vector.
    pub fn snapshot(&self, bars: &[Bar]) -> Result<IndicatorVector, AnalysisError> {
        let last = bars.last().ok_or_else(|| {
            AnalysisError::InsufficientData("No price history to analyze".to_string())
        })?;

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let mut vector = IndicatorVector::new(Some(last.timestamp))
            .with(keys::OPEN, last.open)
            .with(keys::HIGH, last.high)
            .with(keys::LOW, last.low)
            .with(keys::CLOSE, last.close)
            .with(keys::VOLUME, last.volume);

        vector.insert_opt(keys::SMA_50, sma(&closes, SMA_SHORT).last().copied());
        vector.insert_opt(keys::SMA_200, sma(&closes, SMA_LONG).last().copied());
        vector.insert_opt(keys::RSI_14, rsi(&closes, RSI_PERIOD).last().copied());

        let macd_result = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        vector.insert_opt(keys::MACD, macd_result.macd_line.last().copied());
        vector.insert_opt(keys::MACD_HISTOGRAM, macd_result.histogram.last().copied());
        vector.insert_opt(keys::MACD_SIGNAL, macd_result.signal_line.last().copied());

        let bb = bollinger_bands(&closes, BB_PERIOD, BB_STD_DEV);
        vector.insert_opt(keys::BB_LOWER, bb.lower.last().copied());
        vector.insert_opt(keys::BB_MIDDLE, bb.middle.last().copied());
        vector.insert_opt(keys::BB_UPPER, bb.upper.last().copied());

        let weekly = weekly_closes(bars);
        vector.insert_opt(keys::EMA_200_WEEK, ewm(&weekly, WEEKLY_EMA_SPAN).last().copied());

        tracing::debug!(
            "Computed {} indicators from {} bars",
            vector.len(),
            bars.len()
        );

        Ok(vector)
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Last close of each ISO week, in order. The current partial week counts.
pub fn weekly_closes(bars: &[Bar]) -> Vec<f64> {
    let mut closes: Vec<f64> = Vec::new();
    let mut current_week = None;

    for bar in bars {
        let iso = bar.timestamp.iso_week();
        let week = (iso.year(), iso.week());
        if current_week == Some(week) {
            if let Some(last) = closes.last_mut() {
                *last = bar.close;
            }
        } else {
            closes.push(bar.close);
            current_week = Some(week);
        }
    }

    closes
}
