use analysis_core::{
    FundamentalMetrics, IndicatorVector, ScoreBreakdown, ScoreResult, ScoreVerdict,
    ScreenerRecord,
};

use crate::signals::{self, Scorecard};

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rule-based 1-10 scorer combining five technical and six fundamental signals.
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score one symbol.
    ///
    /// Scraped Screener values take priority over provider metrics for every
    /// fundamental signal. Technical reasons come first, then fundamental ones,
    /// each in signal order.
    pub fn score(
        &self,
        technicals: &IndicatorVector,
        metrics: &FundamentalMetrics,
        screener: Option<&ScreenerRecord>,
    ) -> ScoreResult {
        let mut technical = Scorecard::default();
        signals::rsi(technicals, &mut technical);
        signals::macd(technicals, &mut technical);
        signals::moving_averages(technicals, &mut technical);
        signals::long_term_ema(technicals, &mut technical);
        signals::bollinger(technicals, &mut technical);

        let mut fundamental = Scorecard::default();
        signals::pe_ratio(screener, metrics, &mut fundamental);
        signals::market_cap(screener, metrics, &mut fundamental);
        signals::dividend_yield(screener, metrics, &mut fundamental);
        signals::return_quality(screener, metrics, &mut fundamental);
        signals::sales_growth(screener, metrics, &mut fundamental);
        signals::debt_to_equity(screener, metrics, &mut fundamental);

        let total = technical.points + fundamental.points;
        let score = total.clamp(MIN_SCORE, MAX_SCORE);
        let verdict = ScoreVerdict::from_score(score);

        tracing::info!(
            "Score {:.2} ({}): technical {:.2}, fundamental {:.2}",
            score,
            verdict,
            technical.points,
            fundamental.points
        );

        let mut reasons = technical.reasons;
        reasons.extend(fundamental.reasons);

        ScoreResult {
            score: round2(score),
            verdict,
            technical_score: round2(technical.points),
            fundamental_score: round2(fundamental.points),
            reasons,
            breakdown: ScoreBreakdown::default(),
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}
