//! The eleven scored signals.
//!
//! Each function reads its inputs, adds its points to a [`Scorecard`] and
//! records at most the reasons its ladder defines. A signal whose inputs are
//! missing leaves the scorecard untouched.

use analysis_core::{
    indicator_keys as keys, FundamentalMetrics, IndicatorVector, Reason, ScreenerRecord,
    Severity, Signal,
};

use crate::sourced::{
    ReturnQuality, Source, DEBT_TO_EQUITY, DIVIDEND_YIELD, MARKET_CAP, PE_RATIO, RETURN_QUALITY,
    SALES_GROWTH,
};

/// Running sub-score plus the reasons behind it.
#[derive(Debug, Default)]
pub struct Scorecard {
    pub points: f64,
    pub reasons: Vec<Reason>,
}

impl Scorecard {
    fn add(&mut self, points: f64, signal: Signal, severity: Severity, text: impl Into<String>) {
        self.points += points;
        self.reasons.push(Reason::new(signal, severity, text));
    }
}

/// A zero reading counts as no reading.
fn present(technicals: &IndicatorVector, key: &str) -> Option<f64> {
    technicals.get(key).filter(|v| *v != 0.0)
}

pub fn rsi(technicals: &IndicatorVector, card: &mut Scorecard) {
    let Some(rsi) = present(technicals, keys::RSI_14) else {
        return;
    };
    let s = Signal::Rsi;

    if (30.0..=50.0).contains(&rsi) {
        card.add(1.0, s, Severity::Positive, "RSI is in optimal buying zone (30-50)");
    } else if rsi > 50.0 && rsi <= 60.0 {
        card.add(0.7, s, Severity::Positive, "RSI indicates slightly bullish momentum");
    } else if rsi > 60.0 && rsi <= 70.0 {
        card.add(0.3, s, Severity::Caution, "RSI is approaching overbought levels");
    } else if rsi < 30.0 {
        card.add(0.5, s, Severity::Caution, "RSI is very oversold (<30), potential rebound");
    } else {
        card.add(0.0, s, Severity::Negative, "RSI indicates overbought conditions (>70)");
    }
}

pub fn macd(technicals: &IndicatorVector, card: &mut Scorecard) {
    let (Some(macd), Some(signal)) = (
        technicals.get(keys::MACD),
        technicals.get(keys::MACD_SIGNAL),
    ) else {
        return;
    };
    let s = Signal::Macd;

    if macd > signal {
        card.add(1.0, s, Severity::Positive, "MACD is above signal line (Bullish Crossover)");
    } else if macd > signal * 0.95 {
        card.add(0.5, s, Severity::Caution, "MACD is close to crossover");
    } else {
        card.add(0.0, s, Severity::Negative, "MACD is below signal line (Bearish)");
    }
}

pub fn moving_averages(technicals: &IndicatorVector, card: &mut Scorecard) {
    let (Some(close), Some(sma_50), Some(sma_200)) = (
        present(technicals, keys::CLOSE),
        present(technicals, keys::SMA_50),
        present(technicals, keys::SMA_200),
    ) else {
        return;
    };
    let s = Signal::MovingAverages;

    if sma_50 > sma_200 {
        card.add(0.5, s, Severity::Positive, "Golden Cross active (50 SMA > 200 SMA)");
    } else {
        card.add(0.0, s, Severity::Negative, "Death Cross active (50 SMA < 200 SMA)");
    }

    if close > sma_50 {
        card.add(0.5, s, Severity::Positive, "Price is above 50-day SMA");
    } else {
        card.add(0.0, s, Severity::Negative, "Price is below 50-day SMA");
    }

    if close > sma_200 {
        card.add(0.25, s, Severity::Positive, "Price is above 200-day SMA");
    } else {
        card.add(0.0, s, Severity::Negative, "Price is below 200-day SMA");
    }
}

pub fn long_term_ema(technicals: &IndicatorVector, card: &mut Scorecard) {
    let (Some(close), Some(ema)) = (
        present(technicals, keys::CLOSE),
        present(technicals, keys::EMA_200_WEEK),
    ) else {
        return;
    };
    let s = Signal::LongTermEma;

    if close > ema {
        card.add(0.5, s, Severity::Positive, "Price is above long-term 200-week EMA");
    } else if close > ema * 0.95 {
        card.add(0.25, s, Severity::Caution, "Price is near long-term 200-week EMA support");
    } else {
        card.add(0.0, s, Severity::Negative, "Price is below long-term 200-week EMA");
    }
}

/// Relative position of `close` inside the band; 0.5 when the band has no width.
pub fn band_position(close: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width == 0.0 {
        0.5
    } else {
        (close - lower) / width
    }
}

pub fn bollinger(technicals: &IndicatorVector, card: &mut Scorecard) {
    let (Some(close), Some(lower), Some(upper)) = (
        present(technicals, keys::CLOSE),
        present(technicals, keys::BB_LOWER),
        present(technicals, keys::BB_UPPER),
    ) else {
        return;
    };
    let s = Signal::BollingerBands;
    let position = band_position(close, lower, upper);

    if (0.2..=0.5).contains(&position) {
        card.add(
            1.0,
            s,
            Severity::Positive,
            "Price is in lower Bollinger Band zone (Potential Buy)",
        );
    } else if position > 0.5 && position <= 0.7 {
        card.add(0.5, s, Severity::Caution, "Price is in middle Bollinger Band zone");
    } else if position > 0.8 {
        card.add(
            0.0,
            s,
            Severity::Negative,
            "Price is near upper Bollinger Band (Potential Resistance)",
        );
    }
}

pub fn pe_ratio(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(pe) = PE_RATIO
        .resolve(screener, metrics)
        .map(|r| r.value)
        .filter(|v| *v != 0.0)
    else {
        return;
    };
    let s = Signal::PeRatio;

    if (10.0..=25.0).contains(&pe) {
        card.add(1.0, s, Severity::Positive, format!("P/E Ratio is attractive ({:.1})", pe));
    } else if pe > 25.0 && pe <= 35.0 {
        card.add(0.5, s, Severity::Caution, format!("P/E Ratio is slightly elevated ({:.1})", pe));
    } else if pe < 10.0 {
        card.add(0.7, s, Severity::Positive, format!("P/E Ratio is very low ({:.1})", pe));
    } else {
        card.add(0.0, s, Severity::Negative, format!("P/E Ratio is high ({:.1})", pe));
    }
}

pub fn market_cap(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(resolved) = MARKET_CAP.resolve(screener, metrics) else {
        return;
    };
    let s = Signal::MarketCap;
    let cap = resolved.value;

    match resolved.source {
        Source::Screener => {
            if cap > 100_000.0 {
                card.add(0.5, s, Severity::Positive, "Large Cap company (>1L Cr) - High Stability");
            } else if cap > 10_000.0 {
                card.add(
                    0.3,
                    s,
                    Severity::Positive,
                    "Mid Cap company (>10k Cr) - Moderate Stability",
                );
            }
        }
        Source::Provider => {
            if cap > 100e9 {
                card.add(0.5, s, Severity::Positive, "Large Cap company (>100B) - High Stability");
            } else if cap > 10e9 {
                card.add(0.3, s, Severity::Positive, "Mid Cap company (>10B) - Moderate Stability");
            }
        }
    }
}

pub fn dividend_yield(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(dy) = DIVIDEND_YIELD
        .resolve(screener, metrics)
        .map(|r| r.value)
        .filter(|v| *v != 0.0)
    else {
        return;
    };
    let s = Signal::DividendYield;

    if dy > 2.0 {
        card.add(0.5, s, Severity::Positive, format!("Good Dividend Yield ({:.2}%)", dy));
    } else if dy > 1.0 {
        card.add(0.25, s, Severity::Positive, format!("Moderate Dividend Yield ({:.2}%)", dy));
    }
}

pub fn return_quality(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(resolved) = RETURN_QUALITY.resolve(screener, metrics) else {
        return;
    };
    let s = Signal::ReturnRatios;

    match resolved.value {
        ReturnQuality::Ratios { roce, roe } => {
            let detail = format!("(ROCE: {}%, ROE: {}%)", roce, roe);
            if roce > 20.0 && roe > 20.0 {
                card.add(1.0, s, Severity::Positive, format!("Excellent Return Ratios {}", detail));
            } else if roce > 15.0 && roe > 15.0 {
                card.add(0.7, s, Severity::Positive, format!("Healthy Return Ratios {}", detail));
            } else if roce < 10.0 || roe < 10.0 {
                card.add(0.0, s, Severity::Caution, format!("Low Return Ratios {}", detail));
            }
        }
        ReturnQuality::ProfitMargin(margin) => {
            if margin > 0.15 {
                card.add(1.0, s, Severity::Positive, "Strong Profit Margins (>15%)");
            } else if margin > 0.10 {
                card.add(0.7, s, Severity::Positive, "Healthy Profit Margins (>10%)");
            } else if margin > 0.05 {
                card.add(0.4, s, Severity::Caution, "Low Profit Margins (5-10%)");
            } else {
                card.add(0.0, s, Severity::Negative, "Very Low Profit Margins (<5%)");
            }
        }
    }
}

pub fn sales_growth(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(resolved) = SALES_GROWTH.resolve(screener, metrics) else {
        return;
    };
    let s = Signal::SalesGrowth;
    let growth = resolved.value;

    match resolved.source {
        Source::Screener => {
            if growth > 20.0 {
                card.add(
                    1.0,
                    s,
                    Severity::Positive,
                    format!("Excellent Sales Growth ({}%)", growth),
                );
            } else if growth > 10.0 {
                card.add(0.7, s, Severity::Positive, format!("Good Sales Growth ({}%)", growth));
            } else if growth > 5.0 {
                card.add(0.4, s, Severity::Caution, format!("Slow Sales Growth ({}%)", growth));
            } else if growth < 0.0 {
                card.add(
                    -0.5,
                    s,
                    Severity::Negative,
                    format!("Negative Sales Growth ({}%)", growth),
                );
            }
        }
        Source::Provider => {
            if growth > 0.20 {
                card.add(1.0, s, Severity::Positive, "Excellent Revenue Growth (>20%)");
            } else if growth > 0.10 {
                card.add(0.7, s, Severity::Positive, "Good Revenue Growth (>10%)");
            } else if growth > 0.05 {
                card.add(0.4, s, Severity::Caution, "Slow Revenue Growth (5-10%)");
            } else if growth < 0.0 {
                card.add(-0.5, s, Severity::Negative, "Negative Revenue Growth");
            }
        }
    }
}

pub fn debt_to_equity(
    screener: Option<&ScreenerRecord>,
    metrics: &FundamentalMetrics,
    card: &mut Scorecard,
) {
    let Some(d2e) = DEBT_TO_EQUITY.resolve(screener, metrics).map(|r| r.value) else {
        return;
    };
    let s = Signal::DebtToEquity;

    if d2e < 0.5 {
        card.add(1.0, s, Severity::Positive, format!("Low Debt to Equity ({:.2})", d2e));
    } else if d2e < 1.0 {
        card.add(0.6, s, Severity::Positive, format!("Moderate Debt to Equity ({:.2})", d2e));
    } else if d2e < 2.0 {
        card.add(0.3, s, Severity::Caution, format!("High Debt to Equity ({:.2})", d2e));
    } else {
        card.add(0.0, s, Severity::Negative, format!("Very High Debt ({:.2})", d2e));
    }
}
