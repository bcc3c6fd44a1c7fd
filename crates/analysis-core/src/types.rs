use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Flat key/value record as returned by the market-data provider
/// (e.g. `trailingPE`, `marketCap`, `debtToEquity`).
pub type ProviderInfo = serde_json::Map<String, serde_json::Value>;

/// Everything the market-data provider returns for one symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    pub history: Vec<Bar>,
    pub info: ProviderInfo,
}

/// History range requested from the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "5d")]
    Day5,
    #[serde(rename = "1mo")]
    Month1,
    #[serde(rename = "3mo")]
    Month3,
    #[serde(rename = "6mo")]
    Month6,
    #[serde(rename = "1y")]
    Year1,
    #[serde(rename = "2y")]
    Year2,
    #[serde(rename = "5y")]
    Year5,
    #[serde(rename = "10y")]
    Year10,
    #[serde(rename = "ytd")]
    Ytd,
    #[default]
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day1 => "1d",
            Period::Day5 => "5d",
            Period::Month1 => "1mo",
            Period::Month3 => "3mo",
            Period::Month6 => "6mo",
            Period::Year1 => "1y",
            Period::Year2 => "2y",
            Period::Year5 => "5y",
            Period::Year10 => "10y",
            Period::Ytd => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Period::Day1),
            "5d" => Ok(Period::Day5),
            "1mo" => Ok(Period::Month1),
            "3mo" => Ok(Period::Month3),
            "6mo" => Ok(Period::Month6),
            "1y" => Ok(Period::Year1),
            "2y" => Ok(Period::Year2),
            "5y" => Ok(Period::Year5),
            "10y" => Ok(Period::Year10),
            "ytd" => Ok(Period::Ytd),
            "max" => Ok(Period::Max),
            other => Err(AnalysisError::InvalidData(format!("Unknown period: {}", other))),
        }
    }
}

/// Indicator names produced by the technical-analysis crate.
///
/// Naming follows `INDICATOR_params`, e.g. `BBL_5_2.0` is the lower Bollinger
/// band with length 5 and width multiplier 2.0.
pub mod indicator_keys {
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const CLOSE: &str = "Close";
    pub const VOLUME: &str = "Volume";
    pub const RSI_14: &str = "RSI_14";
    pub const MACD: &str = "MACD_12_26_9";
    pub const MACD_HISTOGRAM: &str = "MACDh_12_26_9";
    pub const MACD_SIGNAL: &str = "MACDs_12_26_9";
    pub const SMA_50: &str = "SMA_50";
    pub const SMA_200: &str = "SMA_200";
    pub const EMA_200_WEEK: &str = "EMA_200_Week";
    pub const BB_LOWER: &str = "BBL_5_2.0";
    pub const BB_MIDDLE: &str = "BBM_5_2.0";
    pub const BB_UPPER: &str = "BBU_5_2.0";
}

/// Latest snapshot of technical state. A missing key means the indicator
/// could not be computed; it is never replaced by zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorVector {
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(flatten)]
    values: BTreeMap<String, f64>,
}

impl IndicatorVector {
    pub fn new(as_of: Option<DateTime<Utc>>) -> Self {
        Self {
            as_of,
            values: BTreeMap::new(),
        }
    }

    /// Record an indicator value. Non-finite values are dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.values.insert(name.into(), value);
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Record an indicator only when it was computed.
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<f64>) {
        if let Some(v) = value {
            self.insert(name, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub roe: Option<f64>,
    pub roce: Option<f64>,
    pub profit_margin: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialHealth {
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
}

/// Canonical fundamentals from the market-data provider. Ratios keep the
/// provider's units (fractions for yields, margins and growth).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalMetrics {
    pub valuation: Valuation,
    pub performance: Performance,
    pub financial_health: FinancialHealth,
    pub growth: Growth,
}

impl FundamentalMetrics {
    pub fn is_empty(&self) -> bool {
        self == &FundamentalMetrics::default()
    }
}

/// Which Screener page variant to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenerVariant {
    Consolidated,
    Standalone,
}

/// Where a [`ScreenerRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScreenerSourceTag {
    Consolidated,
    Standalone,
    #[default]
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl From<ScreenerVariant> for ScreenerSourceTag {
    fn from(variant: ScreenerVariant) -> Self {
        match variant {
            ScreenerVariant::Consolidated => ScreenerSourceTag::Consolidated,
            ScreenerVariant::Standalone => ScreenerSourceTag::Standalone,
        }
    }
}

/// Quarterly shareholding table. Every row in `data` holds one value per
/// entry in `quarters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareholdingPattern {
    pub quarters: Vec<String>,
    pub data: BTreeMap<String, Vec<String>>,
}

impl ShareholdingPattern {
    /// Build a pattern, dropping rows whose length does not match the quarter header.
    pub fn aligned(
        quarters: Vec<String>,
        rows: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Self {
        let mut data = BTreeMap::new();
        for (category, values) in rows {
            if values.len() == quarters.len() {
                data.insert(category, values);
            } else {
                tracing::warn!(
                    "Dropping shareholding row '{}': {} values for {} quarters",
                    category,
                    values.len(),
                    quarters.len()
                );
            }
        }
        Self { quarters, data }
    }
}

/// Semi-structured record scraped from the secondary (Screener) source.
/// Values are raw page text and go through the normalizer before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRecord {
    #[serde(default)]
    pub top_ratios: BTreeMap<String, String>,
    #[serde(default)]
    pub compounded_sales_growth: BTreeMap<String, String>,
    #[serde(default)]
    pub compounded_profit_growth: BTreeMap<String, String>,
    #[serde(default)]
    pub stock_price_cagr: BTreeMap<String, String>,
    #[serde(default)]
    pub return_on_equity: BTreeMap<String, String>,
    #[serde(default)]
    pub shareholding_pattern: Option<ShareholdingPattern>,
    #[serde(default)]
    pub source: ScreenerSourceTag,
}

impl ScreenerRecord {
    /// Record returned when neither page variant produced anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn top_ratio(&self, name: &str) -> Option<&str> {
        self.top_ratios.get(name).map(String::as_str)
    }

    /// True if at least one value on the page is something other than a placeholder.
    pub fn has_meaningful_data(&self) -> bool {
        let tables = [
            &self.top_ratios,
            &self.compounded_sales_growth,
            &self.compounded_profit_growth,
            &self.stock_price_cagr,
            &self.return_on_equity,
        ];
        let in_tables = tables
            .iter()
            .any(|table| table.values().any(|v| !is_placeholder(v)));
        let in_shareholding = self
            .shareholding_pattern
            .as_ref()
            .map_or(false, |p| p.data.values().flatten().any(|v| !is_placeholder(v)));
        in_tables || in_shareholding
    }
}

/// Text Screener uses when a cell has no value.
pub fn is_placeholder(value: &str) -> bool {
    matches!(value.trim(), "" | "N/A" | "-" | "%")
}

/// Status of the concall-presentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcallStatus {
    Success,
    NotFound,
    DownloadFailed,
    Error,
}

/// Narrative summary of the latest earnings call / investor presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcallAnalysis {
    pub status: ConcallStatus,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConcallAnalysis {
    pub fn success(summary: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            status: ConcallStatus::Success,
            summary: summary.into(),
            source: Some(source.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: ConcallStatus::Error,
            summary: format!("Failed to analyze concall presentation: {}", error),
            source: None,
            error: Some(error),
        }
    }
}

/// Severity attached to every scoring reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Positive,
    Caution,
    Negative,
}

impl Severity {
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Positive => "✅",
            Severity::Caution => "⚠️",
            Severity::Negative => "❌",
        }
    }
}

/// The eleven scored signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Rsi,
    Macd,
    MovingAverages,
    LongTermEma,
    BollingerBands,
    PeRatio,
    MarketCap,
    DividendYield,
    ReturnRatios,
    SalesGrowth,
    DebtToEquity,
}

impl Signal {
    pub fn is_technical(&self) -> bool {
        matches!(
            self,
            Signal::Rsi
                | Signal::Macd
                | Signal::MovingAverages
                | Signal::LongTermEma
                | Signal::BollingerBands
        )
    }
}

/// One line of scoring rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub signal: Signal,
    pub severity: Severity,
    pub text: String,
}

impl Reason {
    pub fn new(signal: Signal, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            signal,
            severity,
            text: text.into(),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.marker(), self.text)
    }
}

/// Verdict derived from the clamped rule-based score.
///
/// Distinct from the advisory (LLM) vocabulary, which uses
/// Must Buy / Buy / Hold / Sell / Avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreVerdict {
    #[serde(rename = "Must Buy")]
    MustBuy,
    #[serde(rename = "Should Buy")]
    ShouldBuy,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Not a Buy")]
    NotABuy,
}

impl ScoreVerdict {
    /// Tier for a score already clamped to [1, 10]. First match wins, high to low.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 9.0 => ScoreVerdict::MustBuy,
            s if s >= 7.0 => ScoreVerdict::ShouldBuy,
            s if s >= 6.0 => ScoreVerdict::Buy,
            s if s >= 3.0 => ScoreVerdict::Neutral,
            _ => ScoreVerdict::NotABuy,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            ScoreVerdict::MustBuy => "Must Buy",
            ScoreVerdict::ShouldBuy => "Should Buy",
            ScoreVerdict::Buy => "Buy",
            ScoreVerdict::Neutral => "Neutral",
            ScoreVerdict::NotABuy => "Not a Buy",
        }
    }
}

impl fmt::Display for ScoreVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub technical_max: f64,
    pub fundamental_max: f64,
    pub total_max: f64,
}

impl Default for ScoreBreakdown {
    fn default() -> Self {
        Self {
            technical_max: 5.0,
            fundamental_max: 5.0,
            total_max: 10.0,
        }
    }
}

/// Output of the rule-based scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub verdict: ScoreVerdict,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub reasons: Vec<Reason>,
    pub breakdown: ScoreBreakdown,
}

/// Reasons split by severity, in their original order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedReasons {
    pub strengths: Vec<Reason>,
    pub cautions: Vec<Reason>,
    pub weaknesses: Vec<Reason>,
}

impl ScoreResult {
    pub fn grouped(&self) -> GroupedReasons {
        let mut grouped = GroupedReasons::default();
        for reason in &self.reasons {
            let bucket = match reason.severity {
                Severity::Positive => &mut grouped.strengths,
                Severity::Caution => &mut grouped.cautions,
                Severity::Negative => &mut grouped.weaknesses,
            };
            bucket.push(reason.clone());
        }
        grouped
    }
}
