use analysis_core::{
    FinancialHealth, FundamentalMetrics, Growth, Performance, ProviderInfo, Valuation,
};
use serde::{Deserialize, Serialize};

pub mod normalize;
pub mod screener;

pub use normalize::parse_scalar;
pub use screener::{
    fetch_with_fallback, quarter_over_quarter, screener_symbol, Outlook, ShareholdingChange,
};

/// Valuation label from the P/E ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationTier {
    Attractive,
    Fair,
    Expensive,
    Unknown,
}

/// Performance label from the ROE ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTier {
    Strong,
    Moderate,
    Weak,
    Unknown,
}

/// Advisory labels shown next to the metrics. Not part of the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundamentalAssessment {
    pub valuation: ValuationTier,
    pub performance: PerformanceTier,
}

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Map a provider info record onto [`FundamentalMetrics`].
    ///
    /// Keys that are missing or non-numeric become `None`. ROCE is never
    /// reported by the provider.
    pub fn extract(&self, info: &ProviderInfo) -> FundamentalMetrics {
        if info.is_empty() {
            return FundamentalMetrics::default();
        }

        let number = |key: &str| -> Option<f64> {
            info.get(key)
                .and_then(|v| v.as_f64())
                .filter(|v| v.is_finite())
        };

        FundamentalMetrics {
            valuation: Valuation {
                pe_ratio: number("trailingPE"),
                pb_ratio: number("priceToBook"),
                dividend_yield: number("dividendYield"),
                market_cap: number("marketCap"),
            },
            performance: Performance {
                roe: number("returnOnEquity"),
                roce: None,
                profit_margin: number("profitMargins"),
            },
            financial_health: FinancialHealth {
                debt_to_equity: number("debtToEquity"),
                current_ratio: number("currentRatio"),
            },
            growth: Growth {
                revenue_growth: number("revenueGrowth"),
                earnings_growth: number("earningsGrowth"),
            },
        }
    }

    /// Label valuation by P/E and performance by ROE (fractional, 0.15 = 15%).
    /// A zero reading counts as missing.
    pub fn analyze(&self, metrics: &FundamentalMetrics) -> FundamentalAssessment {
        let valuation = match metrics.valuation.pe_ratio.filter(|pe| *pe != 0.0) {
            Some(pe) if pe < 20.0 => ValuationTier::Attractive,
            Some(pe) if pe < 40.0 => ValuationTier::Fair,
            Some(_) => ValuationTier::Expensive,
            None => ValuationTier::Unknown,
        };

        let performance = match metrics.performance.roe.filter(|roe| *roe != 0.0) {
            Some(roe) if roe > 0.15 => PerformanceTier::Strong,
            Some(roe) if roe > 0.10 => PerformanceTier::Moderate,
            Some(_) => PerformanceTier::Weak,
            None => PerformanceTier::Unknown,
        };

        FundamentalAssessment {
            valuation,
            performance,
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: serde_json::Value) -> ProviderInfo {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_extract_maps_provider_keys() {
        let engine = FundamentalAnalysisEngine::new();
        let metrics = engine.extract(&info(json!({
            "trailingPE": 18.5,
            "priceToBook": 3.2,
            "dividendYield": 0.012,
            "marketCap": 1.5e12,
            "returnOnEquity": 0.21,
            "profitMargins": 0.14,
            "debtToEquity": 42.0,
            "currentRatio": 1.6,
            "revenueGrowth": 0.09,
            "earningsGrowth": -0.02,
            "longName": "Example Ltd"
        })));

        assert_eq!(metrics.valuation.pe_ratio, Some(18.5));
        assert_eq!(metrics.valuation.pb_ratio, Some(3.2));
        assert_eq!(metrics.valuation.dividend_yield, Some(0.012));
        assert_eq!(metrics.valuation.market_cap, Some(1.5e12));
        assert_eq!(metrics.performance.roe, Some(0.21));
        assert_eq!(metrics.performance.roce, None);
        assert_eq!(metrics.performance.profit_margin, Some(0.14));
        assert_eq!(metrics.financial_health.debt_to_equity, Some(42.0));
        assert_eq!(metrics.financial_health.current_ratio, Some(1.6));
        assert_eq!(metrics.growth.revenue_growth, Some(0.09));
        assert_eq!(metrics.growth.earnings_growth, Some(-0.02));
    }

    #[test]
    fn test_extract_tolerates_missing_and_non_numeric() {
        let engine = FundamentalAnalysisEngine::new();
        let metrics = engine.extract(&info(json!({
            "trailingPE": "Infinity",
            "marketCap": null
        })));

        assert_eq!(metrics.valuation.pe_ratio, None);
        assert_eq!(metrics.valuation.market_cap, None);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_extract_empty_input() {
        let engine = FundamentalAnalysisEngine::new();
        assert!(engine.extract(&ProviderInfo::new()).is_empty());
    }

    #[test]
    fn test_valuation_tiers() {
        let engine = FundamentalAnalysisEngine::new();
        let mut metrics = FundamentalMetrics::default();

        let tier = |m: &FundamentalMetrics| engine.analyze(m).valuation;
        assert_eq!(tier(&metrics), ValuationTier::Unknown);

        metrics.valuation.pe_ratio = Some(19.9);
        assert_eq!(tier(&metrics), ValuationTier::Attractive);
        metrics.valuation.pe_ratio = Some(20.0);
        assert_eq!(tier(&metrics), ValuationTier::Fair);
        metrics.valuation.pe_ratio = Some(40.0);
        assert_eq!(tier(&metrics), ValuationTier::Expensive);
        metrics.valuation.pe_ratio = Some(0.0);
        assert_eq!(tier(&metrics), ValuationTier::Unknown);
    }

    #[test]
    fn test_performance_tiers() {
        let engine = FundamentalAnalysisEngine::new();
        let mut metrics = FundamentalMetrics::default();

        let tier = |m: &FundamentalMetrics| engine.analyze(m).performance;
        assert_eq!(tier(&metrics), PerformanceTier::Unknown);

        metrics.performance.roe = Some(0.16);
        assert_eq!(tier(&metrics), PerformanceTier::Strong);
        metrics.performance.roe = Some(0.15);
        assert_eq!(tier(&metrics), PerformanceTier::Moderate);
        metrics.performance.roe = Some(0.10);
        assert_eq!(tier(&metrics), PerformanceTier::Weak);
        metrics.performance.roe = Some(-0.05);
        assert_eq!(tier(&metrics), PerformanceTier::Weak);
    }
}
