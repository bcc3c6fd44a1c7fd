use analysis_core::{FundamentalMetrics, ScreenerRecord};
use fundamental_analysis::parse_scalar;
use serde::{Deserialize, Serialize};

/// Which input a fundamental value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Screener,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Source,
}

/// A fundamental input with a fixed source priority.
///
/// The scraped record is consulted first; the provider metrics only when the
/// scraped value is absent or unparseable.
pub struct SourcedMetric<T> {
    pub name: &'static str,
    pub screener: fn(&ScreenerRecord) -> Option<T>,
    pub provider: fn(&FundamentalMetrics) -> Option<T>,
}

impl<T> SourcedMetric<T> {
    pub fn resolve(
        &self,
        screener: Option<&ScreenerRecord>,
        metrics: &FundamentalMetrics,
    ) -> Option<Resolved<T>> {
        if let Some(value) = screener.and_then(self.screener) {
            tracing::debug!("{} resolved from Screener", self.name);
            return Some(Resolved {
                value,
                source: Source::Screener,
            });
        }

        let value = (self.provider)(metrics)?;
        tracing::debug!("{} resolved from provider", self.name);
        Some(Resolved {
            value,
            source: Source::Provider,
        })
    }
}

/// Return-quality input: scraped ROCE/ROE pair, or the provider profit margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnQuality {
    /// Percent values, both non-zero.
    Ratios { roce: f64, roe: f64 },
    /// Fraction, e.g. 0.12.
    ProfitMargin(f64),
}

fn non_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

fn top_ratio(record: &ScreenerRecord, name: &str) -> Option<f64> {
    parse_scalar(record.top_ratio(name))
}

pub const PE_RATIO: SourcedMetric<f64> = SourcedMetric {
    name: "P/E",
    screener: screener_pe,
    provider: provider_pe,
};

fn screener_pe(record: &ScreenerRecord) -> Option<f64> {
    top_ratio(record, "Stock P/E")
}

fn provider_pe(metrics: &FundamentalMetrics) -> Option<f64> {
    metrics.valuation.pe_ratio
}

/// Screener reports crore; the provider reports currency units.
pub const MARKET_CAP: SourcedMetric<f64> = SourcedMetric {
    name: "Market Cap",
    screener: screener_market_cap,
    provider: provider_market_cap,
};

fn screener_market_cap(record: &ScreenerRecord) -> Option<f64> {
    top_ratio(record, "Market Cap")
}

fn provider_market_cap(metrics: &FundamentalMetrics) -> Option<f64> {
    metrics.valuation.market_cap.and_then(non_zero)
}

/// Always in percent.
pub const DIVIDEND_YIELD: SourcedMetric<f64> = SourcedMetric {
    name: "Dividend Yield",
    screener: screener_dividend_yield,
    provider: provider_dividend_yield,
};

fn screener_dividend_yield(record: &ScreenerRecord) -> Option<f64> {
    top_ratio(record, "Dividend Yield")
}

fn provider_dividend_yield(metrics: &FundamentalMetrics) -> Option<f64> {
    metrics
        .valuation
        .dividend_yield
        .and_then(non_zero)
        .map(|fraction| fraction * 100.0)
}

pub const RETURN_QUALITY: SourcedMetric<ReturnQuality> = SourcedMetric {
    name: "Return ratios",
    screener: screener_return_ratios,
    provider: provider_profit_margin,
};

fn screener_return_ratios(record: &ScreenerRecord) -> Option<ReturnQuality> {
    let roce = top_ratio(record, "ROCE").and_then(non_zero)?;
    let roe = top_ratio(record, "ROE").and_then(non_zero)?;
    Some(ReturnQuality::Ratios { roce, roe })
}

fn provider_profit_margin(metrics: &FundamentalMetrics) -> Option<ReturnQuality> {
    metrics
        .performance
        .profit_margin
        .and_then(non_zero)
        .map(ReturnQuality::ProfitMargin)
}

/// Screener reports percent; the provider reports a fraction.
pub const SALES_GROWTH: SourcedMetric<f64> = SourcedMetric {
    name: "Sales growth",
    screener: screener_sales_growth,
    provider: provider_revenue_growth,
};

fn screener_sales_growth(record: &ScreenerRecord) -> Option<f64> {
    let table = &record.compounded_sales_growth;
    let raw = table
        .get("3 Years")
        .filter(|v| !v.is_empty())
        .or_else(|| table.get("TTM"));
    parse_scalar(raw.map(String::as_str))
}

fn provider_revenue_growth(metrics: &FundamentalMetrics) -> Option<f64> {
    metrics.growth.revenue_growth.and_then(non_zero)
}

pub const DEBT_TO_EQUITY: SourcedMetric<f64> = SourcedMetric {
    name: "Debt to equity",
    screener: screener_debt_to_equity,
    provider: provider_debt_to_equity,
};

fn screener_debt_to_equity(record: &ScreenerRecord) -> Option<f64> {
    top_ratio(record, "Debt to equity")
}

fn provider_debt_to_equity(metrics: &FundamentalMetrics) -> Option<f64> {
    metrics.financial_health.debt_to_equity
}
