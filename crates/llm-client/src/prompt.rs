use analysis_core::{FundamentalMetrics, IndicatorVector, ScreenerRecord};

use crate::error::LlmResult;

pub const NO_CONCALL_SUMMARY: &str = "No concall analysis available.";

/// Build the advisory prompt shared by every backend.
///
/// Technicals, provider fundamentals and the Screener record are embedded as
/// pretty-printed JSON. The reply is requested as a bare
/// `{verdict, score, summary}` object.
pub fn build_prompt(
    symbol: &str,
    technicals: &IndicatorVector,
    metrics: &FundamentalMetrics,
    screener: Option<&ScreenerRecord>,
    concall_summary: Option<&str>,
) -> LlmResult<String> {
    let technicals = serde_json::to_string_pretty(technicals)?;
    let metrics = serde_json::to_string_pretty(metrics)?;
    let screener = match screener {
        Some(record) => serde_json::to_string_pretty(record)?,
        None => "{}".to_string(),
    };
    let concall = concall_summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(NO_CONCALL_SUMMARY);

    Ok(format!(
        r#"You are a seasoned equity research analyst. Review the data below for {symbol} and give a verdict, a score and a short interpretation.

## Technical indicators (latest daily bar)
{technicals}

## Fundamental metrics (market-data provider)
{metrics}

## Ratios, growth and shareholding (Screener.in)
{screener}

## Latest earnings call / investor presentation
{concall}

---

Weigh these five factors explicitly:
1. Sales and profit growth: multi-year CAGR and the latest quarters.
2. Institutional holding: direction of FII and DII stakes; rising is positive, falling is negative.
3. Management guidance: outlook and projections from the earnings call.
4. Geopolitics: sector-specific geopolitical risks or tailwinds.
5. Regulation: recent or pending rules that affect the company or its sector.

Respond with a single JSON object and nothing else:
- "verdict": one of "Must Buy", "Buy", "Hold", "Sell", "Avoid"
- "score": number from 0 to 10, higher is a better opportunity
- "summary": 3-4 sentences naming the decisive factors from the list above

Do not wrap the JSON in markdown fences. Example:
{{"verdict": "Buy", "score": 7.5, "summary": "Profit has compounded at 20% and FIIs keep adding. Guidance points to double-digit growth, though export exposure to Europe is a risk."}}
"#
    ))
}
