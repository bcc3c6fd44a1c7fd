use analysis_core::{
    AnalysisError, ScreenerRecord, ScreenerSource, ScreenerSourceTag, ScreenerVariant,
    ShareholdingPattern,
};
use serde::{Deserialize, Serialize};

use crate::normalize::parse_scalar;

/// Screener pages are keyed by the bare exchange symbol.
pub fn screener_symbol(symbol: &str) -> String {
    symbol.replace(".NS", "").replace(".BO", "")
}

/// Fetch the Screener record, preferring the consolidated page.
///
/// The standalone page is only requested when the consolidated one is missing,
/// failed, or contains nothing but placeholders. If neither variant has real
/// values, a fetched consolidated page is still returned; otherwise an empty
/// record tagged `N/A`. Errors surface only when both fetches failed.
pub async fn fetch_with_fallback(
    source: &dyn ScreenerSource,
    symbol: &str,
) -> Result<ScreenerRecord, AnalysisError> {
    let symbol = screener_symbol(symbol);

    let consolidated = source.fetch(&symbol, ScreenerVariant::Consolidated).await;
    if let Ok(Some(record)) = &consolidated {
        if record.has_meaningful_data() {
            return Ok(tagged(record.clone(), ScreenerVariant::Consolidated));
        }
    }
    if let Err(e) = &consolidated {
        tracing::warn!("Consolidated Screener page failed for {}: {}", symbol, e);
    }

    tracing::debug!("Consolidated Screener data empty for {}, trying standalone", symbol);
    let standalone = source.fetch(&symbol, ScreenerVariant::Standalone).await;
    if let Err(e) = &standalone {
        tracing::warn!("Standalone Screener page failed for {}: {}", symbol, e);
    }

    choose_variant(consolidated, standalone)
}

fn choose_variant(
    consolidated: Result<Option<ScreenerRecord>, AnalysisError>,
    standalone: Result<Option<ScreenerRecord>, AnalysisError>,
) -> Result<ScreenerRecord, AnalysisError> {
    match (consolidated, standalone) {
        (_, Ok(Some(record))) if record.has_meaningful_data() => {
            Ok(tagged(record, ScreenerVariant::Standalone))
        }
        (Ok(Some(record)), _) => Ok(tagged(record, ScreenerVariant::Consolidated)),
        (Err(e), Err(_)) => Err(e),
        _ => Ok(ScreenerRecord::empty()),
    }
}

fn tagged(mut record: ScreenerRecord, variant: ScreenerVariant) -> ScreenerRecord {
    record.source = ScreenerSourceTag::from(variant);
    record
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outlook {
    Positive,
    Negative,
    Neutral,
}

/// Latest quarter-over-quarter move for one holder category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareholdingChange {
    pub category: String,
    pub previous_quarter: String,
    pub latest_quarter: String,
    pub previous: f64,
    pub current: f64,
    pub change: f64,
    pub outlook: Outlook,
}

/// Categories tracked and whether an increase is good news.
const TRACKED_HOLDERS: [(&str, bool); 4] = [
    ("Promoters", true),
    ("FIIs", true),
    ("DIIs", true),
    ("Public", false),
];

/// Compare the last two quarters for promoters, FIIs, DIIs and public holders.
/// Rising institutional/promoter stakes and a falling public stake read as positive.
pub fn quarter_over_quarter(pattern: &ShareholdingPattern) -> Vec<ShareholdingChange> {
    let n = pattern.quarters.len();
    if n < 2 {
        return Vec::new();
    }
    let latest_quarter = &pattern.quarters[n - 1];
    let previous_quarter = &pattern.quarters[n - 2];

    TRACKED_HOLDERS
        .iter()
        .filter_map(|(category, increase_is_good)| {
            let values = pattern.data.get(*category)?;
            if values.len() < 2 {
                return None;
            }
            let current = parse_scalar(values.last().map(String::as_str))?;
            let previous = parse_scalar(values.get(values.len() - 2).map(String::as_str))?;
            let change = current - previous;

            let outlook = if change == 0.0 {
                Outlook::Neutral
            } else if (change > 0.0) == *increase_is_good {
                Outlook::Positive
            } else {
                Outlook::Negative
            };

            Some(ShareholdingChange {
                category: category.to_string(),
                previous_quarter: previous_quarter.clone(),
                latest_quarter: latest_quarter.clone(),
                previous,
                current,
                change,
                outlook,
            })
        })
        .collect()
}
