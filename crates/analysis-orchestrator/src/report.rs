use analysis_core::{
    ConcallAnalysis, FundamentalMetrics, GroupedReasons, IndicatorVector, ScoreResult,
    ScoreVerdict, ScreenerRecord,
};
use chrono::{DateTime, Utc};
use fundamental_analysis::{FundamentalAssessment, ShareholdingChange};
use llm_client::AdvisoryOpinion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// One block of the analysis output: the value, or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Ok(T),
    Err { error: String },
}

impl<T> Section<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Section::Err {
            error: message.into(),
        }
    }

    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Section::Ok(value),
            Err(e) => Section::error(e.to_string()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Section::Ok(value) => Some(value),
            Section::Err { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Section::Ok(_) => None,
            Section::Err { error } => Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Section::Ok(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub symbol: String,
    pub price: Option<f64>,
    pub score: f64,
    pub verdict: ScoreVerdict,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsSection {
    pub metrics: FundamentalMetrics,
    pub analysis: FundamentalAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerSection {
    #[serde(flatten)]
    pub record: ScreenerRecord,
    pub shareholding_changes: Vec<ShareholdingChange>,
}

/// Full response for one `(symbol, period)` request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    pub technicals: Section<IndicatorVector>,
    pub fundamentals: Section<FundamentalsSection>,
    pub screener_metrics: Section<ScreenerSection>,
    pub concall_analysis: Section<ConcallAnalysis>,
    /// Backend name to its opinion.
    pub llm_comparison: BTreeMap<String, Section<AdvisoryOpinion>>,
    pub scoring_breakdown: ScoreResult,
    /// `scoring_breakdown.reasons` split into strengths, cautions and weaknesses.
    pub reason_groups: GroupedReasons,
}
