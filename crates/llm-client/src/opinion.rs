use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LlmError, LlmResult};

/// Verdict vocabulary requested from advisory backends.
///
/// Deliberately separate from the rule-based `ScoreVerdict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AdvisoryVerdict {
    #[serde(rename = "Must Buy")]
    MustBuy,
    Buy,
    Hold,
    Sell,
    Avoid,
}

impl AdvisoryVerdict {
    pub const ALL: [AdvisoryVerdict; 5] = [
        AdvisoryVerdict::MustBuy,
        AdvisoryVerdict::Buy,
        AdvisoryVerdict::Hold,
        AdvisoryVerdict::Sell,
        AdvisoryVerdict::Avoid,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AdvisoryVerdict::MustBuy => "Must Buy",
            AdvisoryVerdict::Buy => "Buy",
            AdvisoryVerdict::Hold => "Hold",
            AdvisoryVerdict::Sell => "Sell",
            AdvisoryVerdict::Avoid => "Avoid",
        }
    }
}

impl fmt::Display for AdvisoryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AdvisoryVerdict {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LlmError::InvalidResponse(format!("Unknown verdict: {}", wanted)))
    }
}

impl TryFrom<String> for AdvisoryVerdict {
    type Error = LlmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One backend's verdict, 0-10 score and short narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryOpinion {
    pub verdict: AdvisoryVerdict,
    pub score: f64,
    pub summary: String,
}

/// Parse a backend reply, tolerating a surrounding ```` ```json ```` fence.
pub fn parse_opinion(text: &str) -> LlmResult<AdvisoryOpinion> {
    let mut body = text.trim();
    body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .unwrap_or(body);
    body = body.strip_suffix("```").unwrap_or(body);

    let opinion: AdvisoryOpinion = serde_json::from_str(body.trim())?;
    if !opinion.score.is_finite() {
        return Err(LlmError::InvalidResponse("Score is not a number".to_string()));
    }
    Ok(opinion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let opinion = parse_opinion(
            r#"{"verdict": "Buy", "score": 7.5, "summary": "Growth is strong."}"#,
        )
        .unwrap();

        assert_eq!(opinion.verdict, AdvisoryVerdict::Buy);
        assert!((opinion.score - 7.5).abs() < 1e-9);
        assert_eq!(opinion.summary, "Growth is strong.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"verdict\": \"must buy\", \"score\": 9, \"summary\": \"x\"}\n```\n";
        let opinion = parse_opinion(reply).unwrap();
        assert_eq!(opinion.verdict, AdvisoryVerdict::MustBuy);
        assert_eq!(opinion.score, 9.0);

        let reply = "```\n{\"verdict\": \"Hold\", \"score\": 5, \"summary\": \"x\"}```";
        assert_eq!(parse_opinion(reply).unwrap().verdict, AdvisoryVerdict::Hold);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_opinion("I think you should buy it."),
            Err(LlmError::Serialization(_))
        ));
        assert!(parse_opinion(r#"{"verdict": "Strong Buy", "score": 8, "summary": ""}"#).is_err());
        assert!(parse_opinion(r#"{"verdict": "Sell", "summary": "no score"}"#).is_err());
    }

    #[test]
    fn test_verdict_serializes_with_label() {
        let json = serde_json::to_value(AdvisoryVerdict::MustBuy).unwrap();
        assert_eq!(json, "Must Buy");
        assert_eq!("AVOID".parse::<AdvisoryVerdict>().unwrap(), AdvisoryVerdict::Avoid);
    }
}
