use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LlmError, LlmResult};
use crate::opinion::{parse_opinion, AdvisoryOpinion};
use crate::provider::AdvisoryBackend;
use crate::retry::{with_retry, RetryPolicy};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String, timeout: Duration, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
            retry,
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> LlmResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", BASE_URL, self.model))
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        let result = response.json::<GenerateResponse>().await?;
        result
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Gemini returned no text".to_string()))
    }
}

/// Quota exhaustion comes back as 429 or a `RESOURCE_EXHAUSTED` status.
fn classify_error(status: u16, body: &str) -> LlmError {
    let lowered = body.to_lowercase();
    if status == 429 || lowered.contains("resource exhausted") || lowered.contains("resource_exhausted") {
        LlmError::RateLimited(format!("Gemini HTTP {}", status))
    } else {
        LlmError::ServiceUnavailable(format!("Gemini HTTP {}: {}", status, body))
    }
}

#[async_trait]
impl AdvisoryBackend for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn opinion(&self, prompt: &str) -> LlmResult<AdvisoryOpinion> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey("Gemini"))?;

        let text = with_retry(&self.retry, "Gemini", || self.generate(api_key, prompt)).await?;
        parse_opinion(&text)
    }
}
