use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LlmError, LlmResult};
use crate::opinion::{parse_opinion, AdvisoryOpinion};
use crate::provider::AdvisoryBackend;
use crate::retry::{with_retry, RetryPolicy};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;
const SYSTEM_PROMPT: &str = "You are a financial analyst assistant that outputs strict JSON.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl ClaudeClient {
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

    fn request<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> LlmResult<String> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        let result = response.json::<MessagesResponse>().await?;
        first_text(result)
    }
}

fn first_text(response: MessagesResponse) -> LlmResult<String> {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .ok_or_else(|| LlmError::InvalidResponse("Claude returned no text block".to_string()))
}

/// 429 is a rate limit; 529 or an `overloaded_error` body means the API is saturated.
fn classify_error(status: u16, body: &str) -> LlmError {
    if status == 429 {
        LlmError::RateLimited(format!("Claude HTTP {}", status))
    } else if status == 529 || body.to_lowercase().contains("overloaded") {
        LlmError::Overloaded(format!("Claude HTTP {}", status))
    } else {
        LlmError::ServiceUnavailable(format!("Claude HTTP {}: {}", status, body))
    }
}

#[async_trait]
impl AdvisoryBackend for ClaudeClient {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn opinion(&self, prompt: &str) -> LlmResult<AdvisoryOpinion> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey("Anthropic"))?;

        let text = with_retry(&self.retry, "Claude", || self.complete(api_key, prompt)).await?;
        parse_opinion(&text)
    }
}
