pub mod claude;
pub mod error;
pub mod gemini;
pub mod opinion;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use claude::ClaudeClient;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use opinion::{parse_opinion, AdvisoryOpinion, AdvisoryVerdict};
pub use prompt::{build_prompt, NO_CONCALL_SUMMARY};
pub use provider::AdvisoryBackend;
pub use retry::{with_retry, RetryPolicy};

use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Configuration for the advisory backends. Keys are passed in explicitly;
/// a missing key turns that backend's opinion into an error.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_model: String,
    pub claude_model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            anthropic_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Gemini and Claude, in comparison order.
pub fn default_backends(config: &LlmConfig) -> Vec<Arc<dyn AdvisoryBackend>> {
    vec![
        Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.timeout,
            config.retry,
        )),
        Arc::new(ClaudeClient::new(
            config.anthropic_api_key.clone(),
            config.claude_model.clone(),
            config.timeout,
            config.retry,
        )),
    ]
}
