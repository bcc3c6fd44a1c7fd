use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0} API Key not set")]
    MissingApiKey(&'static str),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Overloaded: {0}")]
    Overloaded(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    /// Rate-limit and overload errors are worth retrying; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimited(_) | LlmError::Overloaded(_))
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
