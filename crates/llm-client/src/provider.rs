use async_trait::async_trait;

use crate::error::LlmResult;
use crate::opinion::AdvisoryOpinion;

/// A narrative backend that turns the analysis prompt into an opinion.
///
/// Opinions are shown next to the rule-based score and never blended into it.
#[async_trait]
pub trait AdvisoryBackend: Send + Sync {
    /// Key used for this backend in the comparison output.
    fn name(&self) -> &'static str;

    async fn opinion(&self, prompt: &str) -> LlmResult<AdvisoryOpinion>;
}
