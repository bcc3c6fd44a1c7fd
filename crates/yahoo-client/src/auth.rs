use analysis_core::AnalysisError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Crumb token paired with the session cookie held in the client's jar.
///
/// Refreshes happen under the lock, so concurrent callers wait for one
/// refresh instead of each hitting the crumb endpoint.
pub(crate) struct CrumbCache {
    slot: Mutex<Option<CachedCrumb>>,
    ttl: Duration,
}

impl CrumbCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    pub(crate) async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, AnalysisError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AnalysisError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.value.clone());
            }
        }

        let value = refresh().await?;
        *slot = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    pub(crate) async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

/// Accept a getcrumb body only when it looks like a bare token.
pub(crate) fn parse_crumb(body: &str) -> Result<String, AnalysisError> {
    let body = body.trim();

    if body.to_lowercase().contains("too many requests") {
        return Err(AnalysisError::ApiError(
            "Yahoo rate limited while fetching crumb".to_string(),
        ));
    }
    if body.is_empty()
        || body.len() >= 100
        || body.contains(char::is_whitespace)
        || body.contains('<')
    {
        return Err(AnalysisError::ApiError(
            "Unexpected response from Yahoo crumb endpoint".to_string(),
        ));
    }

    Ok(body.to_string())
}
