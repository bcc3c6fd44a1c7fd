use async_trait::async_trait;
use crate::{AnalysisError, ConcallAnalysis, MarketData, Period, ScreenerRecord, ScreenerVariant};

/// Primary market-data provider (price history plus a flat info record)
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch(&self, symbol: &str, period: Period) -> Result<MarketData, AnalysisError>;
}

/// Secondary scraped source. `Ok(None)` means the page variant does not exist.
#[async_trait]
pub trait ScreenerSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        variant: ScreenerVariant,
    ) -> Result<Option<ScreenerRecord>, AnalysisError>;
}

/// Summarizer for the latest earnings-call presentation
#[async_trait]
pub trait ConcallSource: Send + Sync {
    async fn latest(&self, symbol: &str) -> Result<ConcallAnalysis, AnalysisError>;
}
