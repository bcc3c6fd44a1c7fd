use analysis_core::{
    indicator_keys, AnalysisError, ConcallAnalysis, ConcallSource, FundamentalMetrics,
    IndicatorVector, MarketData, MarketDataProvider, Period, ScreenerRecord, ScreenerSource,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fundamental_analysis::{fetch_with_fallback, quarter_over_quarter, FundamentalAnalysisEngine};
use futures_util::future::join_all;
use llm_client::{build_prompt, AdvisoryBackend, AdvisoryOpinion, LlmError};
use scoring_engine::ScoringEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use technical_analysis::TechnicalAnalysisEngine;

pub mod report;
pub use report::{AnalysisResult, AnalysisSummary, FundamentalsSection, ScreenerSection, Section};

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_ttl_secs: i64,
    pub cache_max_entries: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_max_entries: 128,
        }
    }
}

type CacheKey = (String, Period);

pub struct AnalysisOrchestrator {
    market_data: Arc<dyn MarketDataProvider>,
    screener: Option<Arc<dyn ScreenerSource>>,
    concall: Option<Arc<dyn ConcallSource>>,
    advisors: Vec<Arc<dyn AdvisoryBackend>>,
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
    scoring_engine: ScoringEngine,
    config: OrchestratorConfig,
    /// Finished results per (symbol, period)
    cache: DashMap<CacheKey, CacheEntry<Arc<AnalysisResult>>>,
}

impl AnalysisOrchestrator {
    pub fn new(market_data: Arc<dyn MarketDataProvider>, config: OrchestratorConfig) -> Self {
        Self {
            market_data,
            screener: None,
            concall: None,
            advisors: Vec::new(),
            technical_analyzer: TechnicalAnalysisEngine::new(),
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            scoring_engine: ScoringEngine::new(),
            config,
            cache: DashMap::new(),
        }
    }

    pub fn with_screener(mut self, screener: Arc<dyn ScreenerSource>) -> Self {
        self.screener = Some(screener);
        self
    }

    pub fn with_concall(mut self, concall: Arc<dyn ConcallSource>) -> Self {
        self.concall = Some(concall);
        self
    }

    pub fn with_advisors(mut self, advisors: Vec<Arc<dyn AdvisoryBackend>>) -> Self {
        self.advisors = advisors;
        self
    }

    /// Run the full pipeline for one symbol.
    ///
    /// Never fails: a collaborator error becomes the `error` of its section and
    /// scoring proceeds with whatever inputs are left.
    pub async fn analyze(&self, symbol: &str, period: Period) -> Arc<AnalysisResult> {
        let symbol = symbol.trim().to_uppercase();
        let key = (symbol.clone(), period);

        if let Some(entry) = self.cache.get(&key) {
            let age = (Utc::now() - entry.cached_at).num_seconds();
            if age < self.config.cache_ttl_secs {
                tracing::debug!("Cache hit for {} ({})", symbol, period);
                return Arc::clone(&entry.data);
            }
        }

        tracing::info!("Starting analysis for {} (period: {})", symbol, period);

        let (market_result, screener_result, concall_result) = tokio::join!(
            self.market_data.fetch(&symbol, period),
            self.fetch_screener(&symbol),
            self.fetch_concall(&symbol),
        );

        // Retryable failures are not cached
        let mut cacheable = market_result.is_ok()
            && screener_result.as_ref().map_or_else(is_lasting, |_| true)
            && concall_result.as_ref().map_or_else(is_lasting, |_| true);

        let (technicals, fundamentals) = self.analyze_market_data(&symbol, market_result);
        let screener_metrics = Section::from_result(screener_result.map(|record| ScreenerSection {
            shareholding_changes: record
                .shareholding_pattern
                .as_ref()
                .map(quarter_over_quarter)
                .unwrap_or_default(),
            record,
        }));
        let concall_analysis = Section::from_result(concall_result);

        let indicators = technicals.value().cloned().unwrap_or_default();
        let metrics = fundamentals
            .value()
            .map(|f| f.metrics.clone())
            .unwrap_or_default();
        let screener_record = screener_metrics.value().map(|s| &s.record);

        let (llm_comparison, advisors_settled) = self
            .compare_advisors(
                &symbol,
                &indicators,
                &metrics,
                screener_record,
                concall_analysis.value(),
            )
            .await;
        cacheable &= advisors_settled;

        let scoring = self.scoring_engine.score(&indicators, &metrics, screener_record);

        let summary = AnalysisSummary {
            symbol: symbol.clone(),
            price: indicators.get(indicator_keys::CLOSE),
            score: scoring.score,
            verdict: scoring.verdict,
            technical_score: scoring.technical_score,
            fundamental_score: scoring.fundamental_score,
            timestamp: indicators.as_of,
        };

        let result = Arc::new(AnalysisResult {
            summary,
            technicals,
            fundamentals,
            screener_metrics,
            concall_analysis,
            llm_comparison,
            reason_groups: scoring.grouped(),
            scoring_breakdown: scoring,
        });

        tracing::info!(
            "Analysis complete for {}: {:.2} ({})",
            symbol,
            result.summary.score,
            result.summary.verdict
        );

        if cacheable {
            self.store(key, Arc::clone(&result));
        } else {
            tracing::debug!("Not caching {} ({}): a collaborator failed", symbol, period);
        }
        result
    }

    fn analyze_market_data(
        &self,
        symbol: &str,
        market_result: Result<MarketData, AnalysisError>,
    ) -> (Section<IndicatorVector>, Section<FundamentalsSection>) {
        let data = match market_result {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Market data fetch failed for {}: {}", symbol, e);
                let message = format!("Error fetching data: {}", e);
                return (Section::error(message.clone()), Section::error(message));
            }
        };

        let technicals = if data.history.is_empty() {
            tracing::warn!("No price history for {}", symbol);
            Section::error(format!("No data found for symbol {}", symbol))
        } else {
            Section::from_result(self.technical_analyzer.snapshot(&data.history))
        };

        let metrics = self.fundamental_analyzer.extract(&data.info);
        let analysis = self.fundamental_analyzer.analyze(&metrics);

        (technicals, Section::Ok(FundamentalsSection { metrics, analysis }))
    }

    async fn fetch_screener(&self, symbol: &str) -> Result<ScreenerRecord, AnalysisError> {
        let source = self
            .screener
            .as_ref()
            .ok_or_else(|| AnalysisError::NotConfigured("Screener source".to_string()))?;

        let result = fetch_with_fallback(source.as_ref(), symbol).await;
        if let Err(e) = &result {
            tracing::warn!("Screener data unavailable for {}: {}", symbol, e);
        }
        result
    }

    async fn fetch_concall(&self, symbol: &str) -> Result<ConcallAnalysis, AnalysisError> {
        let source = self
            .concall
            .as_ref()
            .ok_or_else(|| AnalysisError::NotConfigured("Concall source".to_string()))?;

        let result = source.latest(symbol).await;
        if let Err(e) = &result {
            tracing::warn!("Concall analysis failed for {}: {}", symbol, e);
        }
        result
    }

    /// Ask every advisory backend concurrently. Each failure stays local to its backend.
    ///
    /// The flag is false when any backend failed for a reason other than a missing key.
    async fn compare_advisors(
        &self,
        symbol: &str,
        indicators: &IndicatorVector,
        metrics: &FundamentalMetrics,
        screener: Option<&ScreenerRecord>,
        concall: Option<&ConcallAnalysis>,
    ) -> (BTreeMap<String, Section<AdvisoryOpinion>>, bool) {
        let names = self.advisors.iter().map(|a| a.name().to_string());

        let prompt = match build_prompt(
            symbol,
            indicators,
            metrics,
            screener,
            concall.map(|c| c.summary.as_str()),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!("Could not build advisory prompt for {}: {}", symbol, e);
                let message = e.to_string();
                let sections = names.map(|name| (name, Section::error(message.clone()))).collect();
                return (sections, false);
            }
        };

        let opinions = join_all(self.advisors.iter().map(|advisor| {
            let prompt = prompt.as_str();
            async move {
                let result = advisor.opinion(prompt).await;
                if let Err(e) = &result {
                    tracing::warn!("{} opinion failed for {}: {}", advisor.name(), symbol, e);
                }
                result
            }
        }))
        .await;

        let settled = opinions
            .iter()
            .all(|result| matches!(result, Ok(_) | Err(LlmError::MissingApiKey(_))));
        let sections = names
            .zip(opinions)
            .map(|(name, result)| (name, Section::from_result(result)))
            .collect();

        (sections, settled)
    }

    fn store(&self, key: CacheKey, data: Arc<AnalysisResult>) {
        let max_entries = self.config.cache_max_entries;
        if max_entries == 0 {
            return;
        }

        if self.cache.len() >= max_entries && !self.cache.contains_key(&key) {
            let ttl = self.config.cache_ttl_secs;
            let now = Utc::now();
            self.cache
                .retain(|_, entry| (now - entry.cached_at).num_seconds() < ttl);

            while self.cache.len() >= max_entries {
                let oldest = self
                    .cache
                    .iter()
                    .min_by_key(|entry| entry.value().cached_at)
                    .map(|entry| entry.key().clone());
                match oldest {
                    Some(oldest) => {
                        tracing::debug!("Evicting cached analysis for {} ({})", oldest.0, oldest.1);
                        self.cache.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        self.cache.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// Errors that will repeat on every request until the deployment changes.
fn is_lasting(error: &AnalysisError) -> bool {
    matches!(error, AnalysisError::NotConfigured(_))
}
