use analysis_core::{AnalysisError, Bar, MarketData, MarketDataProvider, Period, ProviderInfo};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::REFERER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

mod auth;

use auth::{parse_crumb, CrumbCache};

const FINANCE_REFERER: &str = "https://finance.yahoo.com/";
const SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,financialData";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let Some(&oldest) = ts.front() else {
                continue;
            };
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Requests per minute.
    pub rate_limit: usize,
    pub timeout: Duration,
    /// Host serving chart, crumb and quote-summary endpoints.
    pub base_url: String,
    /// Visited once per crumb refresh to obtain the session cookie.
    pub cookie_url: String,
    pub crumb_ttl: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            rate_limit: 60,
            timeout: Duration::from_secs(30),
            base_url: "https://query1.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            crumb_ttl: Duration::from_secs(3600),
        }
    }
}

/// Yahoo Finance chart + quote-summary client.
///
/// Quote summaries need the cookie/crumb pair; chart requests do not.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
    crumb: Arc<CrumbCache>,
    base_url: String,
    cookie_url: String,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
            crumb: Arc::new(CrumbCache::new(config.crumb_ttl)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url,
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt as u64 + 1);
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Yahoo after 3 retries".to_string()))
    }

    /// Daily OHLCV history for `symbol` over `period`.
    pub async fn get_history(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("range", period.as_str()),
                ("interval", "1d"),
                ("events", "div,split"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        parse_chart(chart)
    }

    /// Flat fundamentals record (`trailingPE`, `marketCap`, ...).
    ///
    /// A 401/403 means the crumb went stale; it is refreshed and the request
    /// retried once.
    pub async fn get_info(&self, symbol: &str) -> Result<ProviderInfo, AnalysisError> {
        let crumb = self.crumb().await?;
        let mut response = self.send_request(self.summary_request(symbol, &crumb)).await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::warn!(
                "Yahoo rejected crumb for {} (HTTP {}), refreshing",
                symbol,
                response.status()
            );
            self.crumb.invalidate().await;
            let crumb = self.crumb().await?;
            response = self.send_request(self.summary_request(symbol, &crumb)).await?;
        }

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!("HTTP {}", response.status())));
        }

        let summary: QuoteSummaryResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(flatten_quote_summary(summary))
    }

    fn summary_request(&self, symbol: &str, crumb: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol))
            .header(REFERER, FINANCE_REFERER)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb)])
    }

    async fn crumb(&self) -> Result<String, AnalysisError> {
        self.crumb.get_or_refresh(|| self.fetch_crumb()).await
    }

    async fn fetch_crumb(&self) -> Result<String, AnalysisError> {
        // The cookie host answers with an error status but still sets the session cookie
        self.send_request(self.client.get(&self.cookie_url).header(REFERER, FINANCE_REFERER))
            .await?;

        let response = self
            .send_request(
                self.client
                    .get(format!("{}/v1/test/getcrumb", self.base_url))
                    .header(REFERER, FINANCE_REFERER),
            )
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "Crumb request failed: HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        let crumb = parse_crumb(&body)?;
        tracing::debug!("Refreshed Yahoo crumb");
        Ok(crumb)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new(YahooConfig::default())
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch(&self, symbol: &str, period: Period) -> Result<MarketData, AnalysisError> {
        let symbol = normalize_symbol(symbol);
        tracing::info!("Fetching {} history for {}", period, symbol);

        let (history, info) = tokio::join!(
            self.get_history(&symbol, period),
            self.get_info(&symbol)
        );
        let history = history?;

        let info = info.unwrap_or_else(|e| {
            tracing::warn!("Quote summary unavailable for {}: {}", symbol, e);
            ProviderInfo::new()
        });

        Ok(MarketData { history, info })
    }
}

/// Upper-case and default to the NSE listing unless a `.NS`/`.BO` suffix is present.
pub fn normalize_symbol(symbol: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if symbol.ends_with(".NS") || symbol.ends_with(".BO") {
        symbol
    } else {
        format!("{}.NS", symbol)
    }
}

fn parse_chart(chart: ChartResponse) -> Result<Vec<Bar>, AnalysisError> {
    if let Some(error) = chart.chart.error {
        return Err(AnalysisError::ApiError(format!(
            "{}: {}",
            error.code.unwrap_or_default(),
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = chart.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    // Rows without a close (halts, partial sessions) are dropped
    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let close = at(&quote.close, i)?;
            Some(Bar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(bars)
}

/// Merge the requested modules into one map. `{raw, fmt}` wrappers collapse
/// to `raw`; empty wrappers are skipped.
fn flatten_quote_summary(summary: QuoteSummaryResponse) -> ProviderInfo {
    let mut info = ProviderInfo::new();
    let Some(result) = summary.quote_summary.result.and_then(|r| r.into_iter().next()) else {
        return info;
    };

    for module in result.values() {
        let Some(fields) = module.as_object() else {
            continue;
        };
        for (key, value) in fields {
            let flat = match value {
                Value::Object(wrapper) => match wrapper.get("raw") {
                    Some(raw) => raw.clone(),
                    None => continue,
                },
                Value::Null => continue,
                other => other.clone(),
            };
            info.entry(key.clone()).or_insert(flat);
        }
    }

    info
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<serde_json::Map<String, Value>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{header, HeaderMap};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Local stand-in for the cookie, crumb and quote-summary endpoints.
    /// Only the second crumb it hands out is accepted.
    #[derive(Clone, Default)]
    struct FakeYahoo {
        cookie_hits: Arc<AtomicUsize>,
        crumbs_issued: Arc<AtomicUsize>,
        crumb_requests_with_cookie: Arc<AtomicUsize>,
        summary_calls: Arc<AtomicUsize>,
    }

    async fn spawn_fake_yahoo(fake: FakeYahoo) -> YahooConfig {
        let app = Router::new()
            .route(
                "/consent",
                get(|State(fake): State<FakeYahoo>| async move {
                    fake.cookie_hits.fetch_add(1, Ordering::SeqCst);
                    (
                        axum::http::StatusCode::NOT_FOUND,
                        [(header::SET_COOKIE, "A3=session; Path=/")],
                        "",
                    )
                }),
            )
            .route(
                "/v1/test/getcrumb",
                get(|State(fake): State<FakeYahoo>, headers: HeaderMap| async move {
                    let has_cookie = headers
                        .get(header::COOKIE)
                        .and_then(|v| v.to_str().ok())
                        .map_or(false, |v| v.contains("A3=session"));
                    if has_cookie {
                        fake.crumb_requests_with_cookie.fetch_add(1, Ordering::SeqCst);
                    }
                    let n = fake.crumbs_issued.fetch_add(1, Ordering::SeqCst) + 1;
                    format!("crumb{}", n)
                }),
            )
            .route(
                "/v10/finance/quoteSummary/:symbol",
                get(
                    |State(fake): State<FakeYahoo>,
                     Path(symbol): Path<String>,
                     Query(query): Query<HashMap<String, String>>| async move {
                        fake.summary_calls.fetch_add(1, Ordering::SeqCst);
                        if query.get("crumb").map(String::as_str) != Some("crumb2") {
                            return (
                                axum::http::StatusCode::UNAUTHORIZED,
                                Json(json!({"finance": {"error": {"code": "Unauthorized"}}})),
                            );
                        }
                        (
                            axum::http::StatusCode::OK,
                            Json(json!({
                                "quoteSummary": {
                                    "result": [{
                                        "summaryDetail": {"trailingPE": {"raw": 21.5}},
                                        "price": {"symbol": symbol}
                                    }],
                                    "error": null
                                }
                            })),
                        )
                    },
                ),
            )
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        YahooConfig {
            base_url: format!("http://{}", addr),
            cookie_url: format!("http://{}/consent", addr),
            ..YahooConfig::default()
        }
    }

    #[test]
    fn test_summary_request_carries_crumb() {
        let client = YahooClient::new(YahooConfig {
            base_url: "https://query.test/".to_string(),
            ..YahooConfig::default()
        });

        let request = client.summary_request("TCS.NS", "ab/c=").build().unwrap();
        let url = request.url();

        assert_eq!(url.host_str(), Some("query.test"));
        assert_eq!(url.path(), "/v10/finance/quoteSummary/TCS.NS");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query["crumb"], "ab/c=");
        assert_eq!(query["modules"], SUMMARY_MODULES);
        assert!(url.query().unwrap().contains("crumb=ab%2Fc%3D"));
    }

    #[tokio::test]
    async fn test_get_info_refreshes_rejected_crumb() {
        let fake = FakeYahoo::default();
        let client = YahooClient::new(spawn_fake_yahoo(fake.clone()).await);

        let info = client.get_info("TCS.NS").await.unwrap();

        assert_eq!(info["trailingPE"], 21.5);
        assert_eq!(fake.summary_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fake.crumbs_issued.load(Ordering::SeqCst), 2);
        assert_eq!(fake.cookie_hits.load(Ordering::SeqCst), 2);
        assert_eq!(fake.crumb_requests_with_cookie.load(Ordering::SeqCst), 2);

        // accepted crumb is reused
        client.get_info("TCS.NS").await.unwrap();
        assert_eq!(fake.crumbs_issued.load(Ordering::SeqCst), 2);
        assert_eq!(fake.summary_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("reliance"), "RELIANCE.NS");
        assert_eq!(normalize_symbol("tcs.bo"), "TCS.BO");
        assert_eq!(normalize_symbol("INFY.NS"), "INFY.NS");
        assert_eq!(normalize_symbol(" hdfcbank "), "HDFCBANK.NS");
    }

    #[test]
    fn test_parse_chart_skips_missing_closes() {
        let chart: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "INR"},
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": {"quote": [{
                        "open": [100.0, null, 102.0],
                        "high": [101.0, null, 104.0],
                        "low": [99.0, null, 101.0],
                        "close": [100.5, null, 103.0],
                        "volume": [1000.0, null, null]
                    }]}
                }],
                "error": null
            }
        }))
        .unwrap();

        let bars = parse_chart(chart).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].high, 104.0);
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(bars[1].timestamp.timestamp(), 1704326400);
    }

    #[test]
    fn test_parse_chart_error() {
        let chart: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }))
        .unwrap();

        let err = parse_chart(chart).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_flatten_quote_summary() {
        let summary: QuoteSummaryResponse = serde_json::from_value(json!({
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {
                        "maxAge": 1,
                        "trailingPE": {"raw": 24.1, "fmt": "24.10"},
                        "dividendYield": {"raw": 0.0125, "fmt": "1.25%"},
                        "marketCap": {"raw": 1.6e13, "fmt": "16T", "longFmt": "16,000,000,000,000"},
                        "forwardPE": {}
                    },
                    "financialData": {
                        "profitMargins": {"raw": 0.11, "fmt": "11.00%"},
                        "debtToEquity": {"raw": 38.2, "fmt": "38.20"},
                        "financialCurrency": "INR"
                    }
                }],
                "error": null
            }
        }))
        .unwrap();

        let info = flatten_quote_summary(summary);
        assert_eq!(info["trailingPE"], 24.1);
        assert_eq!(info["dividendYield"], 0.0125);
        assert_eq!(info["marketCap"], 1.6e13);
        assert_eq!(info["profitMargins"], 0.11);
        assert_eq!(info["financialCurrency"], "INR");
        assert!(!info.contains_key("forwardPE"));
    }

    #[test]
    fn test_flatten_empty_summary() {
        let summary: QuoteSummaryResponse =
            serde_json::from_value(json!({"quoteSummary": {"result": null, "error": {"code": "x"}}}))
                .unwrap();
        assert!(flatten_quote_summary(summary).is_empty());
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.timestamps.lock().await.len(), 3);
    }
}
