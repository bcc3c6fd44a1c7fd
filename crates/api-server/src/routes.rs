use analysis_core::Period;
use analysis_orchestrator::AnalysisOrchestrator;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const BANNER: &str = "Equity Analysis API is running";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub period: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    InvalidPeriod(String),
    Serialization(serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidPeriod(period) => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Invalid period '{}'. Use one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.",
                    period
                ),
            ),
            ApiError::Serialization(e) => {
                tracing::error!("Failed to serialize analysis: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to serialize analysis".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/analyze/:symbol", get(analyze_symbol))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": BANNER }))
}

async fn analyze_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<Value>, ApiError> {
    let period = match query.period.as_deref() {
        Some(raw) => raw
            .parse::<Period>()
            .map_err(|_| ApiError::InvalidPeriod(raw.to_string()))?,
        None => Period::default(),
    };

    let result = state.orchestrator.analyze(&symbol, period).await;
    let body = serde_json::to_value(result.as_ref()).map_err(ApiError::Serialization)?;

    Ok(Json(body))
}
