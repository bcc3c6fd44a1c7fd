mod config;
mod routes;

use analysis_orchestrator::AnalysisOrchestrator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use yahoo_client::YahooClient;

use crate::config::ServerConfig;
use crate::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let config = ServerConfig::from_env()?;

    if config.llm.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, Gemini opinions will report an error");
    }
    if config.llm.anthropic_api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set, Claude opinions will report an error");
    }

    let market_data = Arc::new(YahooClient::new(config.yahoo.clone()));
    let orchestrator = AnalysisOrchestrator::new(market_data, config.orchestrator.clone())
        .with_advisors(llm_client::default_backends(&config.llm));

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Equity Analysis API listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
