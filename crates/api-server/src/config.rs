use analysis_orchestrator::OrchestratorConfig;
use anyhow::{Context, Result};
use llm_client::{LlmConfig, DEFAULT_CLAUDE_MODEL, DEFAULT_GEMINI_MODEL};
use std::time::Duration;
use yahoo_client::YahooConfig;

/// Everything the binary reads from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub llm: LlmConfig,
    pub orchestrator: OrchestratorConfig,
    pub yahoo: YahooConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Blank values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_timeout: u64 = parse_or(&var, "LLM_TIMEOUT_SECS", 60)?;
        let yahoo_defaults = YahooConfig::default();
        let orchestrator_defaults = OrchestratorConfig::default();

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            llm: LlmConfig {
                gemini_api_key: var("GEMINI_API_KEY"),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                gemini_model: var("GEMINI_MODEL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                claude_model: var("CLAUDE_MODEL")
                    .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
                timeout: Duration::from_secs(llm_timeout),
                ..LlmConfig::default()
            },
            orchestrator: OrchestratorConfig {
                cache_ttl_secs: parse_or(
                    &var,
                    "CACHE_TTL_SECS",
                    orchestrator_defaults.cache_ttl_secs,
                )?,
                cache_max_entries: parse_or(
                    &var,
                    "CACHE_MAX_ENTRIES",
                    orchestrator_defaults.cache_max_entries,
                )?,
            },
            yahoo: YahooConfig {
                rate_limit: parse_or(&var, "YAHOO_RATE_LIMIT", yahoo_defaults.rate_limit)?,
                ..yahoo_defaults
            },
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert!(config.llm.gemini_api_key.is_none());
        assert!(config.llm.anthropic_api_key.is_none());
        assert_eq!(config.llm.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.orchestrator.cache_ttl_secs, 3600);
        assert_eq!(config.orchestrator.cache_max_entries, 128);
        assert_eq!(config.yahoo.rate_limit, 60);
    }

    #[test]
    fn test_reads_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("GEMINI_API_KEY", "g-key"),
            ("ANTHROPIC_API_KEY", "a-key"),
            ("CLAUDE_MODEL", "claude-test"),
            ("LLM_TIMEOUT_SECS", "15"),
            ("CACHE_TTL_SECS", "120"),
            ("CACHE_MAX_ENTRIES", "4"),
            ("YAHOO_RATE_LIMIT", "30"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.llm.gemini_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.llm.anthropic_api_key.as_deref(), Some("a-key"));
        assert_eq!(config.llm.claude_model, "claude-test");
        assert_eq!(config.llm.timeout, Duration::from_secs(15));
        assert_eq!(config.orchestrator.cache_ttl_secs, 120);
        assert_eq!(config.orchestrator.cache_max_entries, 4);
        assert_eq!(config.yahoo.rate_limit, 30);
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(config.llm.gemini_api_key.is_none());
    }

    #[test]
    fn test_rejects_non_numeric_values() {
        let err = config_from(&[("CACHE_TTL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECS"));
    }
}
