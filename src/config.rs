use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub log_level: Level,
    pub llm: LlmConfig,
}

impl DaemonConfig {
    /// Reads `CAMPUSD_*` variables, after loading `.env` if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let log_level = get("CAMPUSD_LOG")
            .and_then(|v| Level::from_str(&v).ok())
            .unwrap_or(Level::INFO);
        let timeout_secs = get("CAMPUSD_LLM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        Self {
            log_level,
            llm: LlmConfig {
                endpoint: get("CAMPUSD_LLM_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
                api_key: get("CAMPUSD_LLM_API_KEY"),
                model: get("CAMPUSD_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
        }
    }
}
