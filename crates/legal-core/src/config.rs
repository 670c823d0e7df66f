// Runtime configuration, loaded once at startup from the environment.
//
// Mirrors the teacher's `RunnerConfig::from_env()` convention: typed
// defaults, `dotenvy::dotenv().ok()` best-effort .env loading, fail-fast
// via `configuration_error` for anything required but missing.

use std::env;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Which ModelClient implementation to bind (e.g. "gemini").
    pub model_provider: String,
    /// When true, agents with `grounded_search=true` must succeed via the
    /// grounded backend or the request fails with `configuration_error`.
    pub use_grounded_backend: bool,
    pub max_tool_iterations_default: usize,
    pub agent_turn_timeout: Duration,
    pub request_timeout: Duration,
    pub history_window_pairs: usize,
    pub context_token_budget_fraction: f32,
    pub database_url: String,
    pub blob_storage_root: String,
    pub bind_address: String,
}

fn env_var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| OrchestratorError::configuration(format!("{key} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| OrchestratorError::configuration("DATABASE_URL is required"))?;

        let use_grounded_backend: bool = env_parsed("USE_GROUNDED_BACKEND", false)?;
        let model_provider = env_var("MODEL_PROVIDER", "gemini");

        if use_grounded_backend && model_provider != "gemini" {
            return Err(OrchestratorError::configuration(
                "USE_GROUNDED_BACKEND requires MODEL_PROVIDER=gemini; no silent fallback to an ungrounded provider is permitted",
            ));
        }

        let context_token_budget_fraction: f32 = env_parsed("CONTEXT_TOKEN_BUDGET_FRACTION", 0.75)?;
        if !(0.0..=1.0).contains(&context_token_budget_fraction) || context_token_budget_fraction == 0.0 {
            return Err(OrchestratorError::configuration(
                "CONTEXT_TOKEN_BUDGET_FRACTION must be in (0, 1]",
            ));
        }

        Ok(Self {
            model_provider,
            use_grounded_backend,
            max_tool_iterations_default: env_parsed("MAX_TOOL_ITERATIONS_DEFAULT", 6)?,
            agent_turn_timeout: Duration::from_secs(env_parsed("AGENT_TURN_TIMEOUT_SECONDS", 30)?),
            request_timeout: Duration::from_secs(env_parsed("REQUEST_TIMEOUT_SECONDS", 90)?),
            history_window_pairs: env_parsed("HISTORY_WINDOW_PAIRS", 6)?,
            context_token_budget_fraction,
            database_url,
            blob_storage_root: env_var("BLOB_STORAGE_ROOT", "./data/blobs"),
            bind_address: env_var("BIND_ADDRESS", "0.0.0.0:8080"),
        })
    }
}
