//! # Configuration Module
//!
//! Defines the runtime configuration for the tool-calling agent. Values come
//! from an optional JSON file with overrides from command-line arguments and
//! environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Environment variable consulted for the API key when neither the CLI nor
/// the config file supplies one.
pub const API_KEY_ENV_VAR: &str = "LMSTUDIO_API_KEY";

/// Runtime configuration used across the engine and the evaluation harness.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuntimeConfig {
    /// Base URL of the OpenAI-compatible endpoint, including the `/v1` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as a bearer token. Local LM Studio ignores it, but the
    /// wire format requires one.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Per-request timeout; local models can stall on long generations.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: f64,
    #[serde(default = "default_response_temperature")]
    pub response_temperature: f32,
    #[serde(default = "default_max_generation_tokens")]
    pub max_generation_tokens: u32,
    /// Upper bound on the engine's main loop.
    #[serde(default = "default_max_tool_call_rounds")]
    pub max_tool_call_rounds_per_request: u32,
    /// Upper bound on parse-failure retries within one engine invocation.
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: u32,
    /// Always true in this engine; reserved for future relaxation.
    #[serde(default = "default_sequential_execution_only")]
    pub sequential_execution_only: bool,
    #[serde(default = "default_delay_between_cases_seconds")]
    pub delay_between_evaluation_cases_seconds: f64,
    /// Consecutive `request_error` results that trip the evaluation circuit
    /// breaker.
    #[serde(default = "default_max_consecutive_request_errors")]
    pub max_consecutive_request_errors: u32,
    #[serde(default = "default_evaluation_result_directory")]
    pub evaluation_result_directory_path: String,
    #[serde(default = "default_evaluation_case_file")]
    pub evaluation_case_file_path: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}
fn default_api_key() -> String {
    "lm-studio".to_string()
}
fn default_model_name() -> String {
    "lfm2-2.6b-exp".to_string()
}
fn default_request_timeout_seconds() -> f64 {
    12.0
}
fn default_response_temperature() -> f32 {
    0.1
}
fn default_max_generation_tokens() -> u32 {
    256
}
fn default_max_tool_call_rounds() -> u32 {
    3
}
fn default_max_repair_attempts() -> u32 {
    2
}
fn default_sequential_execution_only() -> bool {
    true
}
fn default_delay_between_cases_seconds() -> f64 {
    2.0
}
fn default_max_consecutive_request_errors() -> u32 {
    2
}
fn default_evaluation_result_directory() -> String {
    "logs/evaluations".to_string()
}
fn default_evaluation_case_file() -> String {
    "tests/fixtures/tool_call_cases.json".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            model_name: default_model_name(),
            request_timeout_seconds: default_request_timeout_seconds(),
            response_temperature: default_response_temperature(),
            max_generation_tokens: default_max_generation_tokens(),
            max_tool_call_rounds_per_request: default_max_tool_call_rounds(),
            max_repair_attempts: default_max_repair_attempts(),
            sequential_execution_only: default_sequential_execution_only(),
            delay_between_evaluation_cases_seconds: default_delay_between_cases_seconds(),
            max_consecutive_request_errors: default_max_consecutive_request_errors(),
            evaluation_result_directory_path: default_evaluation_result_directory(),
            evaluation_case_file_path: default_evaluation_case_file(),
        }
    }
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_seconds: Option<f64>,
}

impl RuntimeConfig {
    /// Loads the configuration.
    ///
    /// Priority for each value:
    /// 1. Command-line arguments (highest).
    /// 2. Values from the JSON configuration file.
    /// 3. The `LMSTUDIO_API_KEY` environment variable (API key only, and only
    ///    when the file left the key at its default).
    /// 4. Coded defaults (lowest).
    pub fn load(config_file_path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let path = Path::new(config_file_path);
        let mut config: RuntimeConfig = if path.exists() {
            let config_text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file at: {}", config_file_path))?;
            serde_json::from_str(&config_text)
                .with_context(|| format!("Failed to parse config file: {}", config_file_path))?
        } else {
            warn!(
                "Config file not found at: {}. Using default values.",
                config_file_path
            );
            RuntimeConfig::default()
        };

        if let Some(base_url) = &overrides.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(model_name) = &overrides.model_name {
            config.model_name = model_name.clone();
        }
        if let Some(timeout) = overrides.request_timeout_seconds {
            config.request_timeout_seconds = timeout;
        }

        // API key precedence: CLI > config file > environment > default.
        if let Some(api_key) = &overrides.api_key {
            config.api_key = api_key.clone();
        } else if config.api_key == default_api_key() {
            if let Ok(env_key) = std::env::var(API_KEY_ENV_VAR) {
                config.api_key = env_key;
            }
        }

        Ok(config)
    }
}
