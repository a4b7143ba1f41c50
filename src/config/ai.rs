// src/config/ai.rs
use serde::Deserialize;
use std::env;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

fn default_enabled() -> bool {
    true
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AiSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout for the backend call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_model(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiSection {
    /// The literal key, or `$OPENAI_API_KEY` when configured as "ENV". Empty → None.
    pub fn resolve_api_key(&self) -> Option<String> {
        let key = if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var("OPENAI_API_KEY").ok()?
        } else {
            self.api_key.clone()
        };
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }
}
