//! Generative-text backends: trait seam + OpenAI provider, disabled and scripted stand-ins.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ai::AiSection;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Knobs the retry ladder turns between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Failures reported by a backend call. Length validation lives in the generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend refused the request itself (oversized, invalid parameters).
    #[error("backend rejected the request: {0}")]
    MalformedRequest(String),
    /// Timeouts, transport errors, 5xx, rate limiting, empty completions.
    #[error("backend call failed: {0}")]
    Transient(String),
}

#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, BackendError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn TextBackend>;

/// Factory: build a backend according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a fixed-output mock.
/// * Else if AI is disabled or no API key resolves, returns [`DisabledBackend`].
/// * Else builds the OpenAI provider.
pub fn build_backend(cfg: &AiSection) -> anyhow::Result<DynBackend> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(ScriptedBackend::repeating(
            "Service update from the City (mock).",
        )));
    }

    if !cfg.enabled {
        return Ok(Arc::new(DisabledBackend));
    }

    match cfg.resolve_api_key() {
        Some(key) => {
            tracing::debug!(key_len = key.len(), model = %cfg.model, "OpenAI key resolved");
            Ok(Arc::new(OpenAiBackend::new(cfg, key)?))
        }
        None => {
            tracing::warn!("AI enabled but no API key resolved; using disabled backend");
            Ok(Arc::new(DisabledBackend))
        }
    }
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI Chat Completions provider.
pub struct OpenAiBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(cfg: &AiSection, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key,
            model: cfg.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Deserialize, Default)]
struct ErrorDetail {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a non-success response onto the retry ladder's error classes.
pub fn classify_status(status: u16, body: &str) -> BackendError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .unwrap_or_default()
        .error;
    let message = detail
        .message
        .unwrap_or_else(|| body.chars().take(200).collect());
    let invalid = detail.kind.as_deref() == Some("invalid_request_error");
    if invalid || status == 400 || status == 413 {
        BackendError::MalformedRequest(format!("status {status}: {message}"))
    } else {
        BackendError::Transient(format!("status {status}: {message}"))
    }
}

#[async_trait]
impl TextBackend for OpenAiBackend {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Transient("request timed out".to_string())
                } else {
                    BackendError::Transient(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| BackendError::Transient(format!("unreadable completion: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BackendError::Transient("empty completion".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Stand-ins
// ------------------------------------------------------------

/// Always fails; used when AI is disabled so alerts still go out with the fallback text.
pub struct DisabledBackend;

#[async_trait]
impl TextBackend for DisabledBackend {
    async fn generate(&self, _: &str, _: &GenerationParams) -> Result<String, BackendError> {
        Err(BackendError::Transient("text generation disabled".to_string()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Plays back queued responses in order and records every call.
/// Once the queue is empty it repeats `fallback` (or fails transiently if none).
#[derive(Default)]
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, BackendError>>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Prompts and params seen so far, in call order.
    pub fn calls(&self) -> Vec<(String, GenerationParams)> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.to_string(), params.clone()));
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match (next, &self.fallback) {
            (Some(scripted), _) => scripted,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(BackendError::Transient("script exhausted".to_string())),
        }
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}
