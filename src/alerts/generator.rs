// src/alerts/generator.rs
//! Retry ladder around the text backend.
//!
//! Up to [`MAX_RETRIES`] attempts. An over-long output is fed back through a
//! shorten instruction; a rejected request gets a larger token budget; anything
//! else just raises the temperature. When every attempt fails, the fallback
//! message is returned, so generation itself never errors.

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backend::{BackendError, DynBackend, GenerationParams};
use super::prompt::{alert_prompt, shorten_prompt};
use super::types::{char_len, NormalizedAlert, TweetText, TWEET_MAX_LENGTH};

pub const MAX_RETRIES: u8 = 3;
pub const INITIAL_TEMPERATURE: f32 = 0.2;
pub const TEMPERATURE_STEP: f32 = 0.2;
/// Fixed token overhead added to the `chars / 4` prompt estimate.
pub const TOKEN_OVERHEAD: usize = 256;
/// Model context size shared between prompt and completion.
pub const CONTEXT_WINDOW: usize = 4097;
pub const MALFORMED_TOKEN_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("generated text is {length} characters, limit is {limit}")]
    TooLong {
        text: String,
        length: usize,
        limit: usize,
    },
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("transient backend error: {0}")]
    TransientBackendError(String),
}

impl From<BackendError> for GenerationError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::MalformedRequest(m) => GenerationError::MalformedRequest(m),
            BackendError::Transient(m) => GenerationError::TransientBackendError(m),
        }
    }
}

/// Rough token estimate for a prompt.
pub fn estimate_tokens(prompt: &str) -> usize {
    char_len(prompt) / 4 + TOKEN_OVERHEAD
}

/// Per-alert mutable state across attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub attempt: u8,
    pub token_budget: usize,
    pub temperature: f32,
    pub prompt: String,
}

impl RetryState {
    pub fn new(prompt: String) -> Self {
        Self {
            attempt: 0,
            token_budget: estimate_tokens(&prompt),
            temperature: INITIAL_TEMPERATURE,
            prompt,
        }
    }

    pub fn params(&self) -> GenerationParams {
        let max_tokens = CONTEXT_WINDOW.saturating_sub(self.token_budget).max(1);
        GenerationParams {
            max_tokens: u32::try_from(max_tokens).unwrap_or(u32::MAX),
            temperature: self.temperature,
        }
    }

    /// Prepare the next attempt after `err`.
    pub fn adjust(&mut self, err: &GenerationError, link: &str) {
        match err {
            GenerationError::TooLong { text, .. } => {
                self.prompt = shorten_prompt(text, link);
                self.token_budget = estimate_tokens(&self.prompt);
                self.temperature += TEMPERATURE_STEP;
            }
            GenerationError::MalformedRequest(_) => {
                self.token_budget = (self.token_budget as f64 * MALFORMED_TOKEN_FACTOR) as usize;
            }
            GenerationError::TransientBackendError(_) => {
                self.temperature += TEMPERATURE_STEP;
            }
        }
    }
}

/// How the ladder ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated { text: TweetText, attempts: u8 },
    Fallback {
        text: TweetText,
        last_error: Option<GenerationError>,
    },
}

impl GenerationOutcome {
    pub fn text(&self) -> &TweetText {
        match self {
            GenerationOutcome::Generated { text, .. } | GenerationOutcome::Fallback { text, .. } => {
                text
            }
        }
    }

    pub fn into_text(self) -> TweetText {
        match self {
            GenerationOutcome::Generated { text, .. } | GenerationOutcome::Fallback { text, .. } => {
                text
            }
        }
    }
}

/// Strip whitespace and one pair of wrapping quotes models like to add.
pub fn clean_output(raw: &str) -> String {
    static RE_QUOTED: OnceCell<Regex> = OnceCell::new();
    let re = RE_QUOTED.get_or_init(|| Regex::new(r#"(?s)^"(.*)"$"#).expect("static regex"));
    let trimmed = raw.trim();
    match re.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub struct TextGenerator {
    backend: DynBackend,
    max_length: usize,
}

impl TextGenerator {
    pub fn new(backend: DynBackend) -> Self {
        Self {
            backend,
            max_length: TWEET_MAX_LENGTH,
        }
    }

    /// Tighter platform-specific bound; never above [`TWEET_MAX_LENGTH`].
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = max.min(TWEET_MAX_LENGTH);
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub async fn generate(
        &self,
        alert: &NormalizedAlert,
        alert_id: &str,
        link: &str,
    ) -> GenerationOutcome {
        self.run(alert_prompt(alert, link), alert_id, link).await
    }

    /// Drive the ladder from an explicit first prompt.
    pub async fn run(&self, prompt: String, alert_id: &str, link: &str) -> GenerationOutcome {
        let mut state = RetryState::new(prompt);
        let mut last_error = None;

        while state.attempt < MAX_RETRIES {
            state.attempt += 1;
            counter!("generation_attempts_total").increment(1);
            debug!(
                alert_id,
                attempt = state.attempt,
                token_budget = state.token_budget,
                temperature = state.temperature,
                "generation attempt"
            );

            match self.attempt(&state).await {
                Ok(text) => {
                    info!(
                        alert_id,
                        attempt = state.attempt,
                        chars = text.len_chars(),
                        backend = self.backend.name(),
                        "generated post text"
                    );
                    return GenerationOutcome::Generated {
                        text,
                        attempts: state.attempt,
                    };
                }
                Err(err) => {
                    warn!(
                        alert_id,
                        attempt = state.attempt,
                        max = MAX_RETRIES,
                        error = %err,
                        "generation attempt failed"
                    );
                    state.adjust(&err, link);
                    last_error = Some(err);
                }
            }
        }

        warn!(alert_id, "generation exhausted; using fallback text");
        GenerationOutcome::Fallback {
            text: TweetText::fallback(link, self.max_length),
            last_error,
        }
    }

    async fn attempt(&self, state: &RetryState) -> Result<TweetText, GenerationError> {
        let raw = self.backend.generate(&state.prompt, &state.params()).await?;
        TweetText::bounded(clean_output(&raw), self.max_length).map_err(|text| {
            GenerationError::TooLong {
                length: char_len(&text),
                limit: self.max_length,
                text,
            }
        })
    }
}
